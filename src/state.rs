use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

use image::RgbaImage;

use crate::data::export::{self, ExportError, ExportRequest};
use crate::data::filter::{self, filtered_indices, FilterError, FilterForm, FilterSpec};
use crate::data::loader::{self, LoadError, Source};
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering.
///
/// Only the UI thread touches this; the load worker talks to it through
/// `pending_load`.
pub struct AppState {
    /// Loaded dataset (empty until a load succeeds).
    pub dataset: Dataset,

    /// Indices of rows in the current filtered view.
    pub visible_indices: Vec<usize>,

    /// Last filter applied to `dataset`; `None` shows every row.
    pub active_filter: Option<FilterSpec>,

    /// Where the current dataset came from.
    pub source: Option<Source>,

    /// Directory exports are written to.
    pub output_dir: PathBuf,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,

    pending_load: Option<Receiver<Result<Dataset, LoadError>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl AppState {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            dataset: Dataset::default(),
            visible_indices: Vec::new(),
            active_filter: None,
            source: None,
            output_dir,
            status_message: None,
            loading: false,
            pending_load: None,
        }
    }

    /// Whether filter and export commands are available.
    pub fn ready(&self) -> bool {
        !self.loading
    }

    /// Start loading `source` on a worker thread. `notify` fires once the
    /// result is ready for [`AppState::poll_load`].
    pub fn on_load<F>(&mut self, source: Source, notify: F)
    where
        F: FnOnce() + Send + 'static,
    {
        log::info!("Loading {source}");
        self.loading = true;
        self.status_message = Some(format!("Loading {source}…"));
        self.pending_load = Some(loader::spawn_load(source.clone(), notify));
        self.source = Some(source);
    }

    /// Collect a finished load, if any. Returns true when state changed.
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.pending_load else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(LoadError::Decode {
                name: self.source_name(),
                reason: "loader stopped without a result".to_string(),
            }),
        };
        self.pending_load = None;
        self.finish_load(result);
        true
    }

    /// Replace the dataset with a load result. Failures leave an empty dataset.
    pub fn finish_load(&mut self, result: Result<Dataset, LoadError>) {
        self.loading = false;
        match result {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load sheet: {e}");
                self.dataset = Dataset::default();
                self.visible_indices.clear();
                self.active_filter = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset; the view starts with every row.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.visible_indices = (0..dataset.len()).collect();
        self.dataset = dataset;
        self.active_filter = None;
        self.status_message = None;
    }

    /// Validate `form` and recompute the view from the full dataset.
    ///
    /// On a user-input error the view is left untouched and the notice is
    /// shown in the status line.
    pub fn on_apply(&mut self, form: &FilterForm) -> Result<(), FilterError> {
        let spec = match FilterSpec::from_form(form) {
            Ok(spec) => spec,
            Err(e) => {
                log::warn!("Rejected filter: {e}");
                self.status_message = Some(e.to_string());
                return Err(e);
            }
        };

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(json) = serde_json::to_string(&spec) {
                log::debug!("Applying filter {json}");
            }
        }

        self.visible_indices = filtered_indices(&self.dataset, &spec);
        self.active_filter = Some(spec);
        self.status_message = None;
        log::debug!(
            "Filter kept {} of {} rows",
            self.visible_indices.len(),
            self.dataset.len()
        );
        Ok(())
    }

    /// The current filtered view as its own dataset.
    pub fn filtered_view(&self) -> Dataset {
        match &self.active_filter {
            Some(spec) => filter::evaluate(&self.dataset, spec),
            None => self.dataset.clone(),
        }
    }

    /// Encode the filtered view and save it to the output directory.
    pub fn on_export(
        &mut self,
        request: &ExportRequest,
        snapshot: Option<&RgbaImage>,
    ) -> Result<PathBuf, ExportError> {
        let result = export::save(&self.filtered_view(), request, snapshot, &self.output_dir);
        self.status_message = Some(match &result {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => {
                log::error!("Export failed: {e}");
                format!("Error: {e}")
            }
        });
        result
    }

    fn source_name(&self) -> String {
        self.source
            .as_ref()
            .map(Source::name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export::ExportFormat;
    use crate::data::filter::{Combinator, Condition};
    use crate::data::model::{CellValue, Row};

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.set_dataset(Dataset::new(
            vec!["a".into(), "b".into()],
            vec![
                Row::new(vec![CellValue::Number(1.0), CellValue::Null]),
                Row::new(vec![CellValue::Null, CellValue::Number(5.0)]),
                Row::new(vec![CellValue::Number(2.0), CellValue::Null]),
            ],
        ));
        state
    }

    fn form(primary: &str, cols: &str) -> FilterForm {
        FilterForm {
            primary_column: primary.into(),
            comparison_columns: cols.into(),
            combinator: Combinator::All,
            condition: Condition::IsNull,
        }
    }

    #[test]
    fn apply_replaces_view() {
        let mut state = loaded();
        assert_eq!(state.visible_indices, vec![0, 1, 2]);

        state.on_apply(&form("a", "b")).unwrap();
        assert_eq!(state.visible_indices, vec![0, 2]);
        assert_eq!(state.filtered_view().len(), 2);

        // Always evaluated against the full dataset, not the previous view.
        let mut not_null = form("a", "b");
        not_null.condition = Condition::IsNotNull;
        state.on_apply(&not_null).unwrap();
        assert_eq!(state.visible_indices, vec![1]);
    }

    #[test]
    fn filtered_view_follows_active_filter() {
        let mut state = loaded();
        assert_eq!(state.filtered_view(), state.dataset);

        state.on_apply(&form("a", "b")).unwrap();
        assert!(state.active_filter.is_some());
        assert_eq!(
            state.filtered_view(),
            state.dataset.subset(&state.visible_indices)
        );

        // A fresh dataset starts unfiltered.
        let fresh = state.dataset.clone();
        state.set_dataset(fresh);
        assert!(state.active_filter.is_none());
        assert_eq!(state.filtered_view().len(), 3);
    }

    #[test]
    fn blank_input_keeps_previous_view() {
        let mut state = loaded();
        state.on_apply(&form("a", "b")).unwrap();

        let err = state.on_apply(&form("a", "  ")).unwrap_err();
        assert_eq!(err, FilterError::MissingComparisonColumns);
        assert_eq!(state.visible_indices, vec![0, 2]);
        assert!(state.status_message.is_some());
    }

    #[test]
    fn failed_load_leaves_empty_dataset() {
        let mut state = loaded();
        state.loading = true;
        state.finish_load(Err(LoadError::Decode {
            name: "x.xlsx".into(),
            reason: "bad".into(),
        }));

        assert!(!state.loading);
        assert!(state.dataset.is_empty());
        assert!(state.visible_indices.is_empty());
        assert!(state.status_message.as_deref().unwrap().contains("x.xlsx"));
    }

    #[test]
    fn load_through_worker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "a,b\n1,\n,2\n").unwrap();

        let mut state = AppState::default();
        let (tx, rx) = std::sync::mpsc::channel();
        state.on_load(Source::Path(path), move || {
            let _ = tx.send(());
        });
        assert!(!state.ready());

        rx.recv().unwrap();
        assert!(state.poll_load());
        assert!(state.ready());
        assert_eq!(state.dataset.len(), 2);
        assert_eq!(state.visible_indices, vec![0, 1]);
        assert!(!state.poll_load());
    }

    #[test]
    fn export_writes_filtered_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded();
        state.output_dir = dir.path().to_path_buf();
        state.on_apply(&form("a", "b")).unwrap();

        let req = ExportRequest::new("", ExportFormat::Csv);
        let path = state.on_export(&req, None).unwrap();
        assert_eq!(path.file_name().unwrap(), "download.csv");

        let back = loader::decode(&std::fs::read(&path).unwrap(), "download.csv").unwrap();
        assert_eq!(back, state.filtered_view());
    }
}
