use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// How the comparison columns are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combinator {
    /// Every comparison column must match (`and`).
    #[default]
    All,
    /// At least one comparison column must match (`or`).
    Any,
}

impl Combinator {
    pub const ALL_CHOICES: [Combinator; 2] = [Combinator::All, Combinator::Any];

    /// Token used by the input surface.
    pub fn token(self) -> &'static str {
        match self {
            Combinator::All => "and",
            Combinator::Any => "or",
        }
    }
}

/// Which nullness of the primary column selects the filtering branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    IsNull,
    IsNotNull,
}

impl Condition {
    pub const ALL_CHOICES: [Condition; 2] = [Condition::IsNull, Condition::IsNotNull];

    /// Token used by the input surface.
    pub fn token(self) -> &'static str {
        match self {
            Condition::IsNull => "null",
            Condition::IsNotNull => "not-null",
        }
    }

    /// Whether a looked-up cell satisfies this condition.
    ///
    /// An absent cell (unknown column) satisfies either condition: it counts
    /// as null under `IsNull` and as not null under `IsNotNull`.
    fn matches(self, cell: Option<&CellValue>) -> bool {
        match cell {
            None => true,
            Some(v) => v.is_null() == (self == Condition::IsNull),
        }
    }
}

/// Raw values of the four filter input fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterForm {
    pub primary_column: String,
    /// Comma-separated comparison column names.
    pub comparison_columns: String,
    pub combinator: Combinator,
    pub condition: Condition,
}

/// User-input errors raised before any evaluation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Please enter the primary column.")]
    MissingPrimaryColumn,
    #[error("Please enter the comparison columns.")]
    MissingComparisonColumns,
}

/// A validated filter request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub primary_column: String,
    /// Trimmed column names; duplicates and unknown names are allowed.
    pub comparison_columns: Vec<String>,
    pub combinator: Combinator,
    pub condition: Condition,
}

impl FilterSpec {
    /// Validate the raw form fields.
    pub fn from_form(form: &FilterForm) -> Result<Self, FilterError> {
        let primary = form.primary_column.trim();
        if primary.is_empty() {
            return Err(FilterError::MissingPrimaryColumn);
        }
        let columns = form.comparison_columns.trim();
        if columns.is_empty() {
            return Err(FilterError::MissingComparisonColumns);
        }

        Ok(FilterSpec {
            primary_column: primary.to_string(),
            comparison_columns: columns.split(',').map(|c| c.trim().to_string()).collect(),
            combinator: form.combinator,
            condition: form.condition,
        })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Return indices of rows retained by `spec`, in ascending order.
///
/// A row is dropped only when its primary cell matches `spec.condition` and
/// the comparison columns then fail the combinator. Rows whose primary cell
/// does not match the condition always pass through.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Vec<usize> {
    // Resolve names once; `None` marks an unknown column.
    let primary = dataset.column_index(&spec.primary_column);
    let comparisons: Vec<Option<usize>> = spec
        .comparison_columns
        .iter()
        .map(|c| dataset.column_index(c))
        .collect();

    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let lookup = |col: Option<usize>| col.and_then(|i| row.cells.get(i));

            if !spec.condition.matches(lookup(primary)) {
                return true;
            }
            let mut hits = comparisons.iter().map(|&c| spec.condition.matches(lookup(c)));
            match spec.combinator {
                Combinator::All => hits.all(|hit| hit),
                Combinator::Any => hits.any(|hit| hit),
            }
        })
        .map(|(i, _)| i)
        .collect()
}

/// Produce the filtered view as a new dataset.
pub fn evaluate(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    dataset.subset(&filtered_indices(dataset, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;

    use crate::data::model::CellValue::{Null, Number as N};

    fn dataset(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        Dataset::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.into_iter().map(Row::new).collect(),
        )
    }

    fn spec(
        primary: &str,
        cols: &[&str],
        combinator: Combinator,
        condition: Condition,
    ) -> FilterSpec {
        FilterSpec {
            primary_column: primary.to_string(),
            comparison_columns: cols.iter().map(|c| c.to_string()).collect(),
            combinator,
            condition,
        }
    }

    #[test]
    fn all_null_keeps_matching_rows_and_pass_through() {
        let ds = dataset(
            &["a", "b"],
            vec![vec![N(1.0), Null], vec![Null, Null], vec![N(2.0), N(3.0)]],
        );
        let s = spec("a", &["b"], Combinator::All, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0, 1, 2]);
    }

    #[test]
    fn all_null_drops_row_with_non_null_comparison() {
        let ds = dataset(
            &["a", "b"],
            vec![vec![N(1.0), Null], vec![Null, N(5.0)], vec![N(2.0), Null]],
        );
        let s = spec("a", &["b"], Combinator::All, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0, 2]);
    }

    #[test]
    fn any_null_needs_one_null_comparison() {
        let ds = dataset(
            &["a", "b", "c"],
            vec![
                vec![Null, N(1.0), Null],
                vec![Null, N(1.0), N(2.0)],
                vec![Null, Null, Null],
            ],
        );
        let s = spec("a", &["b", "c"], Combinator::Any, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0, 2]);

        let s = spec("a", &["b", "c"], Combinator::All, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![2]);
    }

    #[test]
    fn not_null_branch() {
        let ds = dataset(
            &["a", "b", "c"],
            vec![
                vec![N(1.0), N(1.0), Null],
                vec![N(1.0), N(1.0), N(2.0)],
                vec![N(1.0), Null, Null],
                vec![Null, Null, Null],
            ],
        );
        let all = spec("a", &["b", "c"], Combinator::All, Condition::IsNotNull);
        assert_eq!(filtered_indices(&ds, &all), vec![1, 3]);

        let any = spec("a", &["b", "c"], Combinator::Any, Condition::IsNotNull);
        assert_eq!(filtered_indices(&ds, &any), vec![0, 1, 3]);
    }

    #[test]
    fn rows_outside_the_primary_condition_always_pass() {
        let ds = dataset(
            &["a", "b"],
            vec![
                vec![N(1.0), N(1.0)],
                vec![Null, N(1.0)],
                vec![CellValue::Text("x".into()), N(2.0)],
                vec![Null, N(3.0)],
            ],
        );
        for combinator in Combinator::ALL_CHOICES {
            let s = spec("a", &["b"], combinator, Condition::IsNull);
            let kept = filtered_indices(&ds, &s);
            for (i, row) in ds.rows.iter().enumerate() {
                if !row.cells[0].is_null() {
                    assert!(kept.contains(&i), "row {i} should pass through");
                }
            }
        }
    }

    #[test]
    fn output_is_ordered_subsequence_and_idempotent() {
        let ds = dataset(
            &["a", "b", "c"],
            vec![
                vec![Null, Null, N(1.0)],
                vec![N(1.0), Null, Null],
                vec![Null, N(2.0), N(2.0)],
                vec![Null, Null, Null],
                vec![N(3.0), N(3.0), Null],
            ],
        );
        for combinator in Combinator::ALL_CHOICES {
            for condition in Condition::ALL_CHOICES {
                let s = spec("a", &["b", "c"], combinator, condition);
                let kept = filtered_indices(&ds, &s);
                assert!(kept.windows(2).all(|w| w[0] < w[1]));

                let once = evaluate(&ds, &s);
                let twice = evaluate(&once, &s);
                assert_eq!(once, twice, "{combinator:?}/{condition:?}");
            }
        }
    }

    #[test]
    fn unknown_columns_match_either_condition() {
        let ds = dataset(&["a", "b"], vec![vec![Null, N(1.0)], vec![N(1.0), Null]]);

        // Unknown comparison column counts as null under IsNull.
        let s = spec("a", &["nope"], Combinator::All, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0, 1]);

        // ...and as not null under IsNotNull.
        let s = spec("a", &["nope", "b"], Combinator::Any, Condition::IsNotNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0, 1]);

        // Unknown primary selects the filtering branch for every row.
        let s = spec("ghost", &["b"], Combinator::All, Condition::IsNull);
        assert_eq!(filtered_indices(&ds, &s), vec![1]);
        let s = spec("ghost", &["b"], Combinator::All, Condition::IsNotNull);
        assert_eq!(filtered_indices(&ds, &s), vec![0]);
    }

    #[test]
    fn form_validation() {
        let mut form = FilterForm {
            primary_column: "  ".into(),
            comparison_columns: "b".into(),
            ..Default::default()
        };
        assert_eq!(FilterSpec::from_form(&form), Err(FilterError::MissingPrimaryColumn));

        form.primary_column = " a ".into();
        form.comparison_columns = " \t".into();
        assert_eq!(FilterSpec::from_form(&form), Err(FilterError::MissingComparisonColumns));

        form.comparison_columns = " b , c,b,,".into();
        form.combinator = Combinator::Any;
        let spec = FilterSpec::from_form(&form).unwrap();
        assert_eq!(spec.primary_column, "a");
        assert_eq!(spec.comparison_columns, vec!["b", "c", "b", "", ""]);
        assert_eq!(spec.combinator, Combinator::Any);
    }

    #[test]
    fn empty_dataset_yields_nothing() {
        let ds = Dataset::default();
        let s = spec("a", &["b"], Combinator::All, Condition::IsNull);
        assert!(filtered_indices(&ds, &s).is_empty());
    }
}
