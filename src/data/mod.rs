/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  path / URL
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch bytes → decode first sheet → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  header + Vec<Row>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  null / not-null predicate → retained row indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  xlsx / csv / jpeg / pdf bytes → file
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pdf;
