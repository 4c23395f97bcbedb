//! Snapshot files written between pipeline stages.
//!
//! Every stage leaves its result on disk so a run can be inspected afterwards:
//!
//! ```text
//! output_dir/
//! ├── tamil-raw.json         # deduplicated articles, flat
//! ├── tamil-grouped.json     # the same, keyed by category
//! └── tamil-summarized.json  # summarized documents, keyed by category
//!
//! log_dir/
//! └── tamil-log.json         # one entry per listing page visited
//! ```
//!
//! The `tamil` prefix is the configured namespace.

pub mod json;
