// Schema inference, aggregation and briefing over loosely structured scheme
// progress sheets.
//
// Each scheme's sheet has its own headers. `metric::infer_metric` picks the
// progress measure, `identity::resolve_identity_keys` finds the block and
// Gram Panchayat columns, and the rest of the crate builds on those two:
// district headlines and block drill-downs (`aggregate`), intervention
// briefs (`briefs`) and the per-block executive report (`report`).
pub mod aggregate;
pub mod briefs;
pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod metric;
pub mod normalize;
pub mod output;
pub mod report;
pub mod snapshot;
pub mod types;
pub mod util;

pub use aggregate::{block_drilldown, compute_district_aggregate, district_summary};
pub use briefs::generate_briefs;
pub use error::{DashboardError, Result};
pub use identity::resolve_identity_keys;
pub use metric::infer_metric;
pub use normalize::normalize_block_name;
pub use report::generate_report;
pub use types::*;
