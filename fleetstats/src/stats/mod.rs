//! Merging per-server statistics into global views.

mod category;
pub mod format;
mod peaks;
mod reducer;
mod share;

pub use category::{DedupKey, StatCategory};
pub use format::{format_count, format_duration};
pub use peaks::{ServerPeak, concurrent_peaks};
pub use reducer::{AggregatedStatItem, RADAR_N, ServerStats, StatsReducer, TOP_N};
pub use share::{OTHERS_LABEL, SHARE_SLICES, ShareSlice, device_share, percentage, share_slices};
