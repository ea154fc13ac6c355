//! Device share: top platforms plus an "Others" bucket.

use serde::Serialize;

use super::category::StatCategory;
use super::reducer::{ServerStats, StatsReducer};

/// Named slices before the remainder is folded into "Others".
pub const SHARE_SLICES: usize = 4;
pub const OTHERS_LABEL: &str = "Others";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub label: String,
    pub count: i64,
    /// `round(count / total * 100)`; slices need not sum to 100.
    pub percentage: i64,
}

/// Percentage of `count` in `total`, rounded half away from zero.
pub fn percentage(count: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as i64
}

/// Split `(label, count)` pairs, already sorted descending, into share slices.
pub fn share_slices(totals: &[(String, i64)], slices: usize) -> Vec<ShareSlice> {
    let total: i64 = totals.iter().map(|(_, count)| *count).sum();
    if total <= 0 {
        return Vec::new();
    }

    let mut out: Vec<ShareSlice> = totals
        .iter()
        .take(slices)
        .map(|(label, count)| ShareSlice {
            label: label.clone(),
            count: *count,
            percentage: percentage(*count, total),
        })
        .collect();

    if totals.len() > slices {
        let rest: i64 = totals[slices..].iter().map(|(_, count)| *count).sum();
        out.push(ShareSlice {
            label: OTHERS_LABEL.to_string(),
            count: rest,
            percentage: percentage(rest, total),
        });
    }
    out
}

/// Platform share across `servers`.
pub fn device_share(reducer: &StatsReducer, servers: &[ServerStats<'_>]) -> Vec<ShareSlice> {
    let totals = reducer.totals(StatCategory::TopPlatforms, servers);
    share_slices(&totals, SHARE_SLICES)
}
