//! Per-server concurrent stream peaks.
//!
//! Peaks are maxima observed by one server; they are listed side by side and
//! never summed across servers.

use serde::Serialize;
use upstream_api::HomeStatRow;

use super::category::StatCategory;
use super::reducer::ServerStats;

const STREAMS: &str = "Concurrent Streams";
const TRANSCODES: &str = "Concurrent Transcodes";
const DIRECT_PLAYS: &str = "Concurrent Direct Plays";
const DIRECT_STREAMS: &str = "Concurrent Direct Streams";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerPeak {
    pub server_id: i64,
    pub server_name: String,
    pub streams: i64,
    pub transcodes: i64,
    pub direct_plays: i64,
    pub direct_streams: i64,
    /// Unix seconds at which the stream peak began, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<i64>,
}

/// One entry per server that reported peaks, sorted by stream peak descending.
pub fn concurrent_peaks(servers: &[ServerStats<'_>]) -> Vec<ServerPeak> {
    let mut peaks: Vec<ServerPeak> = servers
        .iter()
        .filter_map(|server| {
            let rows = server.rows(StatCategory::MostConcurrent);
            if rows.is_empty() {
                return None;
            }
            let mut peak = ServerPeak {
                server_id: server.server_id,
                server_name: server.server_name.to_string(),
                ..Default::default()
            };
            for row in rows {
                apply(&mut peak, row);
            }
            Some(peak)
        })
        .collect();

    peaks.sort_by(|a, b| b.streams.cmp(&a.streams));
    peaks
}

fn apply(peak: &mut ServerPeak, row: &HomeStatRow) {
    let slot = match row.title.as_str() {
        STREAMS => {
            if row.count > peak.streams {
                peak.started = row.started;
            }
            &mut peak.streams
        }
        TRANSCODES => &mut peak.transcodes,
        DIRECT_PLAYS => &mut peak.direct_plays,
        DIRECT_STREAMS => &mut peak.direct_streams,
        _ => return,
    };
    *slot = (*slot).max(row.count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use upstream_api::HomeStat;

    fn concurrent(streams: i64, transcodes: i64) -> Vec<HomeStat> {
        let row = |title: &str, count| HomeStatRow {
            title: title.into(),
            count,
            ..Default::default()
        };
        vec![HomeStat {
            stat_id: "most_concurrent".into(),
            stat_type: None,
            rows: vec![row(STREAMS, streams), row(TRANSCODES, transcodes)],
        }]
    }

    #[test]
    fn peaks_are_sorted_and_not_summed() {
        let a = concurrent(5, 2);
        let b = concurrent(8, 1);
        let peaks = concurrent_peaks(&[ServerStats::new(1, "a", &a), ServerStats::new(2, "b", &b)]);

        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].server_name, "b");
        assert_eq!(peaks[0].streams, 8);
        assert_eq!(peaks[1].streams, 5);
        assert_eq!(peaks[1].transcodes, 2);
    }

    #[test]
    fn servers_without_peaks_are_skipped() {
        let a = concurrent(3, 0);
        let peaks = concurrent_peaks(&[ServerStats::new(1, "a", &a), ServerStats::new(2, "b", &[])]);
        assert_eq!(peaks.len(), 1);
        assert!(concurrent_peaks(&[]).is_empty());
    }
}
