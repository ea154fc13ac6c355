//! Plays-by-date chart summed across servers.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use upstream_api::{BULK_TIMEOUT, Command, PlaysByDate, PlaysSeries};

use super::AggregationService;
use crate::Result;
use crate::fanout::{PerServerResult, successes};
use crate::registry::ServerSelection;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaysByDateChart {
    /// `YYYY-MM-DD`, ascending.
    pub categories: Vec<String>,
    /// One series per media type, in first-seen order; `data` aligns with `categories`.
    pub series: Vec<PlaysSeries>,
}

impl AggregationService {
    pub async fn plays_by_date(&self, days: u32, selection: ServerSelection) -> Result<PlaysByDateChart> {
        let servers = self.target_servers(selection).await?;
        let results = self
            .fanout
            .fan_out::<PlaysByDate>(&servers, &Command::GetPlaysByDate { time_range: days }, BULK_TIMEOUT)
            .await;
        Ok(merge_plays_by_date(&results))
    }
}

fn merge_plays_by_date(results: &[PerServerResult<PlaysByDate>]) -> PlaysByDateChart {
    let mut dates: BTreeSet<&str> = BTreeSet::new();
    let mut names: Vec<&str> = Vec::new();
    let mut sums: HashMap<(&str, &str), i64> = HashMap::new();

    for (_, chart) in successes(results) {
        for series in &chart.series {
            if !names.contains(&series.name.as_str()) {
                names.push(&series.name);
            }
            // Extra points without a date are ignored.
            for (date, value) in chart.categories.iter().zip(&series.data) {
                *sums.entry((series.name.as_str(), date.as_str())).or_default() += value;
            }
        }
        dates.extend(chart.categories.iter().map(String::as_str));
    }

    PlaysByDateChart {
        categories: dates.iter().map(|d| d.to_string()).collect(),
        series: names
            .iter()
            .map(|name| PlaysSeries {
                name: name.to_string(),
                data: dates
                    .iter()
                    .map(|date| sums.get(&(*name, *date)).copied().unwrap_or_default())
                    .collect(),
            })
            .collect(),
    }
}
