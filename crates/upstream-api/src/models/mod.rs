//! Payload models for the commands in [`crate::Command`].

mod activity;
mod de;
mod stats;
mod users;

pub use activity::{Activity, Session};
pub use stats::{HomeStat, HomeStatRow, PlaysByDate, PlaysSeries};
pub use users::{HistoryPage, HistoryRow, PlayerStat, User, WatchTimeStat};
