//! Profile aggregation modules.
//!
//! The aggregator merges the backend bodies; the leaderboard module scrapes
//! doubloon balances from the shared spreadsheet page.

pub mod aggregator;
pub mod leaderboard;

pub use aggregator::ProfileAggregator;
pub use leaderboard::LeaderboardLayout;
