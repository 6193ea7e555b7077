use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// A period name outside hour/day/week/month/year. Always a caller bug.
    #[error("unknown period granularity: {0:?} (expected hour, day, week, month or year)")]
    InvalidGranularity(String),
}
