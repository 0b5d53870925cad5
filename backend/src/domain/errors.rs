//! Typed domain errors. Services return them through `anyhow::Result`, so
//! callers that care can `downcast_ref` to tell them apart from storage failures.

/// Longest accepted movement title, in characters
pub const MAX_TITLE_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MovementValidationError {
    #[error("Owner ID cannot be empty")]
    EmptyOwner,
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Title must be at most {} characters", MAX_TITLE_LENGTH)]
    TitleTooLong,
    #[error("Amount must be a finite number")]
    NonFiniteAmount,
    #[error("Amount cannot be negative; use the expense direction instead")]
    NegativeAmount,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PagerError {
    #[error("Month pager has not been started")]
    NotStarted,
    #[error("Month pager was started for owner '{started}', not '{requested}'")]
    OwnerMismatch { started: String, requested: String },
    #[error("Cannot compute the time range of month {0}")]
    InvalidMonth(String),
}
