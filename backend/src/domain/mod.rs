//! # Domain Module
//!
//! Contains all business logic for the finance tracker.
//!
//! ## Module Organization
//!
//! - **aggregation**: totals and per-day series with running balance
//! - **calendar**: month arithmetic and local-calendar time ranges
//! - **month_pager**: lazily grown, newest-first list of month sections
//! - **statement_parser**: locale-tolerant parsing of bank statement lines
//! - **movement_service**: creating, importing, listing and summarising movements
//! - **preferences**: theme, language, text scale and selected account
//! - **state**: observable value holder shared by the pager and preferences
//!
//! ## Business Rules
//!
//! - Movement amounts are never negative; the direction carries the sign
//! - Movements are bucketed into months by their date on the local calendar
//! - Statement lines that cannot be parsed are dropped, never fatal
//! - Month sections are appended newest first and never reordered

pub mod aggregation;
pub mod calendar;
pub mod commands;
pub mod errors;
pub mod month_pager;
pub mod movement_service;
pub mod preferences;
pub mod state;
pub mod statement_parser;

pub use aggregation::AggregationService;
pub use calendar::YearMonth;
pub use errors::{MovementValidationError, PagerError};
pub use month_pager::{LoadOutcome, MonthPager};
pub use movement_service::MovementService;
pub use preferences::PreferenceService;
pub use state::StateHolder;
