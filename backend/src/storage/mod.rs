//! # Storage Module
//!
//! Handles all data persistence for the finance tracker.
//!
//! The domain layer only sees the traits in [`traits`]; the file-based
//! implementation in [`csv`] keeps one directory per owner under the data
//! directory:
//!
//! ```text
//! data/
//! ├── config.yaml
//! ├── preferences/
//! │   ├── theme.yaml
//! │   └── language.yaml
//! └── {owner}/
//!     └── movements.csv
//! ```

pub mod csv;
pub mod traits;

pub use traits::{Connection, MovementStorage, PreferenceStore};
