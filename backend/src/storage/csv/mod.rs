//! # CSV Storage Module
//!
//! File-based storage for the finance tracker.
//!
//! ## Features
//!
//! - Per-owner movement files (`{owner}/movements.csv`)
//! - Range and earliest-timestamp queries for month paging
//! - Atomic file writes through temp files
//! - One YAML file per preference key (`preferences/{key}.yaml`)
//!
//! ## File Format
//!
//! ```csv
//! id,owner_id,timestamp_millis,title,subtitle,amount,direction
//! movement::income::1754042400000::0,user-1,1754042400000,Ingreso nómina,Imported,1234.56,income
//! movement::expense::1754042400000::1,user-1,1754215200000,Pago factura,Imported,123.45,expense
//! ```

pub mod connection;
pub mod movement_repository;
pub mod preference_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use movement_repository::MovementRepository;
pub use preference_repository::YamlPreference;
