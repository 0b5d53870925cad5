//! # Finance Tracker Backend
//!
//! Contains all non-UI logic for the finance tracker.
//!
//! - **Domain**: aggregation, month paging, statement parsing and services
//! - **Storage**: persistence traits and their CSV/YAML file implementation
//! - **Config**: data directory resolution and `config.yaml`
//!
//! The backend is UI-agnostic; the `finance-tracker` CLI is one shell over it.

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

pub mod config;
pub mod domain;
pub mod storage;

pub use config::AppConfig;
pub use storage::csv::CsvConnection;

use domain::{AggregationService, MonthPager, MovementService, PreferenceService};
use storage::csv::MovementRepository;
use storage::traits::Connection;

/// Main backend struct that orchestrates all services
pub struct Backend {
    pub connection: CsvConnection,
    pub config: AppConfig,
    pub movement_service: MovementService<MovementRepository>,
    pub preference_service: PreferenceService,
    pub aggregation_service: AggregationService,
}

impl Backend {
    /// Open the backend, resolving the data directory from the command line
    /// flag, the environment or the default location
    pub fn open(cli_data_dir: Option<PathBuf>) -> Result<Self> {
        let data_directory = config::resolve_data_directory(cli_data_dir)?;
        Self::new(data_directory)
    }

    /// Create a backend over `data_directory`, following its config redirect
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let requested = data_directory.as_ref().to_path_buf();
        let requested_config = AppConfig::load_or_default(&requested);
        let actual = config::follow_redirect(requested.clone(), &requested_config);

        let config = if actual == requested {
            requested_config
        } else {
            AppConfig::load_or_default(&actual)
        };

        let connection = CsvConnection::new(&actual)?;
        let movement_service = MovementService::new(connection.create_movement_repository());
        let preference_service = PreferenceService::from_connection(&connection)?;

        info!("Backend ready with data directory {}", actual.display());
        Ok(Self {
            connection,
            config,
            movement_service,
            preference_service,
            aggregation_service: AggregationService::new(),
        })
    }

    /// A fresh month pager over this backend's storage
    pub fn month_pager(&self) -> MonthPager<MovementRepository> {
        MonthPager::new(self.connection.create_movement_repository())
    }

    pub fn data_directory(&self) -> PathBuf {
        self.connection.base_directory()
    }
}
