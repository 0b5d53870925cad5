use anyhow::Result;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::movement_repository::MovementRepository;
use crate::storage::traits::Connection;

pub const MOVEMENTS_FILE_NAME: &str = "movements.csv";
pub const MOVEMENTS_HEADER: [&str; 7] = [
    "id",
    "owner_id",
    "timestamp_millis",
    "title",
    "subtitle",
    "amount",
    "direction",
];

/// CsvConnection manages file paths and ensures CSV files exist for each owner
#[derive(Clone, Debug)]
pub struct CsvConnection {
    base_directory: Arc<Mutex<PathBuf>>,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: Arc::new(Mutex::new(base_path)),
        })
    }

    /// Create a new CSV connection in the default data directory
    /// (~/Documents/Finance Tracker)
    pub fn new_default() -> Result<Self> {
        let data_dir = default_data_directory()?;
        info!("Using default data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    fn lock_base(&self) -> MutexGuard<'_, PathBuf> {
        // A poisoned lock still holds a valid path
        self.base_directory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> PathBuf {
        self.lock_base().clone()
    }

    /// Generate a filesystem-safe directory name from an owner ID
    pub fn generate_safe_directory_name(owner_id: &str) -> String {
        let result = owner_id
            .chars()
            .map(|c| match c {
                'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
                'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
                'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
                'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
                'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
                'ñ' | 'Ñ' => 'n',
                'ç' | 'Ç' => 'c',
                c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
                _ => '_',
            })
            .collect::<String>();

        // Collapse consecutive underscores into single underscores
        let mut collapsed = String::with_capacity(result.len());
        let mut last_was_underscore = false;
        for c in result.chars() {
            if c == '_' {
                if !last_was_underscore {
                    collapsed.push('_');
                }
                last_was_underscore = true;
            } else {
                collapsed.push(c);
                last_was_underscore = false;
            }
        }

        let trimmed = collapsed.trim_matches('_');
        if trimmed.is_empty() {
            "owner".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Get the directory holding an owner's data
    pub fn owner_directory(&self, owner_id: &str) -> PathBuf {
        self.lock_base()
            .join(Self::generate_safe_directory_name(owner_id))
    }

    /// Get the file path for an owner's movements
    pub fn movements_file_path(&self, owner_id: &str) -> PathBuf {
        self.owner_directory(owner_id).join(MOVEMENTS_FILE_NAME)
    }

    /// Ensure the owner's movements file exists with a proper header
    pub fn ensure_movements_file_exists(&self, owner_id: &str) -> Result<PathBuf> {
        let owner_dir = self.owner_directory(owner_id);
        if !owner_dir.exists() {
            fs::create_dir_all(&owner_dir)?;
            debug!("Created owner directory: {}", owner_dir.display());
        }

        let file_path = owner_dir.join(MOVEMENTS_FILE_NAME);
        if !file_path.exists() {
            let header = format!("{}\n", MOVEMENTS_HEADER.join(","));
            fs::write(&file_path, header)?;
        }

        Ok(file_path)
    }

    /// Directory holding one YAML file per preference key
    pub fn preferences_directory(&self) -> PathBuf {
        self.lock_base().join("preferences")
    }
}

impl Connection for CsvConnection {
    type MovementRepository = MovementRepository;

    fn create_movement_repository(&self) -> Self::MovementRepository {
        MovementRepository::new(self.clone())
    }
}

/// `~/Documents/Finance Tracker`, resolved from HOME (or USERPROFILE on Windows)
pub fn default_data_directory() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

    Ok(PathBuf::from(home_dir)
        .join("Documents")
        .join("Finance Tracker"))
}
