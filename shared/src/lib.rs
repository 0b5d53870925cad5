use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Movement ID in format: "movement::<income|expense>::epoch_millis::sequence"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    /// Display title (e.g. "Ingreso nómina")
    pub title: String,
    /// Secondary display line (category, origin of the record, ...)
    pub subtitle: String,
    /// Unsigned magnitude; the sign is carried by `direction`
    pub amount: f64,
    pub direction: MovementDirection,
    /// Instant of the movement in epoch milliseconds
    pub timestamp_millis: i64,
    /// ID of the user this movement belongs to
    pub owner_id: String,
}

/// Whether a movement adds money or takes it away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Income,
    Expense,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Income => "income",
            MovementDirection::Expense => "expense",
        }
    }

    /// Direction implied by a signed amount; zero counts as income
    pub fn from_signed(amount: f64) -> Self {
        if amount < 0.0 {
            MovementDirection::Expense
        } else {
            MovementDirection::Income
        }
    }
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementDirection {
    type Err = MovementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(MovementDirection::Income),
            "expense" => Ok(MovementDirection::Expense),
            _ => Err(MovementIdError::InvalidDirection),
        }
    }
}

/// Income, expense and balance over a set of movements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Per-day figures for one calendar month, indexed by day-of-month (0-based)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub days: u32,
    pub income: Vec<f64>,
    pub expense: Vec<f64>,
    /// Running balance: balance[i] = balance[i-1] + income[i] - expense[i]
    pub balance: Vec<f64>,
}

impl DailySeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    /// Balance at the end of the month (0.0 for an empty series)
    pub fn closing_balance(&self) -> f64 {
        self.balance.last().copied().unwrap_or(0.0)
    }
}

/// The movements of one owner for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSection {
    pub year: i32,
    /// 1-based month (1 = January)
    pub month: u32,
    /// Newest first
    pub movements: Vec<Movement>,
}

/// A statement line that parsed successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRow {
    /// Local midnight of the parsed calendar date, in epoch milliseconds
    pub date_millis: i64,
    pub description: String,
    /// Signed amount as it appeared in the source line
    pub amount: f64,
}

/// Dashboard figures for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub totals: MovementTotals,
    pub daily: DailySeries,
    pub movement_count: usize,
}

/// Outcome of importing a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub lines_read: usize,
    pub rows_parsed: usize,
    pub lines_dropped: usize,
    pub movements_stored: usize,
}

/// Application colour scheme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

impl std::str::FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(ThemeMode::System),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(format!("Unknown theme '{}'. Expected system, light or dark", other)),
        }
    }
}

/// Snapshot of every user preference, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesSnapshot {
    pub theme: ThemeMode,
    pub language: String,
    pub text_scale: f32,
    pub selected_account: Option<String>,
}

impl Movement {
    /// Generate movement ID from direction, creation time and a per-batch sequence number
    pub fn generate_id(direction: MovementDirection, epoch_millis: u64, sequence: u32) -> String {
        format!("movement::{}::{}::{}", direction.as_str(), epoch_millis, sequence)
    }

    /// Parse movement ID to extract components
    pub fn parse_id(id: &str) -> Result<(MovementDirection, u64, u32), MovementIdError> {
        let parts: Vec<&str> = id.split("::").collect();
        if parts.len() != 4 || parts[0] != "movement" {
            return Err(MovementIdError::InvalidFormat);
        }

        let direction = parts[1].parse::<MovementDirection>()?;

        let epoch_millis = parts[2]
            .parse::<u64>()
            .map_err(|_| MovementIdError::InvalidTimestamp)?;

        let sequence = parts[3]
            .parse::<u32>()
            .map_err(|_| MovementIdError::InvalidFormat)?;

        Ok((direction, epoch_millis, sequence))
    }

    /// Amount with the sign of its direction applied
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            MovementDirection::Income => self.amount,
            MovementDirection::Expense => -self.amount,
        }
    }

    pub fn is_income(&self) -> bool {
        self.direction == MovementDirection::Income
    }

    /// The movement's instant, or `None` when the stored millis are out of range
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovementIdError {
    InvalidFormat,
    InvalidDirection,
    InvalidTimestamp,
}

impl fmt::Display for MovementIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementIdError::InvalidFormat => write!(f, "Invalid movement ID format"),
            MovementIdError::InvalidDirection => write!(f, "Invalid movement direction"),
            MovementIdError::InvalidTimestamp => write!(f, "Invalid timestamp in movement ID"),
        }
    }
}

impl std::error::Error for MovementIdError {}
