//! Movement service domain logic for the finance tracker.
use anyhow::{anyhow, Result};
use chrono::Local;
use log::{info, warn};
use shared::{ImportSummary, MonthSummary, Movement, MovementDirection, ParsedRow};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::aggregation::AggregationService;
use super::calendar::{local_midnight_millis, YearMonth};
use super::commands::movements::{CreateMovementCommand, MonthQuery};
use super::errors::{MovementValidationError, MAX_TITLE_LENGTH};
use super::statement_parser::{parse_lines, statement_lines};
use crate::storage::traits::MovementStorage;

pub const IMPORTED_SUBTITLE: &str = "Imported";
const UNTITLED: &str = "Untitled";

/// Shared by every service in the process so IDs created in the same
/// millisecond never collide
static MOVEMENT_SEQUENCE: AtomicU32 = AtomicU32::new(0);

#[derive(Clone)]
pub struct MovementService<S: MovementStorage> {
    storage: S,
    aggregation_service: AggregationService,
}

impl<S: MovementStorage> MovementService<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            aggregation_service: AggregationService::new(),
        }
    }

    fn next_id(&self, direction: MovementDirection, now_millis: u64) -> String {
        let sequence = MOVEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Movement::generate_id(direction, now_millis, sequence)
    }

    fn now_millis() -> Result<u64> {
        Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64)
    }

    /// Validate and store a single movement
    pub async fn create_movement(&self, command: CreateMovementCommand) -> Result<Movement> {
        validate_command(&command)?;

        let now_millis = Self::now_millis()?;
        let timestamp_millis = match command.date {
            Some(date) => local_midnight_millis(&Local, date)
                .ok_or_else(|| anyhow!("Date {} does not exist in the local time zone", date))?,
            None => now_millis as i64,
        };

        let movement = Movement {
            id: self.next_id(command.direction, now_millis),
            title: command.title.trim().to_string(),
            subtitle: command.subtitle.trim().to_string(),
            amount: command.amount,
            direction: command.direction,
            timestamp_millis,
            owner_id: command.owner_id,
        };

        self.storage.store_movement(&movement).await?;
        info!(
            "Created {} movement {} of {:.2} for owner {}",
            movement.direction, movement.id, movement.amount, movement.owner_id
        );
        Ok(movement)
    }

    /// Store parsed statement rows as movements in one batch.
    /// Returns the number of movements stored.
    pub async fn import_rows(&self, owner_id: &str, rows: &[ParsedRow]) -> Result<usize> {
        if owner_id.trim().is_empty() {
            return Err(MovementValidationError::EmptyOwner.into());
        }

        let now_millis = Self::now_millis()?;
        let movements: Vec<Movement> = rows
            .iter()
            .map(|row| {
                let direction = MovementDirection::from_signed(row.amount);
                Movement {
                    id: self.next_id(direction, now_millis),
                    title: import_title(&row.description),
                    subtitle: IMPORTED_SUBTITLE.to_string(),
                    amount: row.amount.abs(),
                    direction,
                    timestamp_millis: row.date_millis,
                    owner_id: owner_id.to_string(),
                }
            })
            .collect();

        self.storage.store_movements(owner_id, &movements).await
    }

    /// Parse a statement file and import every line that parses
    pub async fn import_statement(&self, owner_id: &str, text: &str) -> Result<ImportSummary> {
        let lines: Vec<&str> = statement_lines(text).collect();
        let rows = parse_lines(&lines);
        let lines_dropped = lines.len() - rows.len();
        if lines_dropped > 0 {
            warn!("Dropped {} of {} statement lines", lines_dropped, lines.len());
        }

        let movements_stored = self.import_rows(owner_id, &rows).await?;
        info!(
            "Imported {} movements for owner {} from {} lines",
            movements_stored,
            owner_id,
            lines.len()
        );

        Ok(ImportSummary {
            lines_read: lines.len(),
            rows_parsed: rows.len(),
            lines_dropped,
            movements_stored,
        })
    }

    pub async fn delete_movement(&self, owner_id: &str, movement_id: &str) -> Result<bool> {
        let deleted = self.storage.delete_movement(owner_id, movement_id).await?;
        if !deleted {
            warn!("Movement {} not found for owner {}", movement_id, owner_id);
        }
        Ok(deleted)
    }

    /// Movements of one calendar month, newest first
    pub async fn list_month(&self, query: &MonthQuery) -> Result<Vec<Movement>> {
        let month = YearMonth::new(query.year, query.month)
            .ok_or_else(|| anyhow!("Invalid month {}", query.month))?;
        let (from, to) = month
            .range_millis_in(&Local)
            .ok_or_else(|| anyhow!("Cannot compute the time range of {}", month))?;

        self.storage
            .list_movements_in_range(&query.owner_id, from, to)
            .await
    }

    /// Totals and per-day series for one calendar month
    pub async fn month_summary(&self, query: &MonthQuery) -> Result<MonthSummary> {
        let movements = self.list_month(query).await?;
        let totals = self.aggregation_service.totals(&movements);
        let daily = self
            .aggregation_service
            .daily_series(&movements, query.year, query.month - 1);

        Ok(MonthSummary {
            year: query.year,
            month: query.month,
            totals,
            daily,
            movement_count: movements.len(),
        })
    }
}

fn validate_command(command: &CreateMovementCommand) -> Result<(), MovementValidationError> {
    if command.owner_id.trim().is_empty() {
        return Err(MovementValidationError::EmptyOwner);
    }
    let title = command.title.trim();
    if title.is_empty() {
        return Err(MovementValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(MovementValidationError::TitleTooLong);
    }
    if !command.amount.is_finite() {
        return Err(MovementValidationError::NonFiniteAmount);
    }
    if command.amount < 0.0 {
        return Err(MovementValidationError::NegativeAmount);
    }
    Ok(())
}

fn import_title(description: &str) -> String {
    if description.is_empty() {
        return UNTITLED.to_string();
    }
    description.chars().take(MAX_TITLE_LENGTH).collect()
}
