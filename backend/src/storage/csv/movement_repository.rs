//! CSV-backed [`MovementStorage`].
//!
//! Every owner has a single `movements.csv`. Writes rewrite the whole file
//! through a temp file and a rename so a crash never leaves a half-written file.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use log::{debug, info, warn};
use shared::{Movement, MovementDirection};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::connection::{CsvConnection, MOVEMENTS_HEADER};
use crate::storage::traits::MovementStorage;

/// CSV-based movement repository
#[derive(Clone)]
pub struct MovementRepository {
    connection: CsvConnection,
}

impl MovementRepository {
    /// Create a new CSV movement repository
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Read all movements of an owner, in file order
    fn read_movements(&self, owner_id: &str) -> Result<Vec<Movement>> {
        let file_path = self.connection.ensure_movements_file_exists(owner_id)?;
        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut movements = Vec::new();
        for (index, result) in csv_reader.records().enumerate() {
            let record = result?;
            match parse_record(&record) {
                // Directories are shared by owner IDs that sanitize to the same name
                Ok(movement) if movement.owner_id == owner_id => movements.push(movement),
                Ok(_) => {}
                Err(e) => warn!(
                    "Skipping malformed row {} in {}: {}",
                    index + 1,
                    file_path.display(),
                    e
                ),
            }
        }

        Ok(movements)
    }

    /// Replace the owner's rows in the file with `movements`
    fn write_movements(&self, owner_id: &str, movements: &[Movement]) -> Result<()> {
        let file_path = self.connection.ensure_movements_file_exists(owner_id)?;

        // Keep rows of other owners that share this directory
        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));
        let mut foreign_rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            if record.get(1) != Some(owner_id) {
                foreign_rows.push(record);
            }
        }

        let temp_path = file_path.with_extension("csv.tmp");
        write_file(&temp_path, &foreign_rows, movements)?;
        fs::rename(&temp_path, &file_path)?;

        debug!(
            "Wrote {} movements for owner {} to {}",
            movements.len(),
            owner_id,
            file_path.display()
        );
        Ok(())
    }

    fn sort_newest_first(movements: &mut [Movement]) {
        movements.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
    }
}

fn write_file(path: &Path, foreign_rows: &[StringRecord], movements: &[Movement]) -> Result<()> {
    let file = File::create(path)?;
    let mut csv_writer = Writer::from_writer(BufWriter::new(file));

    csv_writer.write_record(MOVEMENTS_HEADER)?;
    for record in foreign_rows {
        csv_writer.write_record(record)?;
    }
    for movement in movements {
        let timestamp = movement.timestamp_millis.to_string();
        let amount = movement.amount.to_string();
        csv_writer.write_record([
            movement.id.as_str(),
            movement.owner_id.as_str(),
            timestamp.as_str(),
            movement.title.as_str(),
            movement.subtitle.as_str(),
            amount.as_str(),
            movement.direction.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn parse_record(record: &StringRecord) -> Result<Movement> {
    let field = |index: usize, name: &str| {
        record
            .get(index)
            .ok_or_else(|| anyhow!("missing {} column", name))
    };

    let timestamp_millis = field(2, "timestamp_millis")?
        .parse::<i64>()
        .context("invalid timestamp_millis")?;
    let amount = field(5, "amount")?.parse::<f64>().context("invalid amount")?;
    let direction = field(6, "direction")?
        .parse::<MovementDirection>()
        .map_err(|e| anyhow!(e))?;

    Ok(Movement {
        id: field(0, "id")?.to_string(),
        owner_id: field(1, "owner_id")?.to_string(),
        timestamp_millis,
        title: field(3, "title")?.to_string(),
        subtitle: field(4, "subtitle")?.to_string(),
        amount,
        direction,
    })
}

#[async_trait]
impl MovementStorage for MovementRepository {
    async fn store_movement(&self, movement: &Movement) -> Result<()> {
        let mut movements = self.read_movements(&movement.owner_id)?;

        match movements.iter_mut().find(|m| m.id == movement.id) {
            Some(existing) => {
                warn!("Movement {} already stored, replacing it", movement.id);
                *existing = movement.clone();
            }
            None => movements.push(movement.clone()),
        }

        self.write_movements(&movement.owner_id, &movements)?;
        info!("Stored movement {} for owner {}", movement.id, movement.owner_id);
        Ok(())
    }

    async fn store_movements(&self, owner_id: &str, new_movements: &[Movement]) -> Result<usize> {
        if let Some(stray) = new_movements.iter().find(|m| m.owner_id != owner_id) {
            bail!(
                "Movement {} belongs to owner {}, not {}",
                stray.id,
                stray.owner_id,
                owner_id
            );
        }
        if new_movements.is_empty() {
            return Ok(0);
        }

        let mut movements = self.read_movements(owner_id)?;
        for movement in new_movements {
            match movements.iter_mut().find(|m| m.id == movement.id) {
                Some(existing) => *existing = movement.clone(),
                None => movements.push(movement.clone()),
            }
        }

        self.write_movements(owner_id, &movements)?;
        info!("Stored {} movements for owner {}", new_movements.len(), owner_id);
        Ok(new_movements.len())
    }

    async fn get_movement(&self, owner_id: &str, movement_id: &str) -> Result<Option<Movement>> {
        let movements = self.read_movements(owner_id)?;
        Ok(movements.into_iter().find(|m| m.id == movement_id))
    }

    async fn list_movements(&self, owner_id: &str) -> Result<Vec<Movement>> {
        let mut movements = self.read_movements(owner_id)?;
        Self::sort_newest_first(&mut movements);
        Ok(movements)
    }

    async fn list_movements_in_range(
        &self,
        owner_id: &str,
        from_millis: i64,
        to_millis: i64,
    ) -> Result<Vec<Movement>> {
        let mut movements: Vec<Movement> = self
            .read_movements(owner_id)?
            .into_iter()
            .filter(|m| m.timestamp_millis >= from_millis && m.timestamp_millis <= to_millis)
            .collect();
        Self::sort_newest_first(&mut movements);

        debug!(
            "Found {} movements for owner {} in [{}, {}]",
            movements.len(),
            owner_id,
            from_millis,
            to_millis
        );
        Ok(movements)
    }

    async fn earliest_movement_millis(&self, owner_id: &str) -> Result<Option<i64>> {
        let movements = self.read_movements(owner_id)?;
        Ok(movements.iter().map(|m| m.timestamp_millis).min())
    }

    async fn delete_movement(&self, owner_id: &str, movement_id: &str) -> Result<bool> {
        let mut movements = self.read_movements(owner_id)?;
        let before = movements.len();
        movements.retain(|m| m.id != movement_id);

        if movements.len() == before {
            return Ok(false);
        }

        self.write_movements(owner_id, &movements)?;
        info!("Deleted movement {} for owner {}", movement_id, owner_id);
        Ok(true)
    }
}
