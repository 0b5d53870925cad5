//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::Movement;
use tokio::sync::watch;

/// Trait defining the interface for movement storage operations
///
/// This trait abstracts away the specific storage implementation details,
/// allowing the domain layer to work with different storage backends
/// (local files, a remote list store, in-memory fakes) without modification.
/// Timestamps are epoch milliseconds.
#[async_trait]
pub trait MovementStorage: Send + Sync {
    /// Store a new movement
    async fn store_movement(&self, movement: &Movement) -> Result<()>;

    /// Store several movements of the same owner in one write.
    /// Returns the number of movements stored.
    async fn store_movements(&self, owner_id: &str, movements: &[Movement]) -> Result<usize>;

    /// Retrieve a specific movement by ID
    async fn get_movement(&self, owner_id: &str, movement_id: &str) -> Result<Option<Movement>>;

    /// List every movement of an owner, newest first
    async fn list_movements(&self, owner_id: &str) -> Result<Vec<Movement>>;

    /// List movements with `from_millis <= timestamp <= to_millis`, newest first
    async fn list_movements_in_range(
        &self,
        owner_id: &str,
        from_millis: i64,
        to_millis: i64,
    ) -> Result<Vec<Movement>>;

    /// Timestamp of the owner's oldest movement, `None` when the owner has none
    async fn earliest_movement_millis(&self, owner_id: &str) -> Result<Option<i64>>;

    /// Delete a single movement
    /// Returns true if the movement was found and deleted, false otherwise
    async fn delete_movement(&self, owner_id: &str, movement_id: &str) -> Result<bool>;
}

/// A single persisted preference value with change notification
///
/// `read` hands out a receiver that always holds the latest value, so callers
/// can either sample it or await changes.
#[async_trait]
pub trait PreferenceStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscribe to the current value and every later write
    fn read(&self) -> watch::Receiver<T>;

    /// Persist a new value and notify subscribers
    async fn write(&self, value: T) -> Result<()>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type and provides factory
/// methods for creating repositories. This allows the domain layer to work with
/// any storage backend without knowing the implementation details.
pub trait Connection: Send + Sync + Clone {
    /// The type of MovementStorage this connection creates
    type MovementRepository: MovementStorage + Clone;

    /// Create a new movement repository for this connection
    fn create_movement_repository(&self) -> Self::MovementRepository;
}
