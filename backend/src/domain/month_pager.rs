//! # Month Pager
//!
//! Builds an owner's movement history one calendar month at a time, newest
//! month first, for infinite-scroll style views.
//!
//! `start` anchors the pager at the current month and loads it. Each
//! `load_next` walks back from the anchor, skipping months with no movements,
//! until it finds a month with data or reaches the month of the owner's oldest
//! movement. Sections are only ever appended, so the list stays in strictly
//! decreasing chronological order.
//!
//! Every state change happens after the last storage call of an operation. A
//! failed call, or a future dropped mid-flight, leaves the offset and the
//! sections as they were, and retrying queries the same month again.

use anyhow::Result;
use chrono::{Local, TimeZone, Utc};
use log::{debug, info};
use shared::{MonthSection, Movement};
use tokio::sync::watch;

use super::calendar::YearMonth;
use super::errors::PagerError;
use super::state::StateHolder;
use crate::storage::traits::MovementStorage;

/// What a paging call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A section for this month was appended
    Appended(YearMonth),
    /// This month was examined and had no movements
    Skipped(YearMonth),
    /// Every month back to the oldest movement has been examined
    Exhausted,
}

#[derive(Debug, Clone)]
struct Session {
    owner_id: String,
    anchor: YearMonth,
    /// Months back from the anchor of the next month to examine
    offset: u32,
    /// Cached once the owner has a movement; re-fetched while `None`
    earliest_millis: Option<i64>,
}

pub struct MonthPager<S, Tz: TimeZone = Local> {
    storage: S,
    tz: Tz,
    session: Option<Session>,
    sections: StateHolder<Vec<MonthSection>>,
}

impl<S: MovementStorage> MonthPager<S, Local> {
    /// Pager bucketing movements on the device's local calendar
    pub fn new(storage: S) -> Self {
        Self::with_time_zone(storage, Local)
    }
}

impl<S: MovementStorage, Tz: TimeZone> MonthPager<S, Tz> {
    pub fn with_time_zone(storage: S, tz: Tz) -> Self {
        Self {
            storage,
            tz,
            session: None,
            sections: StateHolder::new(Vec::new()),
        }
    }

    /// Snapshot of the loaded sections, newest month first
    pub fn sections(&self) -> Vec<MonthSection> {
        self.sections.get()
    }

    /// Receiver notified whenever sections are reset or appended
    pub fn subscribe(&self) -> watch::Receiver<Vec<MonthSection>> {
        self.sections.subscribe()
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.owner_id.as_str())
    }

    /// Months back from the anchor that the next `load_next` will examine
    pub fn offset(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.offset)
    }

    pub fn anchor(&self) -> Option<YearMonth> {
        self.session.as_ref().map(|s| s.anchor)
    }

    /// Reset paging for `owner_id` and load the current month
    pub async fn start(&mut self, owner_id: &str) -> Result<LoadOutcome> {
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        self.start_at(owner_id, today).await
    }

    /// Same as [`MonthPager::start`] with an explicit current date
    pub async fn start_at(&mut self, owner_id: &str, today: chrono::NaiveDate) -> Result<LoadOutcome> {
        let anchor = YearMonth::from_date(today);
        let movements = self.fetch_month(owner_id, anchor).await?;

        let outcome = if movements.is_empty() {
            self.sections.set(Vec::new());
            LoadOutcome::Skipped(anchor)
        } else {
            self.sections.set(vec![section(anchor, movements)]);
            LoadOutcome::Appended(anchor)
        };

        self.session = Some(Session {
            owner_id: owner_id.to_string(),
            anchor,
            offset: 1,
            earliest_millis: None,
        });

        info!("Started month pager for owner {} at {}: {:?}", owner_id, anchor, outcome);
        Ok(outcome)
    }

    /// Append the next older month that has movements.
    ///
    /// Empty months are skipped within the same call. When the owner has no
    /// movements at all there is no lower bound, so a single month is examined
    /// per call instead, and the next call asks storage again in case
    /// movements were added since.
    pub async fn load_next(&mut self, owner_id: &str) -> Result<LoadOutcome> {
        let session = self.session.as_ref().ok_or(PagerError::NotStarted)?;
        if session.owner_id != owner_id {
            return Err(PagerError::OwnerMismatch {
                started: session.owner_id.clone(),
                requested: owner_id.to_string(),
            }
            .into());
        }
        let anchor = session.anchor;
        let start_offset = session.offset;
        let cached_earliest = session.earliest_millis;

        let earliest_millis = match cached_earliest {
            Some(cached) => Some(cached),
            None => {
                let fetched = self.storage.earliest_movement_millis(owner_id).await?;
                if let (Some(session), Some(millis)) = (self.session.as_mut(), fetched) {
                    session.earliest_millis = Some(millis);
                }
                debug!("Earliest movement for owner {}: {:?}", owner_id, fetched);
                fetched
            }
        };
        let lower_bound =
            earliest_millis.and_then(|millis| YearMonth::containing_millis_in(&self.tz, millis));

        let mut offset = start_offset;
        loop {
            let candidate = anchor.months_back(offset);
            if let Some(lower) = lower_bound {
                if candidate < lower {
                    self.commit_offset(offset);
                    debug!("Month pager for owner {} exhausted at {}", owner_id, candidate);
                    return Ok(LoadOutcome::Exhausted);
                }
            }

            let movements = self.fetch_month(owner_id, candidate).await?;
            offset = offset.saturating_add(1);

            if !movements.is_empty() {
                self.commit_offset(offset);
                self.sections
                    .update(|sections| sections.push(section(candidate, movements)));
                info!("Appended {} for owner {}", candidate, owner_id);
                return Ok(LoadOutcome::Appended(candidate));
            }

            if lower_bound.is_none() {
                self.commit_offset(offset);
                return Ok(LoadOutcome::Skipped(candidate));
            }
            debug!("No movements in {} for owner {}, trying the month before", candidate, owner_id);
        }
    }

    async fn fetch_month(&self, owner_id: &str, month: YearMonth) -> Result<Vec<Movement>> {
        let (from, to) = month
            .range_millis_in(&self.tz)
            .ok_or_else(|| PagerError::InvalidMonth(month.to_string()))?;
        self.storage.list_movements_in_range(owner_id, from, to).await
    }

    fn commit_offset(&mut self, offset: u32) {
        if let Some(session) = self.session.as_mut() {
            session.offset = offset;
        }
    }
}

fn section(month: YearMonth, mut movements: Vec<Movement>) -> MonthSection {
    movements.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
    MonthSection {
        year: month.year,
        month: month.month,
        movements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use shared::MovementDirection;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeState {
        movements: Vec<Movement>,
        fail_range: bool,
        fail_earliest: bool,
        hang_range: bool,
        range_calls: Vec<(i64, i64)>,
        earliest_calls: usize,
    }

    /// In-memory storage with failure injection
    #[derive(Clone, Default)]
    struct FakeStorage {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeStorage {
        fn with_movements(movements: Vec<Movement>) -> Self {
            let storage = Self::default();
            storage.state.lock().unwrap().movements = movements;
            storage
        }

        fn set(&self, f: impl FnOnce(&mut FakeState)) {
            f(&mut self.state.lock().unwrap());
        }

        fn range_calls(&self) -> Vec<(i64, i64)> {
            self.state.lock().unwrap().range_calls.clone()
        }

        fn earliest_calls(&self) -> usize {
            self.state.lock().unwrap().earliest_calls
        }
    }

    #[async_trait]
    impl MovementStorage for FakeStorage {
        async fn store_movement(&self, movement: &Movement) -> Result<()> {
            self.state.lock().unwrap().movements.push(movement.clone());
            Ok(())
        }

        async fn store_movements(&self, _owner_id: &str, movements: &[Movement]) -> Result<usize> {
            self.state.lock().unwrap().movements.extend_from_slice(movements);
            Ok(movements.len())
        }

        async fn get_movement(&self, owner_id: &str, movement_id: &str) -> Result<Option<Movement>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .movements
                .iter()
                .find(|m| m.owner_id == owner_id && m.id == movement_id)
                .cloned())
        }

        async fn list_movements(&self, owner_id: &str) -> Result<Vec<Movement>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .movements
                .iter()
                .filter(|m| m.owner_id == owner_id)
                .cloned()
                .collect())
        }

        async fn list_movements_in_range(
            &self,
            owner_id: &str,
            from_millis: i64,
            to_millis: i64,
        ) -> Result<Vec<Movement>> {
            let hang = {
                let mut state = self.state.lock().unwrap();
                state.range_calls.push((from_millis, to_millis));
                if state.fail_range {
                    return Err(anyhow!("storage unavailable"));
                }
                state.hang_range
            };
            if hang {
                std::future::pending::<()>().await;
            }

            let state = self.state.lock().unwrap();
            Ok(state
                .movements
                .iter()
                .filter(|m| {
                    m.owner_id == owner_id
                        && m.timestamp_millis >= from_millis
                        && m.timestamp_millis <= to_millis
                })
                .cloned()
                .collect())
        }

        async fn earliest_movement_millis(&self, owner_id: &str) -> Result<Option<i64>> {
            let mut state = self.state.lock().unwrap();
            state.earliest_calls += 1;
            if state.fail_earliest {
                return Err(anyhow!("storage unavailable"));
            }
            Ok(state
                .movements
                .iter()
                .filter(|m| m.owner_id == owner_id)
                .map(|m| m.timestamp_millis)
                .min())
        }

        async fn delete_movement(&self, _owner_id: &str, movement_id: &str) -> Result<bool> {
            let mut state = self.state.lock().unwrap();
            let before = state.movements.len();
            state.movements.retain(|m| m.id != movement_id);
            Ok(state.movements.len() != before)
        }
    }

    const OWNER: &str = "user-1";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 16).unwrap()
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn movement_on(year: i32, month: u32, day: u32, amount: f64) -> Movement {
        let millis = Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .timestamp_millis();
        Movement {
            id: format!("{}-{}-{}-{}", OWNER, year, month, day),
            title: "Test".to_string(),
            subtitle: String::new(),
            amount,
            direction: MovementDirection::Income,
            timestamp_millis: millis,
            owner_id: OWNER.to_string(),
        }
    }

    fn pager(storage: &FakeStorage) -> MonthPager<FakeStorage, Utc> {
        MonthPager::with_time_zone(storage.clone(), Utc)
    }

    fn months(sections: &[MonthSection]) -> Vec<YearMonth> {
        sections.iter().map(|s| ym(s.year, s.month)).collect()
    }

    #[tokio::test]
    async fn test_start_loads_current_month() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 2, 10.0),
            movement_on(2025, 8, 10, 20.0),
            movement_on(2025, 7, 1, 5.0),
        ]);
        let mut pager = pager(&storage);

        let outcome = pager.start_at(OWNER, today()).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended(ym(2025, 8)));
        assert_eq!(pager.offset(), Some(1));
        assert_eq!(pager.anchor(), Some(ym(2025, 8)));

        let sections = pager.sections();
        assert_eq!(sections.len(), 1);
        // Newest first inside the section
        assert_eq!(sections[0].movements[0].amount, 20.0);
        assert_eq!(sections[0].movements[1].amount, 10.0);
    }

    #[tokio::test]
    async fn test_start_with_empty_current_month() {
        let storage = FakeStorage::with_movements(vec![movement_on(2025, 6, 1, 5.0)]);
        let mut pager = pager(&storage);

        let outcome = pager.start_at(OWNER, today()).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Skipped(ym(2025, 8)));
        assert!(pager.sections().is_empty());
        assert_eq!(pager.offset(), Some(1));
    }

    #[tokio::test]
    async fn test_load_next_skips_empty_months_in_one_call() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 5, 20, 2.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        let outcome = pager.load_next(OWNER).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended(ym(2025, 5)));
        assert_eq!(pager.offset(), Some(4));
        assert_eq!(months(&pager.sections()), vec![ym(2025, 8), ym(2025, 5)]);
    }

    #[tokio::test]
    async fn test_pages_back_to_earliest_month_then_exhausts() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 3, 1.0),
            movement_on(2025, 5, 3, 1.0),
            movement_on(2024, 12, 31, 1.0),
            movement_on(2024, 11, 20, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2025, 5)));
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2024, 12)));
        // The month holding the earliest movement is still emitted
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2024, 11)));
        assert_eq!(pager.offset(), Some(10));

        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Exhausted);
        let calls_after_exhaustion = storage.range_calls().len();
        let sections = pager.sections();

        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(pager.offset(), Some(10));
        assert_eq!(pager.sections(), sections);
        assert_eq!(storage.range_calls().len(), calls_after_exhaustion);

        let loaded = months(&sections);
        assert_eq!(
            loaded,
            vec![ym(2025, 8), ym(2025, 5), ym(2024, 12), ym(2024, 11)]
        );
        assert!(loaded.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[tokio::test]
    async fn test_earliest_is_fetched_once() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 7, 1, 1.0),
            movement_on(2025, 3, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        pager.load_next(OWNER).await.unwrap();
        pager.load_next(OWNER).await.unwrap();
        pager.load_next(OWNER).await.unwrap();
        assert_eq!(storage.earliest_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_and_retry_requeries_same_month() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 7, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();
        let sections_before = pager.sections();

        storage.set(|s| s.fail_range = true);
        assert!(pager.load_next(OWNER).await.is_err());
        assert_eq!(pager.offset(), Some(1));
        assert_eq!(pager.sections(), sections_before);
        let failed_range = *storage.range_calls().last().unwrap();

        storage.set(|s| s.fail_range = false);
        let outcome = pager.load_next(OWNER).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended(ym(2025, 7)));

        let calls = storage.range_calls();
        assert_eq!(calls[calls.len() - 1], failed_range);
        assert_eq!(pager.offset(), Some(2));
    }

    #[tokio::test]
    async fn test_failed_earliest_fetch_changes_nothing() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 7, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        storage.set(|s| s.fail_earliest = true);
        assert!(pager.load_next(OWNER).await.is_err());
        assert_eq!(pager.offset(), Some(1));
        assert_eq!(pager.sections().len(), 1);

        storage.set(|s| s.fail_earliest = false);
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2025, 7)));
        assert_eq!(storage.earliest_calls(), 2);
    }

    #[tokio::test]
    async fn test_dropped_call_leaves_state_unchanged() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 7, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        storage.set(|s| s.hang_range = true);
        let timed_out = tokio::time::timeout(Duration::from_millis(20), pager.load_next(OWNER)).await;
        assert!(timed_out.is_err());
        assert_eq!(pager.offset(), Some(1));
        assert_eq!(pager.sections().len(), 1);

        storage.set(|s| s.hang_range = false);
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2025, 7)));
    }

    #[tokio::test]
    async fn test_no_movements_examines_one_month_per_call() {
        let storage = FakeStorage::default();
        let mut pager = pager(&storage);
        assert_eq!(
            pager.start_at(OWNER, today()).await.unwrap(),
            LoadOutcome::Skipped(ym(2025, 8))
        );

        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Skipped(ym(2025, 7)));
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Skipped(ym(2025, 6)));
        assert_eq!(pager.offset(), Some(3));
        assert!(pager.sections().is_empty());
    }

    #[tokio::test]
    async fn test_movements_added_after_start_set_the_lower_bound() {
        let storage = FakeStorage::default();
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Skipped(ym(2025, 7)));

        storage.set(|s| s.movements.push(movement_on(2025, 4, 10, 3.0)));
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Appended(ym(2025, 4)));
        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(storage.earliest_calls(), 2);
        assert_eq!(months(&pager.sections()), vec![ym(2025, 4)]);
    }

    #[tokio::test]
    async fn test_failed_start_keeps_previous_session() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 7, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();
        pager.load_next(OWNER).await.unwrap();
        let sections_before = pager.sections();

        storage.set(|s| s.fail_range = true);
        assert!(pager.start_at("user-2", today()).await.is_err());

        assert_eq!(pager.sections(), sections_before);
        assert_eq!(pager.sections().len(), 2);
        assert_eq!(pager.offset(), Some(2));
        assert_eq!(pager.owner_id(), Some(OWNER));
        assert_eq!(pager.anchor(), Some(ym(2025, 8)));
    }

    #[tokio::test]
    async fn test_rejects_calls_before_start_or_for_other_owner() {
        let storage = FakeStorage::default();
        let mut pager = pager(&storage);

        let err = pager.load_next(OWNER).await.unwrap_err();
        assert_eq!(err.downcast_ref::<PagerError>(), Some(&PagerError::NotStarted));

        pager.start_at(OWNER, today()).await.unwrap();
        let err = pager.load_next("someone-else").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PagerError>(),
            Some(PagerError::OwnerMismatch { .. })
        ));
        assert_eq!(pager.offset(), Some(1));
    }

    #[tokio::test]
    async fn test_start_resets_previous_session() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 7, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();
        pager.load_next(OWNER).await.unwrap();
        assert_eq!(pager.sections().len(), 2);

        pager.start_at(OWNER, today()).await.unwrap();
        assert_eq!(pager.sections().len(), 1);
        assert_eq!(pager.offset(), Some(1));

        // The earliest timestamp is fetched again for the new session
        pager.load_next(OWNER).await.unwrap();
        assert_eq!(storage.earliest_calls(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_appended_sections() {
        let storage = FakeStorage::with_movements(vec![
            movement_on(2025, 8, 1, 1.0),
            movement_on(2025, 6, 1, 1.0),
        ]);
        let mut pager = pager(&storage);
        let mut receiver = pager.subscribe();

        pager.start_at(OWNER, today()).await.unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().len(), 1);

        pager.load_next(OWNER).await.unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(months(&receiver.borrow_and_update()), vec![ym(2025, 8), ym(2025, 6)]);
    }

    #[tokio::test]
    async fn test_earliest_after_anchor_exhausts_immediately() {
        let storage = FakeStorage::with_movements(vec![movement_on(2025, 9, 1, 1.0)]);
        let mut pager = pager(&storage);
        pager.start_at(OWNER, today()).await.unwrap();

        assert_eq!(pager.load_next(OWNER).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(pager.offset(), Some(1));
    }
}
