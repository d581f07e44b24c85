//! Capacity ledger (component B): the day-by-day allocation planner and
//! its durable, crash-safe state. All mutations are serialized through a
//! single in-process mutex, matching the spec's "each serialized against
//! all others on the same ledger" requirement.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use intake_contracts::BusinessDayPredicate;
use intake_model::ledger::{AcceptedTask, AllocationEntry, CapacityLogEntry, OverrideMap};
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::persist::{read_json_tolerant, write_atomic};

const CAPACITY_FILE: &str = "capacity.json";
const OVERRIDE_FILE: &str = "dailyOverride.json";
const TASKS_FILE: &str = "acceptedTasks.json";
const LOG_FILE: &str = "capacityLog.json";

/// Result of `sync_with_tasks`: the rebuilt capacity map, its numeric
/// delta from the prior state (summed across dates), and the overrides
/// dropped because their date is now in the past.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub after: BTreeMap<NaiveDate, f64>,
    pub diff: f64,
    pub deleted_overrides: Vec<NaiveDate>,
}

/// Result of `prune_before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneReport {
    pub capacity_entries_removed: usize,
    pub override_entries_removed: usize,
    pub allocations_removed: usize,
    pub tasks_removed: usize,
}

struct LedgerState {
    capacity: BTreeMap<NaiveDate, f64>,
    overrides: OverrideMap,
    tasks: Vec<AcceptedTask>,
}

/// The capacity ledger. Cheap to clone (an `Arc` internally would be more
/// typical, but callers are expected to wrap one `Ledger` in an `Arc`
/// themselves and share that, matching how the listener fleet and the
/// dashboard API both need the same instance).
pub struct Ledger {
    state: Mutex<LedgerState>,
    data_dir: PathBuf,
    c_default: f64,
    business_day: Arc<dyn BusinessDayPredicate>,
    clock: Box<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl Ledger {
    /// Load ledger state from `data_dir` (missing/malformed files fall
    /// back to empty state), baselined at `c_default` words/day.
    pub async fn load(
        data_dir: impl Into<PathBuf>,
        c_default: f64,
        business_day: Arc<dyn BusinessDayPredicate>,
    ) -> Self {
        let data_dir = data_dir.into();
        let capacity: BTreeMap<NaiveDate, f64> = read_json_tolerant(data_dir.join(CAPACITY_FILE))
            .await
            .unwrap_or_default();
        let overrides: OverrideMap = read_json_tolerant(data_dir.join(OVERRIDE_FILE))
            .await
            .unwrap_or_default();
        let tasks: Vec<AcceptedTask> = read_json_tolerant(data_dir.join(TASKS_FILE))
            .await
            .unwrap_or_default();

        Self {
            state: Mutex::new(LedgerState {
                capacity,
                overrides,
                tasks,
            }),
            data_dir,
            c_default,
            business_day,
            clock: Box::new(|| Utc::now().date_naive()),
        }
    }

    /// Override the ledger's notion of "today". Used by tests that need a
    /// fixed reference date instead of the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    fn effective_capacity(overrides: &OverrideMap, c_default: f64, date: NaiveDate) -> f64 {
        overrides.get(&date).copied().unwrap_or(c_default)
    }

    fn remaining(capacity: &BTreeMap<NaiveDate, f64>, overrides: &OverrideMap, c_default: f64, date: NaiveDate) -> f64 {
        let used = capacity.get(&date).copied().unwrap_or(0.0);
        (Self::effective_capacity(overrides, c_default, date) - used).max(0.0)
    }

    /// Current `remaining(date)` without mutating anything.
    pub async fn remaining_on(&self, date: NaiveDate) -> f64 {
        let state = self.state.lock().await;
        Self::remaining(&state.capacity, &state.overrides, self.c_default, date)
    }

    pub async fn capacity_snapshot(&self) -> BTreeMap<NaiveDate, f64> {
        self.state.lock().await.capacity.clone()
    }

    pub async fn override_snapshot(&self) -> OverrideMap {
        self.state.lock().await.overrides.clone()
    }

    pub async fn tasks_snapshot(&self) -> Vec<AcceptedTask> {
        self.state.lock().await.tasks.clone()
    }

    /// Walk backward from `deadline` filling the latest available business
    /// day first, committing the reservation into `state.capacity` on
    /// success. Does not persist or release the lock; callers that need
    /// `allocate`'s capacity commit and some other mutation (recording a
    /// task, say) to be atomic against concurrent `sync_with_tasks` /
    /// `prune_before` must hold `state` across both.
    fn allocate_locked(
        &self,
        state: &mut LedgerState,
        amount_words: f64,
        planned_end_date: Option<NaiveDate>,
    ) -> CoreResult<Vec<AllocationEntry>> {
        let Some(deadline) = planned_end_date else {
            return Err(CoreError::MissingDeadline);
        };

        let today = self.today();

        let mut plan = Vec::new();
        let mut remaining_needed = amount_words;
        let mut cursor = deadline;

        while remaining_needed > 0.0 && cursor >= today {
            if self.business_day.is_business_day(cursor) {
                let available =
                    Self::remaining(&state.capacity, &state.overrides, self.c_default, cursor);
                if available > 0.0 {
                    let take = remaining_needed.min(available);
                    plan.push(AllocationEntry {
                        date: cursor,
                        amount: take,
                    });
                    remaining_needed -= take;
                }
            }
            cursor = match cursor.pred_opt() {
                Some(prev) => prev,
                None => break,
            };
        }

        if remaining_needed > 1e-9 {
            return Err(CoreError::InsufficientCapacity {
                amount_words,
                planned_end_date: deadline.to_string(),
            });
        }

        for entry in &plan {
            *state.capacity.entry(entry.date).or_insert(0.0) += entry.amount;
        }

        Ok(plan)
    }

    /// Plan `amount_words` across business days ending no later than
    /// `planned_end_date`, walking backward and filling the latest
    /// available day first. Commits the reservation against `capacity` on
    /// success; leaves state untouched on rejection.
    pub async fn allocate(
        &self,
        amount_words: f64,
        planned_end_date: Option<NaiveDate>,
    ) -> CoreResult<Vec<AllocationEntry>> {
        let mut state = self.state.lock().await;
        let plan = self.allocate_locked(&mut state, amount_words, planned_end_date)?;
        self.persist_capacity(&state.capacity).await;
        Ok(plan)
    }

    /// `allocate` plus recording the committed accepted-task record, both
    /// under a single lock acquisition so a concurrent `sync_with_tasks` or
    /// `prune_before` can never observe the capacity increment without the
    /// matching task record, or vice versa.
    pub async fn accept_task(
        &self,
        order_id: Option<String>,
        workflow_name: Option<String>,
        amount_words: f64,
        planned_end_date_raw: Option<String>,
        planned_end_date: Option<NaiveDate>,
    ) -> CoreResult<AcceptedTask> {
        let mut state = self.state.lock().await;
        let plan = self.allocate_locked(&mut state, amount_words, planned_end_date)?;

        let task = AcceptedTask {
            order_id,
            workflow_name,
            amount_words,
            planned_end_date: planned_end_date_raw,
            allocation_plan: plan,
        };
        state.tasks.push(task.clone());
        self.persist_capacity(&state.capacity).await;
        self.persist_tasks(&state.tasks).await;

        Ok(task)
    }

    /// Decrement `capacity[date]` by `amount` for each plan entry, clamped
    /// to zero. Inverse of the capacity side-effects of `allocate`.
    pub async fn release(&self, plan: &[AllocationEntry]) {
        let mut state = self.state.lock().await;
        for entry in plan {
            let slot = state.capacity.entry(entry.date).or_insert(0.0);
            *slot = (*slot - entry.amount).max(0.0);
        }
        self.persist_capacity(&state.capacity).await;
    }

    /// Add `delta` (signed) to `capacity[date]`, clamped to zero.
    pub async fn adjust(&self, date: NaiveDate, delta: f64) {
        let mut state = self.state.lock().await;
        let slot = state.capacity.entry(date).or_insert(0.0);
        *slot = (*slot + delta).max(0.0);
        self.persist_capacity(&state.capacity).await;
        self.append_log(CapacityLogEntry {
            kind: "adjust".to_string(),
            date,
            amount: delta,
            user: None,
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Clear every capacity entry.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.capacity.clear();
        self.persist_capacity(&state.capacity).await;
    }

    pub async fn set_override(&self, date: NaiveDate, capacity: f64) {
        let mut state = self.state.lock().await;
        state.overrides.insert(date, capacity);
        self.persist_overrides(&state.overrides).await;
        self.append_log(CapacityLogEntry {
            kind: "set_override".to_string(),
            date,
            amount: capacity,
            user: None,
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn clear_override(&self, date: NaiveDate) {
        let mut state = self.state.lock().await;
        state.overrides.remove(&date);
        self.persist_overrides(&state.overrides).await;
        self.append_log(CapacityLogEntry {
            kind: "clear_override".to_string(),
            date,
            amount: 0.0,
            user: None,
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Rebuild `capacity` from the sum of all live task allocations.
    pub async fn sync_with_tasks(&self) -> SyncReport {
        let mut state = self.state.lock().await;
        let today = self.today();

        let mut rebuilt: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for task in &state.tasks {
            for entry in &task.allocation_plan {
                *rebuilt.entry(entry.date).or_insert(0.0) += entry.amount;
            }
        }

        let prior_total: f64 = state.capacity.values().sum();
        let rebuilt_total: f64 = rebuilt.values().sum();
        let diff = rebuilt_total - prior_total;

        state.capacity = rebuilt.clone();

        let deleted_overrides: Vec<NaiveDate> = state
            .overrides
            .keys()
            .filter(|date| **date < today)
            .copied()
            .collect();
        for date in &deleted_overrides {
            state.overrides.remove(date);
        }

        self.persist_capacity(&state.capacity).await;
        self.persist_overrides(&state.overrides).await;

        SyncReport {
            after: rebuilt,
            diff,
            deleted_overrides,
        }
    }

    /// Delete capacity/override entries strictly before `today` (or in
    /// `extra_dates`), strip those dates from every task's allocation
    /// plan, and drop tasks whose plan becomes empty.
    pub async fn prune_before(
        &self,
        today: NaiveDate,
        extra_dates: &[NaiveDate],
    ) -> PruneReport {
        let mut state = self.state.lock().await;
        let mut report = PruneReport::default();

        let should_prune = |date: &NaiveDate| *date < today || extra_dates.contains(date);

        let before = state.capacity.len();
        state.capacity.retain(|date, _| !should_prune(date));
        report.capacity_entries_removed = before - state.capacity.len();

        let before = state.overrides.len();
        state.overrides.retain(|date, _| !should_prune(date));
        report.override_entries_removed = before - state.overrides.len();

        let mut tasks_removed = 0usize;
        let mut allocations_removed = 0usize;
        state.tasks.retain_mut(|task| {
            let before = task.allocation_plan.len();
            task.allocation_plan.retain(|entry| !should_prune(&entry.date));
            allocations_removed += before - task.allocation_plan.len();
            if task.allocation_plan.is_empty() {
                tasks_removed += 1;
                false
            } else {
                true
            }
        });
        report.tasks_removed = tasks_removed;
        report.allocations_removed = allocations_removed;

        self.persist_capacity(&state.capacity).await;
        self.persist_overrides(&state.overrides).await;
        self.persist_tasks(&state.tasks).await;

        report
    }

    async fn persist_capacity(&self, capacity: &BTreeMap<NaiveDate, f64>) {
        if let Err(err) = write_atomic(self.data_dir.join(CAPACITY_FILE), capacity.clone()).await {
            tracing::error!(error = %err, "failed to persist capacity.json");
        }
    }

    async fn persist_overrides(&self, overrides: &OverrideMap) {
        if let Err(err) = write_atomic(self.data_dir.join(OVERRIDE_FILE), overrides.clone()).await {
            tracing::error!(error = %err, "failed to persist dailyOverride.json");
        }
    }

    async fn persist_tasks(&self, tasks: &[AcceptedTask]) {
        if let Err(err) = write_atomic(self.data_dir.join(TASKS_FILE), tasks.to_vec()).await {
            tracing::error!(error = %err, "failed to persist acceptedTasks.json");
        }
    }

    async fn append_log(&self, entry: CapacityLogEntry) {
        let path = self.data_dir.join(LOG_FILE);
        let mut log: Vec<CapacityLogEntry> = read_json_tolerant(&path).await.unwrap_or_default();
        log.push(entry);
        if let Err(err) = write_atomic(path, log).await {
            tracing::error!(error = %err, "failed to append capacityLog.json");
        }
    }
}

/// `plannedEndDate + business-day window` lookback helper used by callers
/// that want a rough "would this even be plannable" check before calling
/// `allocate`. Not part of the spec's operation list; kept small and
/// separate so `allocate` itself stays a pure walk.
pub fn earliest_plannable(today: NaiveDate, lookback_days: i64) -> NaiveDate {
    today - Duration::days(lookback_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_contracts::WeekdayOnly;

    fn ledger_for_test(data_dir: &std::path::Path, c_default: f64, today: NaiveDate) -> Ledger {
        Ledger {
            state: Mutex::new(LedgerState {
                capacity: BTreeMap::new(),
                overrides: OverrideMap::new(),
                tasks: Vec::new(),
            }),
            data_dir: data_dir.to_path_buf(),
            c_default,
            business_day: Arc::new(WeekdayOnly),
            clock: Box::new(move || today),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn s1_simple_accept() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));

        let plan = ledger
            .allocate(3000.0, Some(date(2026, 1, 23)))
            .await
            .unwrap();
        assert_eq!(plan, vec![AllocationEntry { date: date(2026, 1, 23), amount: 3000.0 }]);
        assert_eq!(ledger.capacity_snapshot().await.get(&date(2026, 1, 23)), Some(&3000.0));
    }

    #[tokio::test]
    async fn s2_multi_day_spill_latest_first() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));
        ledger.adjust(date(2026, 1, 26), 4000.0).await;

        // 2026-01-27 is a Tuesday; Jan 24/25 are weekend.
        let plan = ledger
            .allocate(12000.0, Some(date(2026, 1, 27)))
            .await
            .unwrap();

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for entry in &plan {
            by_date.insert(entry.date, entry.amount);
        }
        assert_eq!(by_date.get(&date(2026, 1, 27)), Some(&5000.0));
        assert_eq!(by_date.get(&date(2026, 1, 26)), Some(&1000.0));
        assert_eq!(by_date.get(&date(2026, 1, 23)), Some(&5000.0));
        assert_eq!(by_date.get(&date(2026, 1, 22)), Some(&1000.0));

        let total: f64 = plan.iter().map(|e| e.amount).sum();
        assert_eq!(total, 12000.0);

        assert_eq!(ledger.remaining_on(date(2026, 1, 27)).await, 0.0);
        assert_eq!(ledger.remaining_on(date(2026, 1, 26)).await, 0.0);
        assert_eq!(ledger.remaining_on(date(2026, 1, 23)).await, 0.0);
        assert_eq!(ledger.remaining_on(date(2026, 1, 22)).await, 4000.0);
    }

    #[tokio::test]
    async fn s3_rejection_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));
        ledger.adjust(date(2026, 1, 26), 4000.0).await;

        let err = ledger
            .allocate(12000.0, Some(date(2026, 1, 23)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientCapacity { .. }));
        // The only prior mutation (the adjust) must be the only state present.
        assert_eq!(ledger.capacity_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_deadline_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));
        let err = ledger.allocate(100.0, None).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingDeadline));
    }

    #[tokio::test]
    async fn allocate_then_release_restores_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));
        let before = ledger.capacity_snapshot().await;

        let plan = ledger
            .allocate(3000.0, Some(date(2026, 1, 23)))
            .await
            .unwrap();
        ledger.release(&plan).await;

        let after = ledger.capacity_snapshot().await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn sync_with_tasks_rebuilds_capacity_and_drops_past_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 25));
        ledger.set_override(date(2026, 1, 1), 9000.0).await;
        ledger
            .accept_task(
                Some("77".to_string()),
                None,
                3000.0,
                Some("2026-01-23 18:00".to_string()),
                Some(date(2026, 1, 23)),
            )
            .await
            .unwrap();

        // Corrupt capacity in-memory via a raw adjust to simulate drift.
        ledger.adjust(date(2026, 1, 23), 500.0).await;

        let report = ledger.sync_with_tasks().await;
        assert_eq!(report.after.get(&date(2026, 1, 23)), Some(&3000.0));
        assert_eq!(report.deleted_overrides, vec![date(2026, 1, 1)]);
        assert!(ledger.override_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn prune_before_removes_past_entries_and_empties_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_for_test(dir.path(), 5000.0, date(2026, 1, 20));
        ledger
            .accept_task(
                Some("1".to_string()),
                None,
                1000.0,
                Some("2026-01-10 00:00".to_string()),
                Some(date(2026, 1, 10)),
            )
            .await
            .unwrap();

        let report = ledger.prune_before(date(2026, 1, 20), &[]).await;
        assert_eq!(report.tasks_removed, 1);
        assert_eq!(report.allocations_removed, 1);
        assert!(ledger.tasks_snapshot().await.is_empty());
        assert!(ledger.capacity_snapshot().await.get(&date(2026, 1, 10)).is_none());
    }
}
