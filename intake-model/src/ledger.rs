use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single day's reservation within an [`AcceptedTask`]'s allocation plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub date: NaiveDate,
    pub amount: f64,
}

/// A committed, persisted task: the offer fields plus the day-by-day plan
/// that `allocate` produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedTask {
    pub order_id: Option<String>,
    pub workflow_name: Option<String>,
    pub amount_words: f64,
    pub planned_end_date: Option<String>,
    pub allocation_plan: Vec<AllocationEntry>,
}

impl AcceptedTask {
    /// Sum of this task's allocation across `date`, usually 0 or 1 entries
    /// but summed defensively in case of (should-not-happen) duplicates.
    pub fn amount_on(&self, date: NaiveDate) -> f64 {
        self.allocation_plan
            .iter()
            .filter(|entry| entry.date == date)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Drop every plan entry on or before `cutoff` is not satisfied; keep only
    /// entries with `date >= cutoff`. Returns true if the plan became empty.
    pub fn retain_from(&mut self, cutoff: NaiveDate) -> bool {
        self.allocation_plan.retain(|entry| entry.date >= cutoff);
        self.allocation_plan.is_empty()
    }
}

/// `date -> override capacity`, replacing the baseline for that date only.
pub type OverrideMap = BTreeMap<NaiveDate, f64>;

/// One line of the append-only `capacityLog.json` audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityLogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub user: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
