//! Goal funding milestones: threshold-crossing detection for celebratory notifications.

use serde::{Deserialize, Serialize};

/// Funded-percentage thresholds that trigger a milestone notification.
pub const MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Savings goal as stored by the CRUD layer. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub target_amount: i64,
    #[serde(default)]
    pub current_amount: i64,
    /// Highest milestone already notified; 0 when none.
    #[serde(default)]
    pub milestone_watermark: u8,
}

impl Goal {
    pub fn new(id: impl Into<String>, name: impl Into<String>, target_amount: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target_amount,
            current_amount: 0,
            milestone_watermark: 0,
        }
    }

    pub fn percent_funded(&self) -> i64 {
        percent_funded(self.current_amount, self.target_amount)
    }
}

/// `floor(amount / target * 100)`; 0 for a non-positive target.
pub fn percent_funded(amount: i64, target: i64) -> i64 {
    if target <= 0 {
        return 0;
    }
    let pct = (i128::from(amount) * 100).div_euclid(i128::from(target));
    pct.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Thresholds `m` with `pct(before) < m <= pct(after)`, in ascending order.
///
/// Stateless: calling it twice for the same contribution reports the same
/// crossings twice. See [`unnotified_crossings`] for the watermark-guarded form.
pub fn detect_crossings(before_amount: i64, after_amount: i64, target: i64) -> Vec<u8> {
    if target <= 0 {
        return Vec::new();
    }
    let before = percent_funded(before_amount, target);
    let after = percent_funded(after_amount, target);
    MILESTONES
        .iter()
        .copied()
        .filter(|m| before < i64::from(*m) && i64::from(*m) <= after)
        .collect()
}

/// Crossings above the goal's persisted watermark, so each threshold fires once.
pub fn unnotified_crossings(
    before_amount: i64,
    after_amount: i64,
    target: i64,
    watermark: u8,
) -> Vec<u8> {
    detect_crossings(before_amount, after_amount, target)
        .into_iter()
        .filter(|m| *m > watermark)
        .collect()
}
