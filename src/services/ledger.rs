use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{
    Minutes, MovementDraft, MovementKey, MovementStatus, MovementType, OvertimePolicy,
    TimeBankMovement, same_ledger_effect,
};
use crate::error::AppResult;
use crate::services::store::OvertimeStore;

/// Result of fitting an attempted ledger change inside the balance caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampResult {
    pub attempted: Minutes,
    pub applied: Minutes,
    pub balance_before: Minutes,
    pub clamped: bool,
}

/// Clamp `attempted` so that `balance_before + applied` stays within
/// `[-max_negative, +max_positive]`. Never flips the sign of the change.
pub fn clamp_to_limits(
    attempted: Minutes,
    balance_before: Minutes,
    policy: &OvertimePolicy,
) -> ClampResult {
    let applied = if attempted.is_positive() {
        let cap = policy.max_positive_balance_minutes - balance_before;
        if cap.is_positive() {
            attempted.min(cap)
        } else {
            Minutes::ZERO
        }
    } else if attempted.is_negative() {
        let cap = -(balance_before + policy.max_negative_balance_minutes);
        if cap.is_negative() {
            attempted.max(cap)
        } else {
            Minutes::ZERO
        }
    } else {
        Minutes::ZERO
    };

    ClampResult {
        attempted,
        applied,
        balance_before,
        clamped: applied != attempted,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    /// The live movement after the write; `None` when nothing remains.
    pub movement: Option<TimeBankMovement>,
    /// Present whenever a non-zero amount was attempted.
    pub clamp: Option<ClampResult>,
}

impl LedgerOutcome {
    fn removed() -> Self {
        Self {
            movement: None,
            clamp: None,
        }
    }

    pub fn applied(&self) -> Minutes {
        self.movement
            .as_ref()
            .map(|m| m.minutes)
            .unwrap_or(Minutes::ZERO)
    }
}

pub struct LedgerWriter<'a, S> {
    store: &'a S,
}

impl<'a, S: OvertimeStore> LedgerWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Write (or clear) the automatic movement of one workday.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_auto_daily_movement(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        workday_id: Uuid,
        date: NaiveDate,
        minutes: Minutes,
        policy: &OvertimePolicy,
        movement_type: MovementType,
    ) -> AppResult<Option<TimeBankMovement>> {
        let draft = MovementDraft {
            organization_id,
            employee_id,
            key: MovementKey::AutoDaily {
                employee_id,
                workday_id,
            },
            movement_date: date,
            minutes,
            movement_type,
            description: Some(format!("Daily time balance for {}", date)),
            created_by: None,
        };
        Ok(self.upsert_movement(draft, policy).await?.movement)
    }

    /// Upsert the movement identified by `draft.key`, clamped against the
    /// policy caps. Zero (attempted or applied) removes the movement.
    pub async fn upsert_movement(
        &self,
        draft: MovementDraft,
        policy: &OvertimePolicy,
    ) -> AppResult<LedgerOutcome> {
        let organization_id = draft.organization_id;
        let employee_id = draft.employee_id;
        let existing = self.store.find_movement(organization_id, draft.key).await?;

        if draft.minutes.is_zero() {
            if let Some(existing) = existing {
                self.store.delete_movement(existing.id).await?;
                log::info!(
                    "Removed movement {} ({:?}) for employee {}: nothing left to book",
                    existing.id,
                    draft.key,
                    employee_id
                );
            }
            return Ok(LedgerOutcome::removed());
        }

        let balance_before = self
            .store
            .balance(organization_id, employee_id, existing.as_ref().map(|m| m.id))
            .await?;
        let clamp = clamp_to_limits(draft.minutes, balance_before, policy);

        if clamp.clamped {
            log::warn!(
                "Time bank limit reached for employee {}: attempted {}, applied {}, balance {} (caps +{} / -{})",
                employee_id,
                clamp.attempted,
                clamp.applied,
                clamp.balance_before,
                policy.max_positive_balance_minutes.value(),
                policy.max_negative_balance_minutes.value()
            );
        }

        if clamp.applied.is_zero() {
            if let Some(existing) = existing {
                self.store.delete_movement(existing.id).await?;
            }
            return Ok(LedgerOutcome {
                movement: None,
                clamp: Some(clamp),
            });
        }

        let metadata = clamp.clamped.then(|| {
            json!({
                "clampedByLimit": true,
                "attemptedMinutes": clamp.attempted.value(),
                "appliedMinutes": clamp.applied.value(),
                "balanceBefore": clamp.balance_before.value(),
                "maxPositiveMinutes": policy.max_positive_balance_minutes.value(),
                "maxNegativeMinutes": policy.max_negative_balance_minutes.value(),
            })
        });
        let movement = draft.into_movement(clamp.applied, metadata, existing.as_ref());

        if let Some(existing) = existing {
            if same_ledger_effect(&existing, &movement) {
                log::debug!("Movement {} unchanged, skipping write", existing.id);
                return Ok(LedgerOutcome {
                    movement: Some(existing),
                    clamp: Some(clamp),
                });
            }
        }

        self.store.save_movement(&movement).await?;
        Ok(LedgerOutcome {
            movement: Some(movement),
            clamp: Some(clamp),
        })
    }

    /// Delete the movement behind `key`, if any.
    pub async fn remove_movement(&self, organization_id: Uuid, key: MovementKey) -> AppResult<bool> {
        match self.store.find_movement(organization_id, key).await? {
            Some(existing) => {
                self.store.delete_movement(existing.id).await?;
                log::info!("Removed movement {} ({:?})", existing.id, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Keep the movement for audit but take it out of the balance.
    pub async fn cancel_movement(&self, organization_id: Uuid, key: MovementKey) -> AppResult<bool> {
        match self.store.find_movement(organization_id, key).await? {
            Some(mut existing) if existing.status == MovementStatus::Confirmed => {
                existing.status = MovementStatus::Cancelled;
                existing.updated_at = chrono::Utc::now();
                self.store.save_movement(&existing).await?;
                log::info!("Cancelled movement {} ({:?})", existing.id, key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use pretty_assertions::assert_eq;

    fn caps(max_positive: i32, max_negative: i32) -> OvertimePolicy {
        OvertimePolicy {
            max_positive_balance_minutes: Minutes(max_positive),
            max_negative_balance_minutes: Minutes(max_negative),
            ..Default::default()
        }
    }

    #[test]
    fn credit_is_cut_to_the_remaining_headroom() {
        let policy = caps(600, 300);
        let result = clamp_to_limits(Minutes(30), Minutes(590), &policy);
        assert_eq!(result.applied, Minutes(10));
        assert!(result.clamped);
    }

    #[test]
    fn debit_is_cut_to_the_remaining_headroom() {
        let policy = caps(600, 300);
        let result = clamp_to_limits(Minutes(-50), Minutes(-280), &policy);
        assert_eq!(result.applied, Minutes(-20));
        assert!(result.clamped);
    }

    #[test]
    fn full_cap_applies_nothing() {
        let policy = caps(600, 300);
        assert_eq!(
            clamp_to_limits(Minutes(30), Minutes(600), &policy).applied,
            Minutes::ZERO
        );
        assert_eq!(
            clamp_to_limits(Minutes(-30), Minutes(-300), &policy).applied,
            Minutes::ZERO
        );
        // Already over the cap after a policy change: still never reverses.
        assert_eq!(
            clamp_to_limits(Minutes(30), Minutes(700), &policy).applied,
            Minutes::ZERO
        );
    }

    #[test]
    fn changes_that_fit_are_untouched() {
        let policy = caps(600, 300);
        let result = clamp_to_limits(Minutes(-50), Minutes(100), &policy);
        assert_eq!(result.applied, Minutes(-50));
        assert!(!result.clamped);
    }

    #[test]
    fn resulting_balance_always_stays_within_caps() {
        for _ in 0..5_000 {
            let max_positive = (0..3_000).fake::<i32>();
            let max_negative = (0..3_000).fake::<i32>();
            let policy = caps(max_positive, max_negative);
            let balance = Minutes((-max_negative..=max_positive).fake::<i32>());
            let attempted = Minutes((-2_000..2_000).fake::<i32>());

            let result = clamp_to_limits(attempted, balance, &policy);
            let after = balance + result.applied;

            assert!(
                after.value() <= max_positive && after.value() >= -max_negative,
                "balance {balance:?} + {attempted:?} -> {after:?} outside [-{max_negative}, {max_positive}]"
            );
            assert!(result.applied.abs() <= attempted.abs());
        }
    }
}
