use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    AlertSeverity, Alert, ApproveAuthorizationInput, AuthorizationStatus, CandidateInput,
    CandidateStatus, CalculationStatus, Minutes, MovementDraft, MovementKey, MovementType,
    Notification, NotificationType, OVERTIME_APPROVAL_CATEGORY, OVERTIME_PENDING_ALERT,
    OvertimePolicy, OverworkAuthorization, RejectAuthorizationInput,
};
use crate::error::{AppError, AppResult};
use crate::services::{
    directory::WorkforceDirectory,
    ledger::LedgerWriter,
    normalizer::{ExcessBand, normalize},
    notifications::Notifier,
    policy::PolicyResolver,
    store::OvertimeStore,
};

/// What the gate decided for a candidate that needs approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub authorization_id: Option<Uuid>,
    pub status: CandidateStatus,
}

pub struct ApprovalGate<'a, S, D, N> {
    store: &'a S,
    directory: &'a D,
    notifier: &'a N,
}

impl<'a, S, D, N> ApprovalGate<'a, S, D, N>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    pub fn new(store: &'a S, directory: &'a D, notifier: &'a N) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    /// Bring the day's authorization in line with a freshly computed candidate
    /// that requires approval. Branches on the authorization's current status
    /// and never fails because of it.
    pub async fn evaluate(
        &self,
        candidate_id: Uuid,
        input: &CandidateInput,
        policy: &OvertimePolicy,
    ) -> AppResult<GateDecision> {
        let minutes = input.candidate_minutes;
        let latest = self
            .store
            .latest_authorization_for_day(input.organization_id, input.employee_id, input.work_date)
            .await?;

        let Some(mut authorization) = latest else {
            return self.open(candidate_id, input, policy).await;
        };

        match authorization.status {
            AuthorizationStatus::Cancelled => self.open(candidate_id, input, policy).await,
            AuthorizationStatus::Pending => {
                if authorization.requested_minutes != minutes
                    || authorization.candidate_id != candidate_id
                {
                    log::info!(
                        "Authorization {} now requests {} (was {})",
                        authorization.id,
                        minutes,
                        authorization.requested_minutes
                    );
                    authorization.requested_minutes = minutes;
                    authorization.candidate_id = candidate_id;
                    authorization.updated_at = Utc::now();
                    self.store.save_authorization(&authorization).await?;
                }
                Ok(GateDecision {
                    authorization_id: Some(authorization.id),
                    status: CandidateStatus::PendingApproval,
                })
            }
            AuthorizationStatus::Approved => {
                // Compared against the requested minutes, not the approved
                // ones: an approver's override stands until the day itself
                // changes.
                let adjusted = authorization.requested_minutes != minutes;
                let previous = authorization
                    .approved_minutes
                    .unwrap_or(authorization.requested_minutes);
                if adjusted {
                    authorization.requested_minutes = minutes;
                    authorization.approved_minutes = Some(minutes);
                    authorization.updated_at = Utc::now();
                }
                self.book(&authorization, input.candidate_type.into(), policy)
                    .await?;
                if adjusted {
                    self.notify_adjusted(&authorization, previous).await?;
                    // Saved last: until then a re-run sees the old minutes and
                    // repeats the adjustment and its notice.
                    self.store.save_authorization(&authorization).await?;
                    log::info!(
                        "Approved authorization {} adjusted from {} to {} after recalculation",
                        authorization.id,
                        previous,
                        minutes
                    );
                }
                Ok(GateDecision {
                    authorization_id: Some(authorization.id),
                    status: CandidateStatus::Settled,
                })
            }
            AuthorizationStatus::Rejected => {
                if authorization.requested_minutes == minutes {
                    Ok(GateDecision {
                        authorization_id: Some(authorization.id),
                        status: CandidateStatus::Rejected,
                    })
                } else {
                    self.open(candidate_id, input, policy).await
                }
            }
        }
    }

    /// Cancel the day's open authorization, if any, and remove its movement.
    /// Returns true when something was withdrawn.
    pub async fn withdraw(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<bool> {
        let Some(mut authorization) = self
            .store
            .latest_authorization_for_day(organization_id, employee_id, date)
            .await?
        else {
            return Ok(false);
        };
        if !authorization.is_open() {
            return Ok(false);
        }

        LedgerWriter::new(self.store)
            .remove_movement(organization_id, MovementKey::Authorization(authorization.id))
            .await?;

        if authorization.status == AuthorizationStatus::Approved {
            let previous = authorization
                .approved_minutes
                .unwrap_or(authorization.requested_minutes);
            let mut notice = authorization.clone();
            notice.approved_minutes = Some(Minutes::ZERO);
            self.notify_adjusted(&notice, previous).await?;
        }

        let now = Utc::now();
        authorization.status = AuthorizationStatus::Cancelled;
        authorization.resolution_notes = Some("Superseded by recalculation".to_string());
        authorization.resolved_at = Some(now);
        authorization.updated_at = now;
        self.store.save_authorization(&authorization).await?;

        log::info!(
            "Cancelled authorization {} for employee {} on {}: no longer required",
            authorization.id,
            employee_id,
            date
        );
        Ok(true)
    }

    pub async fn approve(
        &self,
        organization_id: Uuid,
        authorization_id: Uuid,
        approver_id: Uuid,
        input: ApproveAuthorizationInput,
    ) -> AppResult<OverworkAuthorization> {
        let mut authorization = self.load(organization_id, authorization_id).await?;
        if authorization.status != AuthorizationStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Authorization {} is already {}",
                authorization.id, authorization.status
            )));
        }

        let candidate = self
            .store
            .find_candidate_by_id(authorization.candidate_id)
            .await?
            .ok_or_else(|| AppError::not_found("Overtime candidate", authorization.candidate_id))?;
        let policy = PolicyResolver::new(self.directory)
            .resolve(organization_id)
            .await?;

        let approved = match input.approved_minutes {
            Some(value) if value < 0 => {
                return Err(AppError::BadRequest(
                    "approvedMinutes must not be negative".to_string(),
                ));
            }
            Some(value) => normalize(Minutes(value), &policy, ExcessBand::ExcessGrace),
            None => authorization.requested_minutes,
        };

        // The authorization stays PENDING until every effect is written, so a
        // failed approve can simply be sent again.
        let now = Utc::now();
        authorization.status = AuthorizationStatus::Approved;
        authorization.approved_minutes = Some(approved);
        authorization.approver_id = Some(approver_id);
        authorization.resolution_notes = input.notes;
        authorization.resolved_at = Some(now);
        authorization.updated_at = now;

        self.book(&authorization, candidate.candidate_type.into(), &policy)
            .await?;
        self.store
            .set_candidate_status(candidate.id, CandidateStatus::Settled)
            .await?;
        if let Some(workday_id) = candidate.workday_id {
            self.directory
                .set_calculation_status(workday_id, CalculationStatus::Ready)
                .await?;
        }
        self.notifier
            .notify(Notification {
                user_id: authorization.employee_id,
                organization_id,
                notification_type: NotificationType::OvertimeApproved,
                title: "Overtime approved".to_string(),
                message: format!(
                    "Your overtime on {} was approved: {}.",
                    authorization.work_date, approved
                ),
            })
            .await?;
        self.store.save_authorization(&authorization).await?;

        log::info!(
            "Authorization {} approved by {}: {} of {} requested",
            authorization.id,
            approver_id,
            approved,
            authorization.requested_minutes
        );
        Ok(authorization)
    }

    /// Reject a pending authorization, or revoke an approved one.
    pub async fn reject(
        &self,
        organization_id: Uuid,
        authorization_id: Uuid,
        approver_id: Uuid,
        input: RejectAuthorizationInput,
    ) -> AppResult<OverworkAuthorization> {
        let mut authorization = self.load(organization_id, authorization_id).await?;
        if !authorization.is_open() {
            return Err(AppError::Conflict(format!(
                "Authorization {} is already {}",
                authorization.id, authorization.status
            )));
        }

        let now = Utc::now();
        authorization.status = AuthorizationStatus::Rejected;
        authorization.approver_id = Some(approver_id);
        authorization.resolution_notes = input.notes;
        authorization.resolved_at = Some(now);
        authorization.updated_at = now;

        LedgerWriter::new(self.store)
            .remove_movement(organization_id, MovementKey::Authorization(authorization.id))
            .await?;

        if let Some(candidate) = self
            .store
            .find_candidate_by_id(authorization.candidate_id)
            .await?
        {
            self.store
                .set_candidate_status(candidate.id, CandidateStatus::Rejected)
                .await?;
            if let Some(workday_id) = candidate.workday_id {
                self.directory
                    .set_calculation_status(workday_id, CalculationStatus::Ready)
                    .await?;
            }
        }

        self.notifier
            .notify(Notification {
                user_id: authorization.employee_id,
                organization_id,
                notification_type: NotificationType::OvertimeRejected,
                title: "Overtime rejected".to_string(),
                message: format!(
                    "Your overtime request for {} ({}) was rejected.",
                    authorization.work_date, authorization.requested_minutes
                ),
            })
            .await?;
        self.store.save_authorization(&authorization).await?;

        log::info!(
            "Authorization {} rejected by {}",
            authorization.id,
            approver_id
        );
        Ok(authorization)
    }

    /// Cancel pending authorizations created more than `expiry_days` ago.
    pub async fn expire(&self, organization_id: Uuid, expiry_days: i64) -> AppResult<usize> {
        let cutoff = Utc::now() - Duration::days(expiry_days);
        let stale = self
            .store
            .list_pending_authorizations(organization_id, None, Some(cutoff))
            .await?;

        for mut authorization in stale.iter().cloned() {
            LedgerWriter::new(self.store)
                .remove_movement(organization_id, MovementKey::Authorization(authorization.id))
                .await?;
            self.store
                .set_candidate_status(authorization.candidate_id, CandidateStatus::Rejected)
                .await?;
            self.notifier
                .notify(Notification {
                    user_id: authorization.employee_id,
                    organization_id,
                    notification_type: NotificationType::OvertimeExpired,
                    title: "Overtime request expired".to_string(),
                    message: format!(
                        "Your overtime on {} ({}) was not reviewed within {} days and has expired.",
                        authorization.work_date, authorization.requested_minutes, expiry_days
                    ),
                })
                .await?;

            let now = Utc::now();
            authorization.status = AuthorizationStatus::Cancelled;
            authorization.resolution_notes =
                Some(format!("Expired after {} days without a decision", expiry_days));
            authorization.resolved_at = Some(now);
            authorization.updated_at = now;
            self.store.save_authorization(&authorization).await?;

            log::info!(
                "Authorization {} for employee {} on {} expired",
                authorization.id,
                authorization.employee_id,
                authorization.work_date
            );
        }

        Ok(stale.len())
    }

    async fn load(
        &self,
        organization_id: Uuid,
        authorization_id: Uuid,
    ) -> AppResult<OverworkAuthorization> {
        self.store
            .find_authorization(authorization_id)
            .await?
            .filter(|a| a.organization_id == organization_id)
            .ok_or_else(|| AppError::not_found("Authorization", authorization_id))
    }

    async fn open(
        &self,
        candidate_id: Uuid,
        input: &CandidateInput,
        policy: &OvertimePolicy,
    ) -> AppResult<GateDecision> {
        let authorization = OverworkAuthorization::new(
            input.organization_id,
            input.employee_id,
            input.work_date,
            candidate_id,
            input.candidate_minutes,
            policy.compensation_type,
        );

        // Saved only once the approvers and the alert are reached: a failed
        // delivery leaves nothing behind and the retry opens it afresh.
        let approvers = self.approvers(&authorization).await?;
        if approvers.is_empty() {
            log::warn!(
                "No approvers resolved for employee {}; authorization {} waits unassigned",
                input.employee_id,
                authorization.id
            );
        }
        for approver in approvers {
            self.notifier
                .notify(Notification {
                    user_id: approver,
                    organization_id: input.organization_id,
                    notification_type: NotificationType::OvertimeApprovalRequested,
                    title: "Overtime pending approval".to_string(),
                    message: format!(
                        "{} of {} overtime on {} needs your approval.",
                        input.candidate_minutes,
                        input.candidate_type.as_str().to_lowercase(),
                        input.work_date
                    ),
                })
                .await?;
        }

        self.notifier
            .raise_alert(Alert {
                organization_id: input.organization_id,
                employee_id: input.employee_id,
                severity: AlertSeverity::Warning,
                alert_type: OVERTIME_PENDING_ALERT.to_string(),
                description: format!(
                    "Overtime of {} on {} is waiting for approval",
                    input.candidate_minutes, input.work_date
                ),
                date: input.work_date,
                deviation_minutes: input.candidate_minutes,
            })
            .await?;

        self.store.save_authorization(&authorization).await?;
        log::info!(
            "Opened authorization {} for employee {} on {}: {} ({})",
            authorization.id,
            input.employee_id,
            input.work_date,
            input.candidate_minutes,
            input.candidate_type
        );
        Ok(GateDecision {
            authorization_id: Some(authorization.id),
            status: CandidateStatus::PendingApproval,
        })
    }

    /// Materialize the approved amount as the authorization's movement.
    async fn book(
        &self,
        authorization: &OverworkAuthorization,
        movement_type: MovementType,
        policy: &OvertimePolicy,
    ) -> AppResult<()> {
        let minutes = authorization
            .approved_minutes
            .unwrap_or(authorization.requested_minutes);
        let draft = MovementDraft {
            organization_id: authorization.organization_id,
            employee_id: authorization.employee_id,
            key: MovementKey::Authorization(authorization.id),
            movement_date: authorization.work_date,
            minutes,
            movement_type,
            description: Some(format!("Approved overtime for {}", authorization.work_date)),
            created_by: authorization.approver_id,
        };
        LedgerWriter::new(self.store)
            .upsert_movement(draft, policy)
            .await?;
        Ok(())
    }

    /// Approver chain plus whoever approved, without duplicates.
    async fn approvers(&self, authorization: &OverworkAuthorization) -> AppResult<Vec<Uuid>> {
        let mut approvers = self
            .directory
            .resolve_approvers(
                authorization.employee_id,
                authorization.organization_id,
                OVERTIME_APPROVAL_CATEGORY,
            )
            .await?;
        if let Some(approver) = authorization.approver_id {
            approvers.push(approver);
        }
        let mut seen = std::collections::HashSet::new();
        approvers.retain(|id| *id != authorization.employee_id && seen.insert(*id));
        Ok(approvers)
    }

    async fn notify_adjusted(
        &self,
        authorization: &OverworkAuthorization,
        previous: Minutes,
    ) -> AppResult<()> {
        let current = authorization.approved_minutes.unwrap_or(Minutes::ZERO);
        let mut recipients = vec![authorization.employee_id];
        recipients.extend(self.approvers(authorization).await?);

        for user_id in recipients {
            self.notifier
                .notify(Notification {
                    user_id,
                    organization_id: authorization.organization_id,
                    notification_type: NotificationType::OvertimeApprovalAdjusted,
                    title: "Approved overtime adjusted".to_string(),
                    message: format!(
                        "Approved overtime on {} changed from {} to {} after a time record correction.",
                        authorization.work_date, previous, current
                    ),
                })
                .await?;
        }
        Ok(())
    }
}
