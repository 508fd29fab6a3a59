//! Employee-initiated time-bank requests and manual balance adjustments.
//! Both write straight into the ledger and go through the same clamp as the
//! daily pipeline.

use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{
    BalanceAdjustmentInput, CreateTimeBankRequestInput, Minutes, MovementDraft, MovementKey,
    MovementType, Notification, NotificationType, RequestKind, RequestStatus, ReviewRequestInput,
    TimeBankMovement, TimeBankRequest,
};
use crate::error::{AppError, AppResult};
use crate::services::{
    directory::WorkforceDirectory, ledger::LedgerWriter, notifications::Notifier,
    policy::PolicyResolver, store::OvertimeStore,
};

pub struct TimeBankRequests<'a, S, D, N> {
    store: &'a S,
    directory: &'a D,
    notifier: &'a N,
}

impl<'a, S, D, N> TimeBankRequests<'a, S, D, N>
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

    pub async fn create(
        &self,
        organization_id: Uuid,
        input: CreateTimeBankRequestInput,
    ) -> AppResult<TimeBankRequest> {
        if input.minutes <= 0 {
            return Err(AppError::BadRequest(
                "minutes must be greater than zero".to_string(),
            ));
        }

        let now = Utc::now();
        let request = TimeBankRequest {
            id: Uuid::new_v4(),
            organization_id,
            employee_id: input.employee_id,
            kind: input.kind,
            minutes: Minutes(input.minutes),
            request_date: input.date,
            reason: input.reason,
            status: RequestStatus::Pending,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save_request(&request).await?;

        log::info!(
            "Time-bank request {} ({}) created for employee {}: {}",
            request.id,
            request.kind,
            request.employee_id,
            request.minutes
        );
        Ok(request)
    }

    pub async fn approve(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        reviewer_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<TimeBankRequest> {
        let mut request = self.load_pending(organization_id, request_id).await?;
        let policy = PolicyResolver::new(self.directory)
            .resolve(organization_id)
            .await?;

        let draft = MovementDraft {
            organization_id,
            employee_id: request.employee_id,
            key: MovementKey::Request(request.id),
            movement_date: request.request_date,
            minutes: request.signed_minutes(),
            movement_type: match request.kind {
                RequestKind::Recovery => MovementType::Recovery,
                RequestKind::Festive => MovementType::Festive,
            },
            description: request.reason.clone(),
            created_by: Some(reviewer_id),
        };
        let outcome = LedgerWriter::new(self.store)
            .upsert_movement(draft, &policy)
            .await?;

        let now = Utc::now();
        request.status = RequestStatus::Approved;
        request.reviewed_by = Some(reviewer_id);
        request.review_notes = input.notes;
        request.reviewed_at = Some(now);
        request.updated_at = now;
        self.notify_employee(
            &request,
            NotificationType::TimeBankRequestApproved,
            "Time-bank request approved",
            format!(
                "Your {} request for {} on {} was approved.",
                request.kind.as_str().to_lowercase(),
                request.minutes,
                request.request_date
            ),
        )
        .await?;
        self.store.save_request(&request).await?;

        log::info!(
            "Time-bank request {} approved by {}: applied {}",
            request.id,
            reviewer_id,
            outcome.applied()
        );
        Ok(request)
    }

    pub async fn reject(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        reviewer_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<TimeBankRequest> {
        let mut request = self.load_pending(organization_id, request_id).await?;

        let now = Utc::now();
        request.status = RequestStatus::Rejected;
        request.reviewed_by = Some(reviewer_id);
        request.review_notes = input.notes;
        request.reviewed_at = Some(now);
        request.updated_at = now;
        self.notify_employee(
            &request,
            NotificationType::TimeBankRequestRejected,
            "Time-bank request rejected",
            format!(
                "Your {} request for {} on {} was rejected.",
                request.kind.as_str().to_lowercase(),
                request.minutes,
                request.request_date
            ),
        )
        .await?;
        self.store.save_request(&request).await?;

        log::info!("Time-bank request {} rejected by {}", request.id, reviewer_id);
        Ok(request)
    }

    /// Withdraw a pending or approved request. An approved request keeps its
    /// movement for audit, marked cancelled.
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<TimeBankRequest> {
        let mut request = self.load(organization_id, request_id).await?;
        match request.status {
            RequestStatus::Pending => {}
            RequestStatus::Approved => {
                LedgerWriter::new(self.store)
                    .cancel_movement(organization_id, MovementKey::Request(request.id))
                    .await?;
            }
            status => {
                return Err(AppError::Conflict(format!(
                    "Time-bank request {} is already {}",
                    request.id, status
                )));
            }
        }

        request.status = RequestStatus::Cancelled;
        request.updated_at = Utc::now();
        self.store.save_request(&request).await?;

        log::info!("Time-bank request {} cancelled by {}", request.id, actor_id);
        Ok(request)
    }

    /// Book a manual `ADJUSTMENT`. Clamped like every other ledger write.
    pub async fn adjust_balance(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        actor_id: Uuid,
        input: BalanceAdjustmentInput,
    ) -> AppResult<Option<TimeBankMovement>> {
        if input.minutes == 0 {
            return Err(AppError::BadRequest(
                "minutes must not be zero".to_string(),
            ));
        }
        if input.reason.trim().is_empty() {
            return Err(AppError::BadRequest("reason is required".to_string()));
        }

        let policy = PolicyResolver::new(self.directory)
            .resolve(organization_id)
            .await?;
        let draft = MovementDraft {
            organization_id,
            employee_id,
            key: MovementKey::Adjustment(Uuid::new_v4()),
            movement_date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
            minutes: Minutes(input.minutes),
            movement_type: MovementType::Adjustment,
            description: Some(input.reason),
            created_by: Some(actor_id),
        };
        let outcome = LedgerWriter::new(self.store)
            .upsert_movement(draft, &policy)
            .await?;

        log::info!(
            "Manual adjustment for employee {} by {}: requested {}, applied {}",
            employee_id,
            actor_id,
            Minutes(input.minutes),
            outcome.applied()
        );
        Ok(outcome.movement)
    }

    async fn load(&self, organization_id: Uuid, request_id: Uuid) -> AppResult<TimeBankRequest> {
        self.store
            .find_request(request_id)
            .await?
            .filter(|r| r.organization_id == organization_id)
            .ok_or_else(|| AppError::not_found("Time-bank request", request_id))
    }

    async fn load_pending(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<TimeBankRequest> {
        let request = self.load(organization_id, request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Time-bank request {} is already {}",
                request.id, request.status
            )));
        }
        Ok(request)
    }

    async fn notify_employee(
        &self,
        request: &TimeBankRequest,
        notification_type: NotificationType,
        title: &str,
        message: String,
    ) -> AppResult<()> {
        self.notifier
            .notify(Notification {
                user_id: request.employee_id,
                organization_id: request.organization_id,
                notification_type,
                title: title.to_string(),
                message,
            })
            .await
    }
}
