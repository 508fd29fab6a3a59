//! Background work: job payloads, the singleton-keyed queue, the workers that
//! drive the engine and the periodic scheduler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use queue::{DeadLetter, JobQueue, QueueSettings};
pub use scheduler::{SchedulerSettings, run_scheduler};
pub use worker::start_workers;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkdayOvertimeJob {
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReconciliationJob {
    pub organization_id: Uuid,
    pub week_start: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkdaySweepJob {
    pub organization_id: Uuid,
    pub lookback_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationExpireJob {
    pub organization_id: Uuid,
    pub expiry_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Job {
    WorkdayOvertime(WorkdayOvertimeJob),
    WeeklyReconciliation(WeeklyReconciliationJob),
    WorkdaySweep(WorkdaySweepJob),
    AuthorizationExpire(AuthorizationExpireJob),
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::WorkdayOvertime(_) => "workday-overtime",
            Job::WeeklyReconciliation(_) => "weekly-reconciliation",
            Job::WorkdaySweep(_) => "workday-sweep",
            Job::AuthorizationExpire(_) => "authorization-expire",
        }
    }

    /// At most one pending job exists per key.
    pub fn singleton_key(&self) -> String {
        match self {
            Job::WorkdayOvertime(j) => {
                format!("workday:{}:{}:{}", j.organization_id, j.employee_id, j.date)
            }
            Job::WeeklyReconciliation(j) => format!("weekly:{}:{}", j.organization_id, j.week_start),
            Job::WorkdaySweep(j) => format!("sweep:{}", j.organization_id),
            Job::AuthorizationExpire(j) => format!("expire:{}", j.organization_id),
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match self {
            Job::WorkdayOvertime(j) => j.organization_id,
            Job::WeeklyReconciliation(j) => j.organization_id,
            Job::WorkdaySweep(j) => j.organization_id,
            Job::AuthorizationExpire(j) => j.organization_id,
        }
    }
}
