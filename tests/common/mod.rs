#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use timebank::database::memory::{InMemoryDirectory, InMemoryStore};
use timebank::database::models::{
    ApprovalMode, CalculationMode, EffectiveSchedule, Minutes, OvertimeSettings, ScheduleSource,
};
use timebank::services::{OvertimeEngine, OvertimeStore, RecordingNotifier};

pub type MemoryEngine = OvertimeEngine<InMemoryStore, InMemoryDirectory, RecordingNotifier>;

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Settings used by most flows: 15 minute tolerance, 10 minute deficit grace,
/// 5 minute rounding.
pub fn base_settings() -> OvertimeSettings {
    OvertimeSettings {
        tolerance_minutes: Some(Minutes(15)),
        deficit_grace_minutes: Some(Minutes(10)),
        rounding_increment_minutes: Some(Minutes(5)),
        ..Default::default()
    }
}

pub fn approval_settings() -> OvertimeSettings {
    OvertimeSettings {
        approval_mode: Some(ApprovalMode::Post),
        ..base_settings()
    }
}

pub fn weekly_settings() -> OvertimeSettings {
    OvertimeSettings {
        calculation_mode: Some(CalculationMode::Weekly),
        ..base_settings()
    }
}

pub fn working_day(expected: i32) -> EffectiveSchedule {
    EffectiveSchedule {
        expected_minutes: Some(Minutes(expected)),
        is_working_day: true,
        source: ScheduleSource::Contract,
        exception_type: None,
    }
}

/// One organization with one employee and one approver, over the in-memory
/// collaborators.
pub struct TestContext {
    pub engine: Arc<MemoryEngine>,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub approver_id: Uuid,
}

impl TestContext {
    pub fn new(settings: OvertimeSettings) -> Self {
        setup_test_env();
        let organization_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let approver_id = Uuid::new_v4();

        let directory = InMemoryDirectory::new();
        directory.put_settings(organization_id, settings);
        directory.put_approvers(organization_id, employee_id, vec![approver_id]);

        let engine = Arc::new(OvertimeEngine::new(
            InMemoryStore::new(),
            directory,
            RecordingNotifier::new(),
        ));

        Self {
            engine,
            organization_id,
            employee_id,
            approver_id,
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        self.engine.store()
    }

    pub fn directory(&self) -> &InMemoryDirectory {
        self.engine.directory()
    }

    pub fn notifier(&self) -> &RecordingNotifier {
        self.engine.notifier()
    }

    pub fn record_day(&self, day: NaiveDate, worked: i32, expected: Option<i32>) {
        self.directory()
            .put_summary(self.organization_id, self.employee_id, day, worked, expected);
    }

    pub async fn recompute(&self, day: NaiveDate) {
        self.engine
            .recompute_day(self.organization_id, self.employee_id, day)
            .await
            .unwrap();
    }

    pub async fn balance(&self) -> Minutes {
        self.store()
            .balance(self.organization_id, self.employee_id, None)
            .await
            .unwrap()
    }
}
