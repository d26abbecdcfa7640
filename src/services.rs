use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{attendance::AttendanceRecorder, clock::Clock, leave::LeaveLedger, payroll::{PayrollEngine, PayrollStore}, timezone::TimezoneResolver, triggers::PayrollTriggers};

/// Everything the handlers and the scheduler share, attached once as app data
pub struct Services {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<dyn Clock>,
    pub timezones: TimezoneResolver,
    pub engine: PayrollEngine,
    pub payrolls: Arc<PayrollStore>,
    pub attendance: AttendanceRecorder,
    pub leaves: LeaveLedger,
}

impl Services {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>, timezones: TimezoneResolver) -> Self {
        let payrolls = Arc::new(PayrollStore::new(db.clone(), clock.clone()));
        let triggers = PayrollTriggers::new(payrolls.clone());

        Self {
            engine: PayrollEngine::new(db.clone()),
            attendance: AttendanceRecorder::new(db.clone(), clock.clone(), timezones, triggers.clone()),
            leaves: LeaveLedger::new(db.clone(), clock.clone(), triggers),
            payrolls,
            timezones,
            clock,
            db,
        }
    }
}
