use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{entity::leave, payroll::PayrollStore, utils};

/// Payroll side effects of attendance and leave writes.
///
/// Failures are logged and swallowed, the write that fired them has already been committed.
#[derive(Clone)]
pub struct PayrollTriggers {
    store: Arc<PayrollStore>,
}

impl PayrollTriggers {
    pub fn new(store: Arc<PayrollStore>) -> Self {
        Self { store }
    }

    pub async fn attendance_changed(&self, user_id: Uuid, date: NaiveDate) {
        match self.store.recompute_after_attendance(user_id, date).await {
            Ok(payroll) => debug!(%user_id, period = %payroll.period, present_days = payroll.present_days, "payroll refreshed after attendance change"),
            Err(err) => error!(%user_id, %date, %err, "payroll recompute after attendance change failed"),
        }
    }

    pub async fn leave_approved(&self, leave: &leave::Model, is_paid: bool) {
        if !is_paid {
            return;
        }

        for month in utils::months_overlapping(leave.start_date, leave.end_date) {
            match self.store.recompute_if_draft(leave.user_id, month).await {
                Ok(Some(payroll)) => debug!(leave_id = %leave.id, period = %payroll.period, present_days = payroll.present_days, "payroll refreshed after leave approval"),
                Ok(None) => {},
                Err(err) => error!(leave_id = %leave.id, user_id = %leave.user_id, period = %month, %err, "payroll recompute after leave approval failed"),
            }
        }
    }
}
