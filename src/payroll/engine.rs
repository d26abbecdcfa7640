use std::{collections::{BTreeMap, BTreeSet, HashMap}, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{calendar::WorkdayCalendar, consts::DEFAULT_STANDARD_WORKDAYS, entity::{attendance, leave, leave_type, location, prelude::*, sea_orm_active_enums::LeaveStatus, user}, utils};

use super::{money, percentage, round2, PayrollError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Present,
    Absent,
    Leave,
    Weekend,
    Holiday,
}

/// An approved leave as seen by the payroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_paid: bool,
}

impl LeaveSpan {
    fn covers(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Everything a payroll figure is derived from, already loaded
#[derive(Debug, Clone)]
pub struct PayrollInputs {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub calendar: WorkdayCalendar,
    pub attended: BTreeSet<NaiveDate>,
    pub leaves: Vec<LeaveSpan>,
    pub rate: Decimal,
    pub standard_workdays: i32,
    /// Manually reviewed day count, `None` while the review follows the present days
    pub hk_review: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollComputation {
    pub user_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub standard_workdays: i32,
    pub attendance_days: i32,
    pub paid_leave_days: i32,
    pub present_days: i32,
    pub rate: Decimal,
    pub basic_salary: Decimal,
    pub estimated_salary: Decimal,
    pub hk_review: i32,
    pub final_salary: Decimal,
    pub percentage: Decimal,
    pub selisih: i32,
    pub days: BTreeMap<NaiveDate, DayStatus>,
}

/// Derives the payroll figures of one employee over one period.
///
/// A day with both an attendance and a paid leave counts once, as attendance.
/// Paid leave only counts on working days, the same days it consumed from the balance.
pub fn compute(user_id: Uuid, inputs: &PayrollInputs) -> PayrollComputation {
    let calendar = &inputs.calendar;
    let mut days = BTreeMap::new();
    let mut attendance_days = 0;
    let mut paid_leave_days = 0;

    for day in utils::days_between(inputs.period_start, inputs.period_end) {
        let leave = inputs.leaves.iter()
            .filter(|l| l.covers(day))
            .max_by_key(|l| l.is_paid);

        let status = if inputs.attended.contains(&day) {
            attendance_days += 1;
            if leave.is_some_and(|l| l.is_paid) {
                debug!(%user_id, %day, "attendance overlaps a paid leave, counting the day once");
            }
            DayStatus::Present
        } else if calendar.is_weekend(day) {
            DayStatus::Weekend
        } else if calendar.is_holiday(day) {
            DayStatus::Holiday
        } else if let Some(leave) = leave {
            if leave.is_paid {
                paid_leave_days += 1;
            }
            DayStatus::Leave
        } else {
            DayStatus::Absent
        };

        days.insert(day, status);
    }

    let present_days = attendance_days + paid_leave_days;
    let standard_workdays = inputs.standard_workdays;
    let rate = round2(inputs.rate);
    let hk_review = inputs.hk_review.unwrap_or(present_days);

    PayrollComputation {
        user_id,
        period_start: inputs.period_start,
        period_end: inputs.period_end,
        standard_workdays,
        attendance_days,
        paid_leave_days,
        present_days,
        rate,
        basic_salary: round2(rate * Decimal::from(standard_workdays)),
        estimated_salary: round2(rate * Decimal::from(present_days)),
        hk_review,
        final_salary: round2(rate * Decimal::from(hk_review)),
        percentage: percentage(present_days, standard_workdays),
        selisih: hk_review - standard_workdays,
        days,
    }
}

/// Employee override first, then the location default, zero while neither is set
pub fn resolve_rate(employee: &user::Model, location: Option<&location::Model>) -> Decimal {
    employee.nilai_hk
        .filter(|rate| *rate > 0.0)
        .or_else(|| location.map(|l| l.nilai_hk).filter(|rate| *rate > 0.0))
        .map(money)
        .unwrap_or(Decimal::ZERO)
}

pub(crate) async fn load_employee<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<(user::Model, Option<location::Model>), PayrollError> {
    let employee = User::find_by_id(user_id)
        .one(db).await?
        .ok_or(PayrollError::EmployeeNotFound(user_id))?;

    let location = match employee.location_id {
        Some(location_id) => Some(
            Location::find_by_id(location_id)
                .one(db).await?
                .ok_or(PayrollError::LocationNotFound(location_id))?
        ),
        None => None,
    };

    Ok((employee, location))
}

/// Attendance days plus paid leave days as they currently stand in the database
pub(crate) async fn load_inputs<C: ConnectionTrait>(
    db: &C,
    employee: &user::Model,
    location: Option<&location::Model>,
    (period_start, period_end): (NaiveDate, NaiveDate),
    standard_workdays: Option<i32>,
    hk_review: Option<i32>,
) -> Result<PayrollInputs, PayrollError> {
    let calendar = WorkdayCalendar::load(db, location, period_start, period_end).await?;

    let attended = Attendance::find()
        .filter(attendance::Column::UserId.eq(employee.id))
        .filter(attendance::Column::Date.between(period_start, period_end))
        .all(db).await?
        .into_iter()
        .map(|a| a.date)
        .collect::<BTreeSet<_>>();

    let approved_leaves = Leave::find()
        .filter(leave::Column::UserId.eq(employee.id))
        .filter(leave::Column::Status.eq(LeaveStatus::Approved))
        .filter(leave::Column::StartDate.lte(period_end))
        .filter(leave::Column::EndDate.gte(period_start))
        .all(db).await?;

    let paid_types = if approved_leaves.is_empty() {
        HashMap::new()
    } else {
        LeaveType::find()
            .filter(leave_type::Column::Id.is_in(approved_leaves.iter().map(|l| l.leave_type_id)))
            .all(db).await?
            .into_iter()
            .map(|t| (t.id, t.is_paid))
            .collect::<HashMap<_, _>>()
    };

    let leaves = approved_leaves.iter()
        .map(|l| LeaveSpan {
            start: l.start_date,
            end: l.end_date,
            is_paid: paid_types.get(&l.leave_type_id).copied().unwrap_or(false),
        })
        .collect();

    let standard_workdays = standard_workdays
        .or(employee.standard_workdays)
        .unwrap_or_else(|| calendar.standard_workdays(period_start, period_end, DEFAULT_STANDARD_WORKDAYS));

    Ok(PayrollInputs {
        period_start,
        period_end,
        calendar,
        attended,
        leaves,
        rate: resolve_rate(employee, location),
        standard_workdays,
        hk_review,
    })
}

/// On-demand payroll figures, nothing is persisted
#[derive(Debug, Clone)]
pub struct PayrollEngine {
    db: Arc<DatabaseConnection>,
}

impl PayrollEngine {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn generate_monthly_payroll(
        &self,
        user_id: Uuid,
        month: NaiveDate,
        standard_workdays: Option<i32>,
    ) -> Result<PayrollComputation, PayrollError> {
        let (employee, location) = load_employee(&*self.db, user_id).await?;
        let inputs = load_inputs(&*self.db, &employee, location.as_ref(), utils::month_range(month), standard_workdays, None).await?;

        Ok(compute(user_id, &inputs))
    }
}
