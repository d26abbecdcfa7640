use std::sync::Arc;

use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use chrono::{Datelike as _, NaiveDate};
use sea_orm::{prelude::{DateTimeWithTimeZone, Expr}, ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect, TransactionTrait};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{calendar::{CalendarError, WorkdayCalendar}, clock::Clock, entity::{leave, leave_balance, leave_type, prelude::*, sea_orm_active_enums::LeaveStatus, user}, triggers::PayrollTriggers};

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("database error")]
    Db(#[from] DbErr),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("employee {0} does not exist")]
    EmployeeNotFound(Uuid),
    #[error("leave type {0} does not exist")]
    LeaveTypeNotFound(Uuid),
    #[error("leave {0} does not exist")]
    LeaveNotFound(Uuid),
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("no working day between {start} and {end}")]
    NoWorkdays { start: NaiveDate, end: NaiveDate },
    #[error("leave {0} is not pending")]
    NotPending(Uuid),
    #[error("no leave balance for {year}")]
    BalanceNotFound { user_id: Uuid, leave_type_id: Uuid, year: i32 },
    #[error("insufficient leave balance: {required} days required, {available} available")]
    InsufficientBalance { required: i32, available: i32 },
}

impl actix_web::error::ResponseError for LeaveError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Db(_) | LeaveError::Calendar(CalendarError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            LeaveError::Calendar(_) | LeaveError::NoWorkdays { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            LeaveError::EmployeeNotFound(_) | LeaveError::LeaveTypeNotFound(_) | LeaveError::LeaveNotFound(_) | LeaveError::BalanceNotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::NotPending(_) | LeaveError::InsufficientBalance { .. } => StatusCode::CONFLICT,
        }
    }
}

/// Working days of `[start, end]` on the calendar of the employee's location
async fn leave_days<C: ConnectionTrait>(db: &C, employee: &user::Model, start: NaiveDate, end: NaiveDate) -> Result<i32, LeaveError> {
    let location = match employee.location_id {
        Some(location_id) => Location::find_by_id(location_id).one(db).await?,
        None => None,
    };

    let calendar = WorkdayCalendar::load(db, location.as_ref(), start, end).await?;

    Ok(calendar.count_workdays(start, end))
}

async fn find_employee<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<user::Model, LeaveError> {
    User::find_by_id(user_id)
        .one(db).await?
        .ok_or(LeaveError::EmployeeNotFound(user_id))
}

async fn find_leave_type<C: ConnectionTrait>(db: &C, leave_type_id: Uuid) -> Result<leave_type::Model, LeaveError> {
    LeaveType::find_by_id(leave_type_id)
        .one(db).await?
        .ok_or(LeaveError::LeaveTypeNotFound(leave_type_id))
}

/// Leave requests and the yearly balances they draw from
pub struct LeaveLedger {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    triggers: PayrollTriggers,
}

impl LeaveLedger {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>, triggers: PayrollTriggers) -> Self {
        Self { db, clock, triggers }
    }

    fn now(&self) -> DateTimeWithTimeZone {
        self.clock.now().fixed_offset()
    }

    #[instrument(skip(self, reason))]
    pub async fn submit(
        &self,
        user_id: Uuid,
        leave_type_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        reason: Option<String>,
    ) -> Result<leave::Model, LeaveError> {
        if start > end {
            return Err(LeaveError::InvalidRange { start, end });
        }

        let employee = find_employee(&*self.db, user_id).await?;
        find_leave_type(&*self.db, leave_type_id).await?;

        let total_days = leave_days(&*self.db, &employee, start, end).await?;
        if total_days == 0 {
            return Err(LeaveError::NoWorkdays { start, end });
        }

        let now = self.now();

        let leave = leave::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now),
            updated_at: Set(now),
            user_id: Set(user_id),
            leave_type_id: Set(leave_type_id),
            start_date: Set(start),
            end_date: Set(end),
            total_days: Set(total_days),
            reason: Set(reason),
            status: Set(LeaveStatus::Pending),
            approved_by: Set(None),
            approved_at: Set(None),
        }
        .insert(&*self.db).await?;

        info!(leave_id = %leave.id, %user_id, total_days, "leave submitted");

        Ok(leave)
    }

    /// Approves a pending leave and draws its working days from the balance of its start year.
    ///
    /// The balance draw and the status change commit together or not at all. Paid leave then
    /// refreshes the draft payrolls of every month it overlaps.
    #[instrument(skip(self))]
    pub async fn approve_leave(&self, leave_id: Uuid, approver_id: Uuid) -> Result<leave::Model, LeaveError> {
        let txn = self.db.begin().await?;

        let (approved, is_paid) = match approve_locked(&txn, leave_id, approver_id, self.now()).await {
            Ok(approved) => approved,
            Err(err) => {
                txn.rollback().await?;
                return Err(err);
            },
        };

        txn.commit().await?;

        info!(%leave_id, user_id = %approved.user_id, total_days = approved.total_days, is_paid, "leave approved");

        self.triggers.leave_approved(&approved, is_paid).await;

        Ok(approved)
    }

    #[instrument(skip(self))]
    pub async fn reject_leave(&self, leave_id: Uuid, actor_id: Uuid) -> Result<leave::Model, LeaveError> {
        let leave = Leave::find_by_id(leave_id)
            .one(&*self.db).await?
            .ok_or(LeaveError::LeaveNotFound(leave_id))?;

        let now = self.now();

        let result = Leave::update_many()
            .col_expr(leave::Column::Status, Expr::value(LeaveStatus::Rejected))
            .col_expr(leave::Column::ApprovedBy, Expr::value(Some(actor_id)))
            .col_expr(leave::Column::ApprovedAt, Expr::value(Some(now)))
            .col_expr(leave::Column::UpdatedAt, Expr::value(now))
            .filter(leave::Column::Id.eq(leave_id))
            .filter(leave::Column::Status.eq(LeaveStatus::Pending))
            .exec(&*self.db).await?;

        if result.rows_affected == 0 {
            return Err(LeaveError::NotPending(leave.id));
        }

        info!(%leave_id, user_id = %leave.user_id, "leave rejected");

        Ok(leave::Model {
            status: LeaveStatus::Rejected,
            approved_by: Some(actor_id),
            approved_at: Some(now),
            updated_at: now,
            ..leave
        })
    }
}

async fn approve_locked<C: ConnectionTrait>(
    txn: &C,
    leave_id: Uuid,
    approver_id: Uuid,
    now: DateTimeWithTimeZone,
) -> Result<(leave::Model, bool), LeaveError> {
    let leave = Leave::find_by_id(leave_id)
        .lock_exclusive()
        .one(txn).await?
        .ok_or(LeaveError::LeaveNotFound(leave_id))?;

    if leave.status != LeaveStatus::Pending {
        return Err(LeaveError::NotPending(leave_id));
    }

    let employee = find_employee(txn, leave.user_id).await?;
    let leave_type = find_leave_type(txn, leave.leave_type_id).await?;

    // Holidays may have changed since submission
    let total_days = leave_days(txn, &employee, leave.start_date, leave.end_date).await?;
    let year = leave.start_date.year();

    let balance = LeaveBalance::find()
        .filter(leave_balance::Column::UserId.eq(leave.user_id))
        .filter(leave_balance::Column::LeaveTypeId.eq(leave.leave_type_id))
        .filter(leave_balance::Column::Year.eq(year))
        .lock_exclusive()
        .one(txn).await?
        .ok_or(LeaveError::BalanceNotFound {
            user_id: leave.user_id,
            leave_type_id: leave.leave_type_id,
            year,
        })?;

    let insufficient = LeaveError::InsufficientBalance {
        required: total_days,
        available: balance.remaining_days,
    };

    if balance.remaining_days < total_days {
        return Err(insufficient);
    }

    let drawn = LeaveBalance::update_many()
        .col_expr(leave_balance::Column::UsedDays, Expr::col(leave_balance::Column::UsedDays).add(total_days))
        .col_expr(leave_balance::Column::RemainingDays, Expr::col(leave_balance::Column::RemainingDays).sub(total_days))
        .col_expr(leave_balance::Column::UpdatedAt, Expr::value(now))
        .filter(leave_balance::Column::Id.eq(balance.id))
        .filter(leave_balance::Column::RemainingDays.gte(total_days))
        .exec(txn).await?;

    if drawn.rows_affected == 0 {
        return Err(insufficient);
    }

    let mut model: leave::ActiveModel = leave.into();
    model.status = Set(LeaveStatus::Approved);
    model.total_days = Set(total_days);
    model.approved_by = Set(Some(approver_id));
    model.approved_at = Set(Some(now));
    model.updated_at = Set(now);

    let approved = model.update(txn).await?;

    Ok((approved, leave_type.is_paid))
}
