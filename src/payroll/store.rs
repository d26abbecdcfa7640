use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, TransactionTrait};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{clock::Clock, entity::{location, payroll, prelude::*, sea_orm_active_enums::PayrollStatus, user}, utils};

use super::{engine::{self, PayrollComputation}, money, percentage, round2, to_column, PayrollError};

/// Single writer per (employee, month) for every read-modify-write of a payroll row
#[derive(Debug, Default)]
pub struct PayrollGate {
    inflight: Mutex<HashMap<(Uuid, NaiveDate), Arc<Mutex<()>>>>,
}

impl PayrollGate {
    pub async fn acquire(&self, user_id: Uuid, period: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);

            Arc::clone(
                inflight
                    .entry((user_id, period))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        lock.lock_owned().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOutcome {
    Created,
    Updated,
    Skipped,
}

/// Persisted monthly payrolls and the rules for when they may be rewritten
pub struct PayrollStore {
    db: Arc<DatabaseConnection>,
    gate: PayrollGate,
    clock: Arc<dyn Clock>,
}

impl PayrollStore {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            gate: PayrollGate::default(),
            clock,
        }
    }

    pub async fn find(&self, user_id: Uuid, month: NaiveDate) -> Result<Option<payroll::Model>, PayrollError> {
        let (period, _) = utils::month_range(month);

        Ok(find_period(&*self.db, user_id, period, false).await?)
    }

    /// Refreshes the month of `date` after one of the employee's attendance rows changed.
    ///
    /// Present days and percentage always follow the attendance facts, the salary figures
    /// only while the payroll is a draft. A missing payroll is created as a draft.
    pub async fn recompute_after_attendance(&self, user_id: Uuid, date: NaiveDate) -> Result<payroll::Model, PayrollError> {
        let range = utils::month_range(date);
        let _guard = self.gate.acquire(user_id, range.0).await;

        let txn = self.db.begin().await?;

        let (employee, location) = engine::load_employee(&txn, user_id).await?;

        let model = match find_period(&txn, user_id, range.0, true).await? {
            Some(existing) => {
                let inputs = engine::load_inputs(&txn, &employee, location.as_ref(), range, Some(existing.standard_workdays), None).await?;
                let present_days = engine::compute(user_id, &inputs).present_days;

                apply_present_days(&txn, existing, present_days, self.now()).await?
            },
            None => {
                let inputs = engine::load_inputs(&txn, &employee, location.as_ref(), range, None, None).await?;
                let computation = engine::compute(user_id, &inputs);

                info!(%user_id, period = %range.0, "creating draft payroll on first attendance of the month");
                insert_draft(&txn, &computation, self.now()).await?
            },
        };

        txn.commit().await?;

        Ok(model)
    }

    /// Refreshes a month touched by an approved leave, only when its payroll exists and is a draft
    pub async fn recompute_if_draft(&self, user_id: Uuid, month: NaiveDate) -> Result<Option<payroll::Model>, PayrollError> {
        let range = utils::month_range(month);
        let _guard = self.gate.acquire(user_id, range.0).await;

        let txn = self.db.begin().await?;

        let Some(existing) = find_period(&txn, user_id, range.0, true).await? else {
            debug!(%user_id, period = %range.0, "no payroll for the month yet");
            return Ok(None);
        };

        if existing.status != PayrollStatus::Draft {
            debug!(%user_id, period = %range.0, "payroll is frozen, leaving it alone");
            return Ok(None);
        }

        let (employee, location) = engine::load_employee(&txn, user_id).await?;
        let inputs = engine::load_inputs(&txn, &employee, location.as_ref(), range, Some(existing.standard_workdays), None).await?;
        let present_days = engine::compute(user_id, &inputs).present_days;

        let model = apply_present_days(&txn, existing, present_days, self.now()).await?;

        txn.commit().await?;

        Ok(Some(model))
    }

    /// Full generation for one employee: create, refresh a draft while keeping a manual review, or skip an approved payroll
    pub async fn generate(
        &self,
        employee: &user::Model,
        location: Option<&location::Model>,
        month: NaiveDate,
        standard_workdays: Option<i32>,
    ) -> Result<StoreOutcome, PayrollError> {
        let range = utils::month_range(month);
        let _guard = self.gate.acquire(employee.id, range.0).await;

        let txn = self.db.begin().await?;

        let existing = find_period(&txn, employee.id, range.0, true).await?;

        if existing.as_ref().is_some_and(|p| p.status != PayrollStatus::Draft) {
            return Ok(StoreOutcome::Skipped);
        }

        let manual_review = existing.as_ref()
            .filter(|p| p.hk_reviewed_by.is_some())
            .map(|p| p.hk_review);

        let inputs = engine::load_inputs(&txn, employee, location, range, standard_workdays, manual_review).await?;
        let computation = engine::compute(employee.id, &inputs);

        let outcome = match existing {
            Some(existing) => {
                let mut model: payroll::ActiveModel = existing.into();
                set_figures(&mut model, &computation);
                model.updated_at = Set(self.now());
                model.update(&txn).await?;

                StoreOutcome::Updated
            },
            None => {
                insert_draft(&txn, &computation, self.now()).await?;

                StoreOutcome::Created
            },
        };

        txn.commit().await?;

        Ok(outcome)
    }

    /// Sets the reviewed day count of a draft, which then drives the final salary
    pub async fn review(&self, payroll_id: Uuid, hk_review: i32, reviewer: Uuid) -> Result<payroll::Model, PayrollError> {
        if hk_review < 0 {
            return Err(PayrollError::InvalidReview(hk_review));
        }

        self.modify_draft(payroll_id, |model, current| {
            model.hk_review = Set(hk_review);
            model.hk_reviewed_by = Set(Some(reviewer));
            model.selisih = Set(hk_review - current.standard_workdays);
            model.final_salary = Set(to_column(money(current.rate) * Decimal::from(hk_review)));
        }).await
    }

    /// Freezes a draft against any further computed overwrite
    pub async fn approve(&self, payroll_id: Uuid, approver: Uuid) -> Result<payroll::Model, PayrollError> {
        let now = self.now();

        let model = self.modify_draft(payroll_id, |model, _| {
            model.status = Set(PayrollStatus::Approved);
            model.approved_by = Set(Some(approver));
            model.approved_at = Set(Some(now));
        }).await?;

        info!(payroll_id = %model.id, user_id = %model.user_id, period = %model.period, "payroll approved");

        Ok(model)
    }

    async fn modify_draft(
        &self,
        payroll_id: Uuid,
        modify: impl FnOnce(&mut payroll::ActiveModel, &payroll::Model),
    ) -> Result<payroll::Model, PayrollError> {
        let located = Payroll::find_by_id(payroll_id)
            .one(&*self.db).await?
            .ok_or(PayrollError::PayrollNotFound(payroll_id))?;

        let _guard = self.gate.acquire(located.user_id, located.period).await;

        let txn = self.db.begin().await?;

        let current = Payroll::find_by_id(payroll_id)
            .lock_exclusive()
            .one(&txn).await?
            .ok_or(PayrollError::PayrollNotFound(payroll_id))?;

        if current.status != PayrollStatus::Draft {
            return Err(PayrollError::NotDraft(payroll_id));
        }

        let mut model: payroll::ActiveModel = current.clone().into();
        modify(&mut model, &current);
        model.updated_at = Set(self.now());

        let model = model.update(&txn).await?;

        txn.commit().await?;

        Ok(model)
    }

    fn now(&self) -> sea_orm::prelude::DateTimeWithTimeZone {
        self.clock.now().fixed_offset()
    }
}

async fn find_period<C: ConnectionTrait>(db: &C, user_id: Uuid, period: NaiveDate, lock: bool) -> Result<Option<payroll::Model>, sea_orm::DbErr> {
    let mut query = Payroll::find()
        .filter(payroll::Column::UserId.eq(user_id))
        .filter(payroll::Column::Period.eq(period));

    if lock {
        query = query.lock_exclusive();
    }

    query.one(db).await
}

/// Trigger-side update with the stored rate and standard workdays
async fn apply_present_days<C: ConnectionTrait>(
    db: &C,
    existing: payroll::Model,
    present_days: i32,
    now: sea_orm::prelude::DateTimeWithTimeZone,
) -> Result<payroll::Model, PayrollError> {
    let is_draft = existing.status == PayrollStatus::Draft;
    let standard_workdays = existing.standard_workdays;
    let rate = money(existing.rate);
    let hk_review = match existing.hk_reviewed_by {
        Some(_) => existing.hk_review,
        None => present_days,
    };

    let mut model: payroll::ActiveModel = existing.into();
    model.present_days = Set(present_days);
    model.percentage = Set(to_column(percentage(present_days, standard_workdays)));

    if is_draft {
        model.hk_review = Set(hk_review);
        model.selisih = Set(hk_review - standard_workdays);
        model.estimated_salary = Set(to_column(round2(rate * Decimal::from(present_days))));
        model.final_salary = Set(to_column(round2(rate * Decimal::from(hk_review))));
    }

    model.updated_at = Set(now);

    Ok(model.update(db).await?)
}

fn set_figures(model: &mut payroll::ActiveModel, computation: &PayrollComputation) {
    model.standard_workdays = Set(computation.standard_workdays);
    model.present_days = Set(computation.present_days);
    model.rate = Set(to_column(computation.rate));
    model.basic_salary = Set(to_column(computation.basic_salary));
    model.estimated_salary = Set(to_column(computation.estimated_salary));
    model.final_salary = Set(to_column(computation.final_salary));
    model.hk_review = Set(computation.hk_review);
    model.selisih = Set(computation.selisih);
    model.percentage = Set(to_column(computation.percentage));
}

async fn insert_draft<C: ConnectionTrait>(
    db: &C,
    computation: &PayrollComputation,
    now: sea_orm::prelude::DateTimeWithTimeZone,
) -> Result<payroll::Model, PayrollError> {
    let mut model = payroll::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        user_id: Set(computation.user_id),
        period: Set(computation.period_start),
        hk_reviewed_by: Set(None),
        status: Set(PayrollStatus::Draft),
        approved_by: Set(None),
        approved_at: Set(None),
        ..Default::default()
    };
    set_figures(&mut model, computation);

    Ok(model.insert(db).await?)
}
