use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{entity::{location, prelude::*, sea_orm_active_enums::RoleType, user}, utils};

use super::{store::StoreOutcome, PayrollError, PayrollStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub user_id: Uuid,
    pub username: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub period: Option<NaiveDate>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<BatchFailure>,
}

/// Generates the month's payroll for every active employee, optionally limited to one location.
///
/// One employee failing never stops the others; the run can be repeated safely.
#[instrument(skip(db, store))]
pub async fn batch_generate_payroll(
    db: &DatabaseConnection,
    store: &PayrollStore,
    month: NaiveDate,
    location_id: Option<Uuid>,
    standard_workdays: Option<i32>,
) -> Result<BatchSummary, PayrollError> {
    let (period, _) = utils::month_range(month);

    let mut employees = User::find()
        .filter(user::Column::Role.eq(RoleType::Employee))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Username);

    if let Some(location_id) = location_id {
        employees = employees.filter(user::Column::LocationId.eq(location_id));
    }

    let employees = employees
        .find_also_related(Location)
        .all(db).await?;

    let mut summary = BatchSummary {
        period: Some(period),
        ..Default::default()
    };

    for (employee, location) in employees {
        match generate_one(store, &employee, location.as_ref(), period, standard_workdays).await {
            Ok(StoreOutcome::Created) => summary.created += 1,
            Ok(StoreOutcome::Updated) => summary.updated += 1,
            Ok(StoreOutcome::Skipped) => summary.skipped += 1,
            Err(err) => {
                warn!(user_id = %employee.id, username = %employee.username, %err, "payroll generation failed for employee");

                summary.errors.push(BatchFailure {
                    user_id: employee.id,
                    username: employee.username.clone(),
                    error: err.to_string(),
                });
            },
        }
    }

    info!(
        %period,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.errors.len(),
        "payroll batch finished"
    );

    Ok(summary)
}

async fn generate_one(
    store: &PayrollStore,
    employee: &user::Model,
    location: Option<&location::Model>,
    period: NaiveDate,
    standard_workdays: Option<i32>,
) -> Result<StoreOutcome, PayrollError> {
    if employee.shift_id.is_none() {
        return Err(PayrollError::MissingShift(employee.id));
    }

    store.generate(employee, location, period, standard_workdays).await
}
