use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use rust_decimal::{prelude::{FromPrimitive as _, ToPrimitive as _}, Decimal, RoundingStrategy};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::CalendarError;

pub mod batch;
pub mod engine;
pub mod store;

pub use engine::{PayrollComputation, PayrollEngine};
pub use store::PayrollStore;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("database error")]
    Db(#[from] DbErr),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("employee {0} does not exist")]
    EmployeeNotFound(Uuid),
    #[error("location {0} does not exist")]
    LocationNotFound(Uuid),
    #[error("employee {0} has no shift assigned")]
    MissingShift(Uuid),
    #[error("payroll {0} does not exist")]
    PayrollNotFound(Uuid),
    #[error("payroll {0} is no longer a draft")]
    NotDraft(Uuid),
    #[error("hk_review must not be negative, got {0}")]
    InvalidReview(i32),
}

impl actix_web::error::ResponseError for PayrollError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PayrollError::Calendar(CalendarError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            PayrollError::Calendar(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::EmployeeNotFound(_) | PayrollError::LocationNotFound(_) | PayrollError::PayrollNotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::MissingShift(_) | PayrollError::InvalidReview(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::NotDraft(_) => StatusCode::CONFLICT,
        }
    }
}

pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money is persisted as double precision, computed as `Decimal`
pub(crate) fn money(value: f64) -> Decimal {
    round2(Decimal::from_f64(value).unwrap_or_default())
}

pub(crate) fn to_column(value: Decimal) -> f64 {
    round2(value).to_f64().unwrap_or_default()
}

/// `present / standard x 100`, zero when there is nothing to divide by
pub(crate) fn percentage(present_days: i32, standard_workdays: i32) -> Decimal {
    if standard_workdays <= 0 {
        return Decimal::ZERO;
    }

    round2(Decimal::from(present_days) * Decimal::ONE_HUNDRED / Decimal::from(standard_workdays))
}
