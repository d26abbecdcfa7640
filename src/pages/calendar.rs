use actix_web::{get, post, web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::{Admin, Session}, calendar::{self, CalendarError}, services::Services};

pub(super) fn holidays_config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(generate_weekends);
}

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(count_workdays)
        .service(day_status);
}

#[derive(Debug, Serialize, Deserialize)]
struct LocationQuery {
    location_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RangeQuery {
    start: NaiveDate,
    end: NaiveDate,
    location_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DayStatus {
    date: NaiveDate,
    is_weekend: bool,
    is_holiday: bool,
    is_non_working_day: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Workdays {
    start: NaiveDate,
    end: NaiveDate,
    workdays: i32,
}

#[post("/weekends/{year}")]
async fn generate_weekends(services: web::Data<Services>, _admin: Admin, year: web::Path<i32>) -> Result<HttpResponse, CalendarError> {
    let generation = calendar::generate_weekends_for_year(&*services.db, year.into_inner(), services.clock.now().fixed_offset()).await?;

    Ok(HttpResponse::Ok().json(generation))
}

#[get("/workdays")]
async fn count_workdays(services: web::Data<Services>, _session: Session, query: web::Query<RangeQuery>) -> Result<HttpResponse, CalendarError> {
    let RangeQuery { start, end, location_id } = query.into_inner();
    let workdays = calendar::count_workdays(&*services.db, location_id, start, end).await?;

    Ok(HttpResponse::Ok().json(Workdays { start, end, workdays }))
}

#[get("/{date}")]
async fn day_status(services: web::Data<Services>, _session: Session, date: web::Path<NaiveDate>, query: web::Query<LocationQuery>) -> Result<HttpResponse, CalendarError> {
    let date = date.into_inner();

    let is_weekend = calendar::is_weekend(&*services.db, date, query.location_id).await?;
    let is_holiday = calendar::is_holiday(&*services.db, date).await?;

    Ok(HttpResponse::Ok().json(DayStatus {
        date,
        is_weekend,
        is_holiday,
        is_non_working_day: calendar::is_non_working_day(&*services.db, date, query.location_id).await?,
    }))
}
