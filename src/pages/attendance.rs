use actix_web::{delete, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{attendance::AttendanceError, auth::{Admin, Session}, services::Services};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(check_in)
        .service(check_out)
        .service(remove_attendance);
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckIn {
    latitude: f64,
    longitude: f64,
    location_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckOut {
    latitude: f64,
    longitude: f64,
}

#[post("/check-in")]
async fn check_in(services: web::Data<Services>, session: Session, payload: web::Json<CheckIn>) -> Result<HttpResponse, AttendanceError> {
    let attendance = services.attendance
        .check_in(session.id, payload.latitude, payload.longitude, payload.location_id).await?;

    Ok(HttpResponse::Ok().json(attendance))
}

#[post("/check-out")]
async fn check_out(services: web::Data<Services>, session: Session, payload: web::Json<CheckOut>) -> Result<HttpResponse, AttendanceError> {
    let attendance = services.attendance
        .check_out(session.id, payload.latitude, payload.longitude).await?;

    Ok(HttpResponse::Ok().json(attendance))
}

#[delete("/{attendance_id}")]
async fn remove_attendance(services: web::Data<Services>, _admin: Admin, attendance_id: web::Path<Uuid>) -> Result<HttpResponse, AttendanceError> {
    let attendance = services.attendance.remove(attendance_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(attendance))
}
