use actix_web::{post, web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::{Admin, Session}, leave::LeaveError, services::Services};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(submit_leave)
        .service(approve_leave)
        .service(reject_leave);
}

#[derive(Debug, Serialize, Deserialize)]
struct SubmitLeave {
    leave_type_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: Option<String>,
}

#[post("")]
async fn submit_leave(services: web::Data<Services>, session: Session, payload: web::Json<SubmitLeave>) -> Result<HttpResponse, LeaveError> {
    let SubmitLeave { leave_type_id, start_date, end_date, reason } = payload.into_inner();

    let leave = services.leaves
        .submit(session.id, leave_type_id, start_date, end_date, reason).await?;

    Ok(HttpResponse::Created().json(leave))
}

#[post("/{leave_id}/approve")]
async fn approve_leave(services: web::Data<Services>, admin: Admin, leave_id: web::Path<Uuid>) -> Result<HttpResponse, LeaveError> {
    let leave = services.leaves.approve_leave(leave_id.into_inner(), admin.id).await?;

    Ok(HttpResponse::Ok().json(leave))
}

#[post("/{leave_id}/reject")]
async fn reject_leave(services: web::Data<Services>, admin: Admin, leave_id: web::Path<Uuid>) -> Result<HttpResponse, LeaveError> {
    let leave = services.leaves.reject_leave(leave_id.into_inner(), admin.id).await?;

    Ok(HttpResponse::Ok().json(leave))
}
