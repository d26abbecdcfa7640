use actix_web::{get, post, put, web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::{Admin, Session}, payroll::{batch, PayrollError}, services::Services};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(own_payroll)
        .service(preview_payroll)
        .service(batch_payroll)
        .service(review_payroll)
        .service(approve_payroll);
}

#[derive(Debug, Serialize, Deserialize)]
struct MonthQuery {
    month: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
struct PreviewQuery {
    user_id: Uuid,
    month: NaiveDate,
    standard_workdays: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BatchRequest {
    month: NaiveDate,
    location_id: Option<Uuid>,
    standard_workdays: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Review {
    hk_review: i32,
}

/// The session's own stored payroll for a month
#[get("")]
async fn own_payroll(services: web::Data<Services>, session: Session, query: web::Query<MonthQuery>) -> Result<HttpResponse, PayrollError> {
    match services.payrolls.find(session.id, query.month).await? {
        Some(payroll) => Ok(HttpResponse::Ok().json(payroll)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

/// Figures as they would be generated right now, nothing is stored
#[get("/preview")]
async fn preview_payroll(services: web::Data<Services>, _admin: Admin, query: web::Query<PreviewQuery>) -> Result<HttpResponse, PayrollError> {
    let computation = services.engine
        .generate_monthly_payroll(query.user_id, query.month, query.standard_workdays).await?;

    Ok(HttpResponse::Ok().json(computation))
}

#[post("/batch")]
async fn batch_payroll(services: web::Data<Services>, _admin: Admin, payload: web::Json<BatchRequest>) -> Result<HttpResponse, PayrollError> {
    let summary = batch::batch_generate_payroll(
        &*services.db,
        &services.payrolls,
        payload.month,
        payload.location_id,
        payload.standard_workdays,
    ).await?;

    Ok(HttpResponse::Ok().json(summary))
}

#[put("/{payroll_id}/review")]
async fn review_payroll(services: web::Data<Services>, admin: Admin, payroll_id: web::Path<Uuid>, payload: web::Json<Review>) -> Result<HttpResponse, PayrollError> {
    let payroll = services.payrolls.review(payroll_id.into_inner(), payload.hk_review, admin.id).await?;

    Ok(HttpResponse::Ok().json(payroll))
}

#[post("/{payroll_id}/approve")]
async fn approve_payroll(services: web::Data<Services>, admin: Admin, payroll_id: web::Path<Uuid>) -> Result<HttpResponse, PayrollError> {
    let payroll = services.payrolls.approve(payroll_id.into_inner(), admin.id).await?;

    Ok(HttpResponse::Ok().json(payroll))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue::Set;

    use crate::{auth::{test_token, Authority}, entity::{payroll, sea_orm_active_enums::{PayrollStatus, RoleType}}, pages::testing::{self, SECRET}, payroll::{batch::BatchSummary, PayrollComputation}, test_utils::{self, date, time}};

    use super::*;

    #[actix_web::test]
    async fn test_payroll_lifecycle() {
        let db = test_utils::setup_test_db().await;
        let site = test_utils::location(&*db, |_| {}).await;
        let shift = test_utils::shift(&*db, time(8, 0), time(17, 0), 0).await;
        let (session, token) = test_token(SECRET, RoleType::Employee);
        let (_, admin_token) = test_token(SECRET, RoleType::Admin);
        test_utils::employee(&*db, &session.username, |u| {
            u.id = Set(session.id);
            u.location_id = Set(Some(site.id));
            u.shift_id = Set(Some(shift.id));
        }).await;
        test_utils::attendance(&*db, session.id, date(2025, 1, 2)).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(testing::services(&db, Utc::now()))
                .service(web::scope("/payroll").configure(config))
        ).await;

        {
            let req = test::TestRequest::default()
                .uri(&format!("/payroll/preview?user_id={}&month=2025-01-01", session.id))
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        {
            let req = test::TestRequest::default()
                .uri(&format!("/payroll/preview?user_id={}&month=2025-01-20", session.id))
                .insert_header(("Authorization", format!("Bearer {admin_token}")))
                .to_request();

            let preview: PayrollComputation = test::call_and_read_body_json(&app, req).await;
            assert_eq!(preview.present_days, 1);
            assert_eq!(preview.standard_workdays, 23);
            assert_eq!(preview.estimated_salary, dec!(150000));
        }

        {
            let req = test::TestRequest::default()
                .uri("/payroll?month=2025-01-01")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        {
            let req = test::TestRequest::default()
                .uri("/payroll/batch")
                .method(Method::POST)
                .insert_header(("Authorization", format!("Bearer {admin_token}")))
                .set_json(BatchRequest { month: date(2025, 1, 1), location_id: None, standard_workdays: None })
                .to_request();

            let summary: BatchSummary = test::call_and_read_body_json(&app, req).await;
            assert_eq!(summary.created, 1);
        }

        let stored: payroll::Model = {
            let req = test::TestRequest::default()
                .uri("/payroll?month=2025-01-15")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();

            test::call_and_read_body_json(&app, req).await
        };
        assert_eq!(stored.status, PayrollStatus::Draft);

        {
            let req = test::TestRequest::default()
                .uri(&format!("/payroll/{}/review", stored.id))
                .method(Method::PUT)
                .insert_header(("Authorization", format!("Bearer {admin_token}")))
                .set_json(Review { hk_review: 22 })
                .to_request();

            let reviewed: payroll::Model = test::call_and_read_body_json(&app, req).await;
            assert_eq!(reviewed.hk_review, 22);
            assert_eq!(reviewed.selisih, -1);
            assert_eq!(reviewed.final_salary, 3_300_000.0);
        }

        let approve = || test::TestRequest::default()
            .uri(&format!("/payroll/{}/approve", stored.id))
            .method(Method::POST)
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .to_request();

        let approved: payroll::Model = test::call_and_read_body_json(&app, approve()).await;
        assert_eq!(approved.status, PayrollStatus::Approved);

        let response = test::call_service(&app, approve()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
