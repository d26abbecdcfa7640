use actix_web::{get, post, web, Responder};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{auth::{Authority, Session}, entity::{prelude::*, user}};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(login)
        .service(whoami);
}

#[derive(Debug, Serialize, Deserialize)]
struct Login {
    username: String,
    password: String,
}

pub(crate) fn digest(username: &str, password: &str) -> Vec<u8> {
    Sha256::digest(format!("{password}:{username}")).to_vec()
}

#[post("/login")]
async fn login(db: web::Data<DatabaseConnection>, authority: web::Data<Authority>, credentials: web::Json<Login>) -> actix_web::Result<impl Responder> {
    let user = User::find()
        .filter(user::Column::Username.eq(&credentials.username))
        .filter(user::Column::Password.eq(digest(&credentials.username, &credentials.password)))
        .filter(user::Column::IsActive.eq(true))
        .one(db.get_ref()).await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let Some(user) = user else {
        warn!(username = %credentials.username, "rejected login");
        return Err(actix_web::error::ErrorForbidden("invalid credentials"));
    };

    Ok(authority.issue_for(&user)?)
}

#[get("")]
async fn whoami(session: Session) -> impl Responder {
    web::Json(session)
}
