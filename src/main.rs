use std::{fs::OpenOptions, sync::Arc};

use actix_web::{web, App, HttpServer};
use sea_orm::Database;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::{auth::Authority, clock::SystemClock, services::Services, timezone::TimezoneResolver};

mod config;
mod consts;
mod utils;

mod clock;
mod timezone;
mod calendar;

mod entity;
mod auth;
mod payroll;
mod triggers;
mod attendance;
mod leave;
mod scheduler;
mod services;
mod pages;

#[cfg(test)]
mod test_utils;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")?;

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    tracing::subscriber::set_global_default(subscriber).expect("Unable to install the tracing subscriber");

    let config::Config {
        host_address,
        database_opt,
        jwt_key,
        default_timezone,
        payroll_schedule,
    } = config::load();

    let database = Arc::new(Database::connect(database_opt).await.expect("Unable to connect to database"));

    let services = web::Data::new(Services::new(
        database.clone(),
        Arc::new(SystemClock),
        TimezoneResolver::new(default_timezone),
    ));
    let database = web::Data::from(database);
    let authority = web::Data::new(Authority::new(jwt_key.as_bytes()));

    if payroll_schedule {
        scheduler::spawn_monthly_payroll(services.clone());
    }

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(services.clone())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    })
    .bind(host_address)?;

    info!(addresses = ?server.addrs(), %default_timezone, "serving");

    server.run().await
}
