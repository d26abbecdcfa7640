use std::{env, net::{SocketAddr, ToSocketAddrs as _}, str::FromStr as _};

use chrono_tz::Tz;
use sea_orm::ConnectOptions;
use tracing::info;

use crate::consts::DEFAULT_TIMEZONE;

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub jwt_key: String,

    pub default_timezone: Tz,

    pub payroll_schedule: bool,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        jwt_key: load_jwt_key(),
        default_timezone: load_default_timezone(),
        payroll_schedule: load_payroll_schedule(),
    }
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());

    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");

    let var = env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set");

    var
}

fn load_jwt_key() -> String {
    info!("Loading environment `JWT_SECRET`");

    let var = env::var("JWT_SECRET").expect("Environment `JWT_SECRET` is required to be set");

    var
}

fn load_default_timezone() -> Tz {
    info!("Loading environment `DEFAULT_TIMEZONE`");

    let var = env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());

    Tz::from_str(var.trim()).expect("`DEFAULT_TIMEZONE` is not an IANA timezone")
}

fn load_payroll_schedule() -> bool {
    info!("Loading environment `PAYROLL_SCHEDULE`");

    match env::var("PAYROLL_SCHEDULE") {
        Ok(var) => parse_flag(&var).expect("`PAYROLL_SCHEDULE` must be true or false"),
        Err(_) => true,
    }
}

fn parse_flag(var: &str) -> Option<bool> {
    match var.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
