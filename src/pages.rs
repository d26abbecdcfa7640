use actix_web::web;

mod auth;
mod attendance;
mod calendar;
mod leave;
mod payroll;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/auth")
            .configure(auth::config))
        .service(web::scope("/attendance")
            .configure(attendance::config))
        .service(web::scope("/leave")
            .configure(leave::config))
        .service(web::scope("/payroll")
            .configure(payroll::config))
        .service(web::scope("/holidays")
            .configure(calendar::holidays_config))
        .service(web::scope("/calendar")
            .configure(calendar::config));
}
