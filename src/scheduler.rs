use actix_web::web;
use chrono::{DateTime, Datelike as _, Months, NaiveTime, TimeZone as _};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::{consts::BATCH_RUN_AT, payroll::batch, services::Services};

/// First run of the monthly batch strictly after `now`, on the 1st of a month in `now`'s zone
pub fn next_run_after(now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let run_at = NaiveTime::from_hms_opt(BATCH_RUN_AT.0, BATCH_RUN_AT.1, 0)?;
    let this_month = now.date_naive().with_day(1)?;

    [this_month, this_month.checked_add_months(Months::new(1))?]
        .into_iter()
        .filter_map(|day| now.timezone().from_local_datetime(&day.and_time(run_at)).earliest())
        .find(|run| *run > now)
}

/// Runs the payroll batch for the new month shortly after midnight on every 1st
pub fn spawn_monthly_payroll(services: web::Data<Services>) {
    actix_web::rt::spawn(async move {
        loop {
            let zone = services.timezones.default_zone();
            let now = services.timezones.now_in(services.clock.as_ref(), zone);

            let Some(next_run) = next_run_after(now) else {
                error!(%now, "unable to schedule the next payroll batch");
                return;
            };

            info!(%next_run, "next payroll batch scheduled");
            tokio::time::sleep((next_run - now).to_std().unwrap_or_default()).await;

            let month = next_run.date_naive();
            match batch::batch_generate_payroll(&*services.db, &services.payrolls, month, None, None).await {
                Ok(summary) => info!(%month, created = summary.created, updated = summary.updated, failed = summary.errors.len(), "scheduled payroll batch done"),
                Err(err) => error!(%month, %err, "scheduled payroll batch failed"),
            }
        }
    });
}
