use chrono::{Datelike as _, Months, NaiveDate};

use crate::consts::EARTH_RADIUS_KM;

/// First and last day of the month containing `date`
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start);

    (start, end)
}

pub fn is_whole_month(start: NaiveDate, end: NaiveDate) -> bool {
    month_range(start) == (start, end)
}

/// Inclusive day-by-day walk from `start` to `end`
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Month starts of every month touched by `[start, end]`
pub fn months_overlapping(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let (mut cursor, _) = month_range(start);

    while cursor <= end {
        months.push(cursor);

        let Some(next) = cursor.checked_add_months(Months::new(1)) else {
            break;
        };
        cursor = next;
    }

    months
}

/// Great-circle distance over WGS84 lat/lon, in kilometres
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}
