use std::{collections::BTreeSet, str::FromStr as _};

use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use chrono::{Datelike as _, NaiveDate, Weekday};
use sea_orm::{prelude::DateTimeWithTimeZone, sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{consts::MAX_CALENDAR_SPAN_DAYS, entity::{holiday, location, prelude::*, sea_orm_active_enums::HolidayKind}, utils};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("database error")]
    Db(#[from] DbErr),
    #[error("location {0} does not exist")]
    LocationNotFound(Uuid),
    #[error("`{0}` is not a weekend pattern")]
    InvalidWeekendPattern(String),
    #[error("{0} is not a valid year")]
    InvalidYear(i32),
    #[error("{start} to {end} spans more than {MAX_CALENDAR_SPAN_DAYS} days")]
    RangeTooLong { start: NaiveDate, end: NaiveDate },
}

impl actix_web::error::ResponseError for CalendarError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CalendarError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CalendarError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            CalendarError::InvalidWeekendPattern(_) | CalendarError::InvalidYear(_) | CalendarError::RangeTooLong { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Set of weekdays a location does not work on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendPattern(u8);

impl WeekendPattern {
    /// Parses a comma separated list such as `sat,sun` or `friday, saturday`
    pub fn parse(pattern: &str) -> Result<Self, CalendarError> {
        let mut mask = 0;

        for day in pattern.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let weekday = Weekday::from_str(day)
                .map_err(|_| CalendarError::InvalidWeekendPattern(pattern.to_string()))?;
            mask |= 1 << weekday.num_days_from_monday();
        }

        Ok(Self(mask))
    }

    pub fn of(location: Option<&location::Model>) -> Result<Self, CalendarError> {
        match location {
            Some(location) => Self::parse(&location.weekend_days),
            None => Ok(Self::default()),
        }
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_monday()) != 0
    }
}

impl Default for WeekendPattern {
    fn default() -> Self {
        Self(1 << Weekday::Sat.num_days_from_monday() | 1 << Weekday::Sun.num_days_from_monday())
    }
}

/// Working-day rules of one location over a loaded window of holidays.
///
/// Holidays are global while the weekend pattern belongs to the location.
#[derive(Debug, Clone, Default)]
pub struct WorkdayCalendar {
    weekend: WeekendPattern,
    holidays: BTreeSet<NaiveDate>,
}

impl WorkdayCalendar {
    pub fn new(weekend: WeekendPattern, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            weekend,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Loads the calendar of `location` with every holiday between `start` and `end`
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        location: Option<&location::Model>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, CalendarError> {
        let weekend = WeekendPattern::of(location)?;

        let holidays = Holiday::find()
            .filter(holiday::Column::Date.between(start, end))
            .all(db).await?
            .into_iter()
            .map(|h| h.date);

        Ok(Self::new(weekend, holidays))
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        self.weekend.contains(date.weekday())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_non_working_day(&self, date: NaiveDate) -> bool {
        self.is_weekend(date) || self.is_holiday(date)
    }

    pub fn count_workdays(&self, start: NaiveDate, end: NaiveDate) -> i32 {
        utils::days_between(start, end)
            .filter(|day| !self.is_non_working_day(*day))
            .count() as i32
    }

    /// Only a whole calendar month gets its standard workdays counted, anything else takes `fallback`
    pub fn standard_workdays(&self, start: NaiveDate, end: NaiveDate, fallback: i32) -> i32 {
        if utils::is_whole_month(start, end) {
            self.count_workdays(start, end)
        } else {
            debug!(%start, %end, fallback, "period is not a whole month, using the fallback workdays");
            fallback
        }
    }
}

async fn find_location<C: ConnectionTrait>(db: &C, location_id: Option<Uuid>) -> Result<Option<location::Model>, CalendarError> {
    let Some(location_id) = location_id else {
        return Ok(None);
    };

    Location::find_by_id(location_id)
        .one(db).await?
        .map(Some)
        .ok_or(CalendarError::LocationNotFound(location_id))
}

pub async fn is_weekend<C: ConnectionTrait>(db: &C, date: NaiveDate, location_id: Option<Uuid>) -> Result<bool, CalendarError> {
    let location = find_location(db, location_id).await?;

    Ok(WeekendPattern::of(location.as_ref())?.contains(date.weekday()))
}

pub async fn is_holiday<C: ConnectionTrait>(db: &C, date: NaiveDate) -> Result<bool, CalendarError> {
    let holiday = Holiday::find()
        .filter(holiday::Column::Date.eq(date))
        .one(db).await?;

    Ok(holiday.is_some())
}

pub async fn is_non_working_day<C: ConnectionTrait>(db: &C, date: NaiveDate, location_id: Option<Uuid>) -> Result<bool, CalendarError> {
    Ok(is_weekend(db, date, location_id).await? || is_holiday(db, date).await?)
}

pub async fn count_workdays<C: ConnectionTrait>(
    db: &C,
    location_id: Option<Uuid>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i32, CalendarError> {
    if (end - start).num_days() > MAX_CALENDAR_SPAN_DAYS {
        return Err(CalendarError::RangeTooLong { start, end });
    }

    let location = find_location(db, location_id).await?;
    let calendar = WorkdayCalendar::load(db, location.as_ref(), start, end).await?;

    Ok(calendar.count_workdays(start, end))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendGeneration {
    pub inserted: u64,
    pub skipped: u64,
}

/// Materializes every Saturday and Sunday of `year` as a weekend holiday, leaving existing dates alone
pub async fn generate_weekends_for_year<C: ConnectionTrait>(
    db: &C,
    year: i32,
    now: DateTimeWithTimeZone,
) -> Result<WeekendGeneration, CalendarError> {
    let (Some(start), Some(end)) = (NaiveDate::from_ymd_opt(year, 1, 1), NaiveDate::from_ymd_opt(year, 12, 31)) else {
        return Err(CalendarError::InvalidYear(year));
    };

    let existing = Holiday::find()
        .filter(holiday::Column::Date.between(start, end))
        .all(db).await?
        .into_iter()
        .map(|h| h.date)
        .collect::<BTreeSet<_>>();

    let weekends = utils::days_between(start, end)
        .filter(|day| WeekendPattern::default().contains(day.weekday()))
        .collect::<Vec<_>>();

    let models = weekends.iter()
        .filter(|day| !existing.contains(day))
        .map(|day| holiday::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now),
            updated_at: Set(now),
            date: Set(*day),
            name: Set(weekend_name(day.weekday()).to_string()),
            kind: Set(HolidayKind::Weekend),
            is_official: Set(false),
        })
        .collect::<Vec<_>>();

    let inserted = if models.is_empty() {
        0
    } else {
        Holiday::insert_many(models)
            .on_conflict(OnConflict::column(holiday::Column::Date).do_nothing().to_owned())
            .exec_without_returning(db).await?
    };

    let generation = WeekendGeneration {
        inserted,
        skipped: weekends.len() as u64 - inserted,
    };

    info!(year, inserted = generation.inserted, skipped = generation.skipped, "generated weekend holidays");

    Ok(generation)
}

fn weekend_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
        _ => "Weekend",
    }
}
