use std::sync::Arc;

use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{sea_query::OnConflict, ActiveModelTrait as _, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait as _, QueryFilter};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{calendar::{CalendarError, WorkdayCalendar}, clock::Clock, entity::{attendance, location, prelude::*, sea_orm_active_enums::{AttendanceStatus, ShiftAssignmentStatus}, shift, shift_assignment, user}, timezone::TimezoneResolver, triggers::PayrollTriggers, utils};

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("database error")]
    Db(#[from] DbErr),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("employee {0} does not exist")]
    EmployeeNotFound(Uuid),
    #[error("coordinates ({latitude}, {longitude}) are not a valid position")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("no active location to check in at")]
    InvalidLocation(Option<Uuid>),
    #[error("outside the geofence: {distance_km} km from the site, the limit is {radius_km} km")]
    GeofenceViolation { distance_km: f64, radius_km: f64 },
    #[error("no open check-in found for today")]
    NoCheckinFound,
    #[error("attendance {0} does not exist")]
    AttendanceNotFound(Uuid),
}

impl actix_web::error::ResponseError for AttendanceError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Db(_) | AttendanceError::Calendar(CalendarError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AttendanceError::Calendar(_) | AttendanceError::InvalidLocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
            AttendanceError::GeofenceViolation { .. } => StatusCode::FORBIDDEN,
            AttendanceError::EmployeeNotFound(_) | AttendanceError::NoCheckinFound | AttendanceError::AttendanceNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AttendanceError> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if !valid {
        return Err(AttendanceError::InvalidCoordinates { latitude, longitude });
    }

    Ok(())
}

/// Distance to the site center in km, rounded to 6 places, when it is within the radius
pub fn check_geofence(location: &location::Model, latitude: f64, longitude: f64) -> Result<f64, AttendanceError> {
    let distance = utils::haversine_km(location.latitude, location.longitude, latitude, longitude);
    let distance_km = (distance * 1e6).round() / 1e6;

    if distance_km > location.radius_km {
        return Err(AttendanceError::GeofenceViolation {
            distance_km,
            radius_km: location.radius_km,
        });
    }

    Ok(distance_km)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub status: AttendanceStatus,
    pub late_minutes: i32,
}

/// Late once `now` passes the shift start on `date` plus the grace period.
///
/// Any part of a minute past the threshold counts as a whole minute late.
pub fn classify_arrival(date: NaiveDate, now: NaiveDateTime, shift: Option<&shift::Model>) -> Arrival {
    let Some(shift) = shift else {
        return Arrival { status: AttendanceStatus::OnTime, late_minutes: 0 };
    };

    let threshold = date.and_time(shift.start_time) + Duration::minutes(shift.grace_period_minutes.into());

    if now <= threshold {
        return Arrival { status: AttendanceStatus::OnTime, late_minutes: 0 };
    }

    let late_seconds = (now - threshold).num_seconds();

    Arrival {
        status: AttendanceStatus::Late,
        late_minutes: i32::try_from((late_seconds + 59) / 60).unwrap_or(i32::MAX),
    }
}

/// A check-in before the end of yesterday's overnight shift belongs to yesterday
pub fn belongs_to_previous_day(now: NaiveTime, previous_shift: Option<&shift::Model>) -> bool {
    previous_shift.is_some_and(|shift| shift.is_cross_day && now < shift.end_time)
}

/// Scheduled per-date assignment first, then the employee's default shift
async fn effective_shift(db: &DatabaseConnection, employee: &user::Model, date: NaiveDate) -> Result<Option<shift::Model>, DbErr> {
    let assigned = ShiftAssignment::find()
        .filter(shift_assignment::Column::UserId.eq(employee.id))
        .filter(shift_assignment::Column::Date.eq(date))
        .filter(shift_assignment::Column::Status.eq(ShiftAssignmentStatus::Scheduled))
        .find_also_related(Shift)
        .one(db).await?;

    if let Some((_, Some(shift))) = assigned {
        return Ok(Some(shift));
    }

    match employee.shift_id {
        Some(shift_id) => Shift::find_by_id(shift_id).one(db).await,
        None => Ok(None),
    }
}

async fn find_for_day(db: &DatabaseConnection, user_id: Uuid, date: NaiveDate) -> Result<Option<attendance::Model>, DbErr> {
    Attendance::find()
        .filter(attendance::Column::UserId.eq(user_id))
        .filter(attendance::Column::Date.eq(date))
        .one(db).await
}

async fn find_open(db: &DatabaseConnection, user_id: Uuid, date: NaiveDate) -> Result<Option<attendance::Model>, DbErr> {
    Attendance::find()
        .filter(attendance::Column::UserId.eq(user_id))
        .filter(attendance::Column::Date.eq(date))
        .filter(attendance::Column::TimeOut.is_null())
        .one(db).await
}

/// Geofenced check-in and check-out, stamped in the location's own zone
pub struct AttendanceRecorder {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    timezones: TimezoneResolver,
    triggers: PayrollTriggers,
}

impl AttendanceRecorder {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>, timezones: TimezoneResolver, triggers: PayrollTriggers) -> Self {
        Self { db, clock, timezones, triggers }
    }

    async fn employee(&self, user_id: Uuid) -> Result<user::Model, AttendanceError> {
        User::find_by_id(user_id)
            .one(&*self.db).await?
            .ok_or(AttendanceError::EmployeeNotFound(user_id))
    }

    #[instrument(skip(self))]
    pub async fn check_in(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        location_id: Option<Uuid>,
    ) -> Result<attendance::Model, AttendanceError> {
        validate_coordinates(latitude, longitude)?;

        let employee = self.employee(user_id).await?;

        let location_id = location_id
            .or(employee.location_id)
            .ok_or(AttendanceError::InvalidLocation(None))?;

        let location = Location::find_by_id(location_id)
            .one(&*self.db).await?
            .filter(|l| l.is_active)
            .ok_or(AttendanceError::InvalidLocation(Some(location_id)))?;

        let distance_km = check_geofence(&location, latitude, longitude)?;

        let zone = self.timezones.zone_of(Some(&location));
        let now = self.timezones.now_in(self.clock.as_ref(), zone);
        let today = now.date_naive();

        let previous_day = today.pred_opt();
        let previous_shift = match previous_day {
            Some(day) => effective_shift(&*self.db, &employee, day).await?,
            None => None,
        };

        let (date, shift) = match previous_day {
            Some(day) if belongs_to_previous_day(now.time(), previous_shift.as_ref()) => (day, previous_shift),
            _ => (today, effective_shift(&*self.db, &employee, today).await?),
        };

        if let Some(existing) = find_for_day(&*self.db, user_id, date).await? {
            return Ok(existing);
        }

        let arrival = classify_arrival(date, now.naive_local(), shift.as_ref());
        let calendar = WorkdayCalendar::load(&*self.db, Some(&location), date, date).await?;
        let stamp = now.fixed_offset();

        let model = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(stamp),
            updated_at: Set(stamp),
            user_id: Set(user_id),
            location_id: Set(Some(location.id)),
            shift_id: Set(shift.as_ref().map(|s| s.id)),
            date: Set(date),
            time_in: Set(stamp),
            time_out: Set(None),
            latitude_in: Set(latitude),
            longitude_in: Set(longitude),
            latitude_out: Set(None),
            longitude_out: Set(None),
            status: Set(arrival.status),
            late_minutes: Set(arrival.late_minutes),
            is_weekend: Set(calendar.is_weekend(date)),
            is_holiday: Set(calendar.is_holiday(date)),
        };

        // A concurrent check-in for the same day may have landed since the lookup above
        let inserted = Attendance::insert(model)
            .on_conflict(OnConflict::columns([attendance::Column::UserId, attendance::Column::Date]).do_nothing().to_owned())
            .exec_without_returning(&*self.db).await?;

        let model = find_for_day(&*self.db, user_id, date).await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("attendance for {user_id} on {date}")))?;

        if inserted == 0 {
            return Ok(model);
        }

        info!(%user_id, %date, distance_km, status = ?model.status, late_minutes = model.late_minutes, "checked in");

        self.triggers.attendance_changed(user_id, date).await;

        Ok(model)
    }

    /// Closes today's open row, or yesterday's when it belongs to an overnight shift.
    ///
    /// The exit position is recorded but not checked against the geofence.
    #[instrument(skip(self))]
    pub async fn check_out(&self, user_id: Uuid, latitude: f64, longitude: f64) -> Result<attendance::Model, AttendanceError> {
        validate_coordinates(latitude, longitude)?;

        let employee = self.employee(user_id).await?;
        let zone = self.timezones.timezone_for(&*self.db, employee.location_id).await?;
        let now = self.timezones.now_in(self.clock.as_ref(), zone);
        let today = now.date_naive();

        let open = match find_open(&*self.db, user_id, today).await? {
            Some(open) => Some(open),
            None => self.open_overnight(user_id, today).await?,
        };

        let Some(open) = open else {
            return Err(AttendanceError::NoCheckinFound);
        };

        let date = open.date;
        let stamp = now.fixed_offset();

        let mut model: attendance::ActiveModel = open.into();
        model.time_out = Set(Some(stamp));
        model.latitude_out = Set(Some(latitude));
        model.longitude_out = Set(Some(longitude));
        model.updated_at = Set(stamp);

        let model = model.update(&*self.db).await?;

        info!(%user_id, %date, "checked out");

        self.triggers.attendance_changed(user_id, date).await;

        Ok(model)
    }

    async fn open_overnight(&self, user_id: Uuid, today: NaiveDate) -> Result<Option<attendance::Model>, DbErr> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(None);
        };

        let Some(open) = find_open(&*self.db, user_id, yesterday).await? else {
            return Ok(None);
        };

        let Some(shift_id) = open.shift_id else {
            return Ok(None);
        };

        let is_cross_day = Shift::find_by_id(shift_id)
            .one(&*self.db).await?
            .is_some_and(|s| s.is_cross_day);

        Ok(is_cross_day.then_some(open))
    }

    pub async fn remove(&self, attendance_id: Uuid) -> Result<attendance::Model, AttendanceError> {
        let attendance = Attendance::find_by_id(attendance_id)
            .one(&*self.db).await?
            .ok_or(AttendanceError::AttendanceNotFound(attendance_id))?;

        attendance.clone().delete(&*self.db).await?;

        info!(%attendance_id, user_id = %attendance.user_id, date = %attendance.date, "attendance removed");

        self.triggers.attendance_changed(attendance.user_id, attendance.date).await;

        Ok(attendance)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use chrono_tz::{Asia::Jakarta, Tz};
    use futures_util::future::join;
    use sea_orm::ActiveValue::Set;

    use crate::{clock::FixedClock, consts::EARTH_RADIUS_KM, entity::{holiday, payroll, sea_orm_active_enums::HolidayKind}, payroll::PayrollStore, test_utils::{self, date, time}};

    use super::*;

    struct Fixture {
        db: Arc<DatabaseConnection>,
        clock: Arc<FixedClock>,
        recorder: AttendanceRecorder,
        site: location::Model,
        employee: user::Model,
    }

    /// Jakarta site, 08:00-17:00 shift with 10 minutes of grace
    async fn fixture() -> Fixture {
        let db = test_utils::setup_test_db().await;
        let site = test_utils::location(&*db, |_| {}).await;
        let shift = test_utils::shift(&*db, time(8, 0), time(17, 0), 10).await;
        let employee = test_utils::employee(&*db, "joko", |u| {
            u.location_id = Set(Some(site.id));
            u.shift_id = Set(Some(shift.id));
        }).await;

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 6, 1, 0, 0).unwrap()));
        let recorder = recorder(&db, clock.clone(), Jakarta);

        Fixture { db, clock, recorder, site, employee }
    }

    fn recorder(db: &Arc<DatabaseConnection>, clock: Arc<FixedClock>, zone: Tz) -> AttendanceRecorder {
        let store = Arc::new(PayrollStore::new(db.clone(), clock.clone()));

        AttendanceRecorder::new(db.clone(), clock, TimezoneResolver::new(zone), PayrollTriggers::new(store))
    }

    fn shift_model(start: NaiveTime, end: NaiveTime, grace: i32) -> shift::Model {
        shift::Model {
            id: Uuid::new_v4(),
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
            name: "Shift".to_string(),
            start_time: start,
            end_time: end,
            is_cross_day: end < start,
            grace_period_minutes: grace,
        }
    }

    #[test]
    fn test_classify_arrival() {
        let day = shift_model(time(8, 0), time(17, 0), 10);

        let on_grace = classify_arrival(date(2025, 1, 6), date(2025, 1, 6).and_time(time(8, 10)), Some(&day));
        assert_eq!(on_grace, Arrival { status: AttendanceStatus::OnTime, late_minutes: 0 });

        let late = classify_arrival(date(2025, 1, 6), date(2025, 1, 6).and_time(time(8, 25)), Some(&day));
        assert_eq!(late, Arrival { status: AttendanceStatus::Late, late_minutes: 15 });

        let early = classify_arrival(date(2025, 1, 6), date(2025, 1, 6).and_time(time(7, 0)), Some(&day));
        assert_eq!(early.status, AttendanceStatus::OnTime);

        let unscheduled = classify_arrival(date(2025, 1, 6), date(2025, 1, 6).and_time(time(23, 0)), None);
        assert_eq!(unscheduled.status, AttendanceStatus::OnTime);
    }

    #[test]
    fn test_classify_arrival_minute_boundaries() {
        let early = shift_model(time(7, 0), time(16, 0), 10);
        let at = |h, m, s| date(2025, 1, 6).and_hms_opt(h, m, s).unwrap();

        let within = classify_arrival(date(2025, 1, 6), at(7, 9, 0), Some(&early));
        assert_eq!(within, Arrival { status: AttendanceStatus::OnTime, late_minutes: 0 });

        let on_threshold = classify_arrival(date(2025, 1, 6), at(7, 10, 0), Some(&early));
        assert_eq!(on_threshold, Arrival { status: AttendanceStatus::OnTime, late_minutes: 0 });

        let seconds_over = classify_arrival(date(2025, 1, 6), at(7, 10, 45), Some(&early));
        assert_eq!(seconds_over, Arrival { status: AttendanceStatus::Late, late_minutes: 1 });

        let minute_over = classify_arrival(date(2025, 1, 6), at(7, 11, 0), Some(&early));
        assert_eq!(minute_over, Arrival { status: AttendanceStatus::Late, late_minutes: 1 });

        let over_and_a_bit = classify_arrival(date(2025, 1, 6), at(7, 11, 1), Some(&early));
        assert_eq!(over_and_a_bit, Arrival { status: AttendanceStatus::Late, late_minutes: 2 });
    }

    #[test]
    fn test_belongs_to_previous_day() {
        let night = shift_model(time(22, 0), time(6, 0), 0);
        let day = shift_model(time(8, 0), time(17, 0), 0);

        assert!(belongs_to_previous_day(time(2, 0), Some(&night)));
        assert!(!belongs_to_previous_day(time(6, 30), Some(&night)));
        assert!(!belongs_to_previous_day(time(21, 50), Some(&night)));
        assert!(!belongs_to_previous_day(time(2, 0), Some(&day)));
        assert!(!belongs_to_previous_day(time(2, 0), None));
    }

    #[actix_web::test]
    async fn test_geofence() {
        let Fixture { recorder, site, employee, .. } = fixture().await;

        assert_eq!(check_geofence(&site, site.latitude, site.longitude).unwrap(), 0.0);
        assert!(check_geofence(&site, site.latitude + 0.003, site.longitude).is_ok());

        match recorder.check_in(employee.id, site.latitude + 0.01, site.longitude, None).await {
            Err(AttendanceError::GeofenceViolation { distance_km, radius_km }) => {
                assert!((distance_km - 1.111949).abs() < 1e-6);
                assert_eq!(radius_km, 0.5);
            },
            other => panic!("expected a geofence violation, got {other:?}"),
        }

        let invalid = recorder.check_in(employee.id, 91.0, 0.0, None).await;
        assert!(matches!(invalid, Err(AttendanceError::InvalidCoordinates { .. })));
    }

    #[actix_web::test]
    async fn test_geofence_radius_is_inclusive() {
        let Fixture { db, recorder, site, employee, .. } = fixture().await;
        let north_by = |km: f64| site.latitude + (km / EARTH_RADIUS_KM).to_degrees();

        assert_eq!(check_geofence(&site, north_by(0.5), site.longitude).unwrap(), 0.5);

        match check_geofence(&site, north_by(0.51), site.longitude) {
            Err(AttendanceError::GeofenceViolation { distance_km, radius_km }) => {
                assert_eq!(distance_km, 0.51);
                assert_eq!(radius_km, 0.5);
            },
            other => panic!("expected a geofence violation, got {other:?}"),
        }

        let outside = recorder.check_in(employee.id, north_by(0.51), site.longitude, None).await;
        assert!(matches!(outside, Err(AttendanceError::GeofenceViolation { distance_km, .. }) if distance_km == 0.51));
        assert!(Attendance::find().one(&*db).await.unwrap().is_none());

        let edge = recorder.check_in(employee.id, north_by(0.5), site.longitude, None).await.unwrap();
        assert_eq!(edge.user_id, employee.id);
    }

    #[actix_web::test]
    async fn test_invalid_location() {
        let Fixture { db, recorder, site, .. } = fixture().await;
        let closed = test_utils::location(&*db, |l| l.is_active = Set(false)).await;
        let homeless = test_utils::employee(&*db, "nomad", |_| {}).await;

        let result = recorder.check_in(homeless.id, site.latitude, site.longitude, None).await;
        assert!(matches!(result, Err(AttendanceError::InvalidLocation(None))));

        let result = recorder.check_in(homeless.id, closed.latitude, closed.longitude, Some(closed.id)).await;
        assert!(matches!(result, Err(AttendanceError::InvalidLocation(Some(id))) if id == closed.id));

        let result = recorder.check_in(homeless.id, site.latitude, site.longitude, Some(site.id)).await;
        assert!(result.is_ok());
    }

    #[actix_web::test]
    async fn test_check_in_lateness_and_flags() {
        let Fixture { db, clock, recorder, site, employee } = fixture().await;

        // 08:25 in Jakarta, Monday
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 1, 25, 0).unwrap());
        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        assert_eq!(attendance.date, date(2025, 1, 6));
        assert_eq!(attendance.status, AttendanceStatus::Late);
        assert_eq!(attendance.late_minutes, 15);
        assert_eq!(attendance.location_id, Some(site.id));
        assert!(!attendance.is_weekend);
        assert!(!attendance.is_holiday);
        assert_eq!(attendance.time_in, Jakarta.with_ymd_and_hms(2025, 1, 6, 8, 25, 0).unwrap());

        // Same day again returns the existing row
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 2, 0, 0).unwrap());
        let again = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();
        assert_eq!(again.id, attendance.id);

        // Saturday that is also a holiday, 08:05 local
        test_utils::holiday(&*db, date(2025, 1, 11), HolidayKind::Company).await;
        clock.set(Utc.with_ymd_and_hms(2025, 1, 11, 1, 5, 0).unwrap());
        let saturday = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();
        assert_eq!(saturday.status, AttendanceStatus::OnTime);
        assert!(saturday.is_weekend);
        assert!(saturday.is_holiday);

        let rows = Attendance::find().all(&*db).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(Holiday::find().filter(holiday::Column::Date.eq(date(2025, 1, 11))).one(&*db).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn test_check_in_uses_location_zone() {
        let db = test_utils::setup_test_db().await;
        let tokyo = test_utils::location(&*db, |l| l.timezone = Set(Some("Asia/Tokyo".to_string()))).await;
        let shift = test_utils::shift(&*db, time(8, 0), time(17, 0), 0).await;
        let employee = test_utils::employee(&*db, "kenji", |u| {
            u.location_id = Set(Some(tokyo.id));
            u.shift_id = Set(Some(shift.id));
        }).await;

        // 23:50 in Tokyo while the server day is still the 10th in UTC
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 14, 50, 0).unwrap()));
        let recorder = recorder(&db, clock.clone(), chrono_tz::UTC);

        let late_night = recorder.check_in(employee.id, tokyo.latitude, tokyo.longitude, None).await.unwrap();
        assert_eq!(late_night.date, date(2025, 3, 10));
        assert_eq!(late_night.late_minutes, 950);

        // 00:10 in Tokyo is already the 11th
        clock.set(Utc.with_ymd_and_hms(2025, 3, 10, 15, 10, 0).unwrap());
        let next_day = recorder.check_in(employee.id, tokyo.latitude, tokyo.longitude, None).await.unwrap();
        assert_eq!(next_day.date, date(2025, 3, 11));
        assert_eq!(next_day.status, AttendanceStatus::OnTime);
    }

    #[actix_web::test]
    async fn test_shift_assignment_overrides_default() {
        let Fixture { db, clock, recorder, site, employee } = fixture().await;
        let late_shift = test_utils::shift(&*db, time(10, 0), time(19, 0), 0).await;

        shift_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(Utc::now().fixed_offset()),
            user_id: Set(employee.id),
            shift_id: Set(late_shift.id),
            date: Set(date(2025, 1, 6)),
            status: Set(ShiftAssignmentStatus::Scheduled),
        }
        .insert(&*db).await.unwrap();

        // 09:00 local, late for the default shift but early for the assigned one
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 2, 0, 0).unwrap());
        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        assert_eq!(attendance.shift_id, Some(late_shift.id));
        assert_eq!(attendance.status, AttendanceStatus::OnTime);
    }

    #[actix_web::test]
    async fn test_overnight_shift() {
        let Fixture { db, clock, recorder, site, employee } = fixture().await;
        let night = test_utils::shift(&*db, time(22, 0), time(6, 0), 0).await;

        let mut model: user::ActiveModel = employee.clone().into();
        model.shift_id = Set(Some(night.id));
        model.update(&*db).await.unwrap();

        // 02:00 local on the 7th belongs to the shift that started on the 6th
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 19, 0, 0).unwrap());
        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();
        assert_eq!(attendance.date, date(2025, 1, 6));
        assert_eq!(attendance.shift_id, Some(night.id));
        assert_eq!(attendance.late_minutes, 240);

        // 06:30 on the 7th closes it
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 23, 30, 0).unwrap());
        let closed = recorder.check_out(employee.id, site.latitude, site.longitude).await.unwrap();
        assert_eq!(closed.id, attendance.id);
        assert!(closed.time_out.is_some());
    }

    #[actix_web::test]
    async fn test_overnight_shift_evening_arrival() {
        let Fixture { db, clock, recorder, site, employee } = fixture().await;
        let night = test_utils::shift(&*db, time(23, 0), time(7, 0), 0).await;

        let mut model: user::ActiveModel = employee.clone().into();
        model.shift_id = Set(Some(night.id));
        model.update(&*db).await.unwrap();

        // 23:05 local on the 6th starts that night's shift
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 16, 5, 0).unwrap());
        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        assert_eq!(attendance.date, date(2025, 1, 6));
        assert_eq!(attendance.shift_id, Some(night.id));
        assert_eq!(attendance.status, AttendanceStatus::Late);
        assert_eq!(attendance.late_minutes, 5);
    }

    #[actix_web::test]
    async fn test_one_attendance_per_day() {
        let Fixture { db, recorder, site, employee, .. } = fixture().await;

        let (first, second) = join(
            recorder.check_in(employee.id, site.latitude, site.longitude, None),
            recorder.check_in(employee.id, site.latitude, site.longitude, None),
        ).await;
        assert_eq!(first.unwrap().id, second.unwrap().id);

        let rows = Attendance::find()
            .filter(attendance::Column::UserId.eq(employee.id))
            .all(&*db).await.unwrap();
        assert_eq!(rows.len(), 1);

        let payroll = Payroll::find()
            .filter(payroll::Column::UserId.eq(employee.id))
            .one(&*db).await.unwrap()
            .unwrap();
        assert_eq!(payroll.present_days, 1);

        // The store itself refuses a second row for the day
        let mut duplicate: attendance::ActiveModel = rows[0].clone().into();
        duplicate.id = Set(Uuid::new_v4());
        assert!(Attendance::insert(duplicate).exec(&*db).await.is_err());
    }

    #[actix_web::test]
    async fn test_check_out() {
        let Fixture { clock, recorder, site, employee, .. } = fixture().await;

        let missing = recorder.check_out(employee.id, site.latitude, site.longitude).await;
        assert!(matches!(missing, Err(AttendanceError::NoCheckinFound)));

        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        // Far away is fine on the way out
        clock.set(Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap());
        let closed = recorder.check_out(employee.id, 0.0, 0.0).await.unwrap();
        assert_eq!(closed.id, attendance.id);
        assert_eq!(closed.latitude_out, Some(0.0));
        assert_eq!(closed.time_out, Some(Jakarta.with_ymd_and_hms(2025, 1, 6, 17, 0, 0).unwrap().fixed_offset()));

        let twice = recorder.check_out(employee.id, site.latitude, site.longitude).await;
        assert!(matches!(twice, Err(AttendanceError::NoCheckinFound)));

        // A day shift left open yesterday is not picked up
        clock.set(Utc.with_ymd_and_hms(2025, 1, 7, 1, 0, 0).unwrap());
        recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        clock.set(Utc.with_ymd_and_hms(2025, 1, 8, 1, 0, 0).unwrap());
        let next_day = recorder.check_out(employee.id, site.latitude, site.longitude).await;
        assert!(matches!(next_day, Err(AttendanceError::NoCheckinFound)));
    }

    #[actix_web::test]
    async fn test_writes_keep_payroll_in_step() {
        let Fixture { db, recorder, site, employee, .. } = fixture().await;

        let attendance = recorder.check_in(employee.id, site.latitude, site.longitude, None).await.unwrap();

        let payroll = Payroll::find()
            .filter(payroll::Column::UserId.eq(employee.id))
            .one(&*db).await.unwrap()
            .unwrap();
        assert_eq!(payroll.period, date(2025, 1, 1));
        assert_eq!(payroll.present_days, 1);

        let removed = recorder.remove(attendance.id).await.unwrap();
        assert_eq!(removed.id, attendance.id);
        assert!(Attendance::find_by_id(attendance.id).one(&*db).await.unwrap().is_none());

        let payroll = Payroll::find_by_id(payroll.id).one(&*db).await.unwrap().unwrap();
        assert_eq!(payroll.present_days, 0);

        assert!(matches!(recorder.remove(attendance.id).await, Err(AttendanceError::AttendanceNotFound(_))));
    }
}
