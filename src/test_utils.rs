use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use sea_orm::{ActiveModelTrait as _, ActiveValue::Set, ConnectOptions, ConnectionTrait as _, Database, DatabaseConnection, Schema};
use uuid::Uuid;

use crate::entity::{attendance, holiday, leave, leave_balance, leave_type, location, prelude::*, sea_orm_active_enums::*, shift, user};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Fresh in-memory SQLite database with the schema built from the entities
pub async fn setup_test_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await.expect("Unable to open sqlite");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = [
        schema.create_table_from_entity(Location),
        schema.create_table_from_entity(Shift),
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(ShiftAssignment),
        schema.create_table_from_entity(Holiday),
        schema.create_table_from_entity(Attendance),
        schema.create_table_from_entity(LeaveType),
        schema.create_table_from_entity(Leave),
        schema.create_table_from_entity(LeaveBalance),
        schema.create_table_from_entity(Payroll),
    ];

    for statement in statements {
        db.execute(backend.build(&statement)).await.unwrap();
    }

    db.execute_unprepared("CREATE UNIQUE INDEX idx_payrolls_user_period ON payrolls (user_id, period)").await.unwrap();
    db.execute_unprepared("CREATE UNIQUE INDEX idx_leave_balances_user_type_year ON leave_balances (user_id, leave_type_id, year)").await.unwrap();
    db.execute_unprepared("CREATE UNIQUE INDEX idx_attendances_user_date ON attendances (user_id, date)").await.unwrap();

    Arc::new(db)
}

pub async fn location(db: &DatabaseConnection, customize: impl FnOnce(&mut location::ActiveModel)) -> location::Model {
    let mut model = location::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        name: Set("Head Office".to_string()),
        latitude: Set(-6.2),
        longitude: Set(106.8166),
        radius_km: Set(0.5),
        is_active: Set(true),
        timezone: Set(Some("Asia/Jakarta".to_string())),
        weekend_days: Set("sat,sun".to_string()),
        nilai_hk: Set(150_000.0),
    };
    customize(&mut model);

    model.insert(db).await.unwrap()
}

pub async fn shift(db: &DatabaseConnection, start: NaiveTime, end: NaiveTime, grace_period_minutes: i32) -> shift::Model {
    shift::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        name: Set(format!("{start}-{end}")),
        start_time: Set(start),
        end_time: Set(end),
        is_cross_day: Set(end < start),
        grace_period_minutes: Set(grace_period_minutes),
    }
    .insert(db).await.unwrap()
}

pub async fn employee(db: &DatabaseConnection, username: &str, customize: impl FnOnce(&mut user::ActiveModel)) -> user::Model {
    let mut model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        username: Set(username.to_string()),
        password: Set(Vec::new()),
        role: Set(RoleType::Employee),
        is_active: Set(true),
        location_id: Set(None),
        shift_id: Set(None),
        nilai_hk: Set(None),
        standard_workdays: Set(None),
    };
    customize(&mut model);

    model.insert(db).await.unwrap()
}

pub async fn holiday(db: &DatabaseConnection, date: NaiveDate, kind: HolidayKind) -> holiday::Model {
    holiday::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        date: Set(date),
        name: Set("Holiday".to_string()),
        kind: Set(kind),
        is_official: Set(kind == HolidayKind::National),
    }
    .insert(db).await.unwrap()
}

pub async fn leave_type(db: &DatabaseConnection, name: &str, is_paid: bool) -> leave_type::Model {
    leave_type::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        name: Set(name.to_string()),
        is_paid: Set(is_paid),
        default_days: Set(12),
    }
    .insert(db).await.unwrap()
}

pub async fn leave_balance(db: &DatabaseConnection, user_id: Uuid, leave_type_id: Uuid, year: i32, remaining_days: i32) -> leave_balance::Model {
    leave_balance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        user_id: Set(user_id),
        leave_type_id: Set(leave_type_id),
        year: Set(year),
        total_days: Set(remaining_days),
        used_days: Set(0),
        remaining_days: Set(remaining_days),
    }
    .insert(db).await.unwrap()
}

pub async fn leave(
    db: &DatabaseConnection,
    user_id: Uuid,
    leave_type_id: Uuid,
    (start_date, end_date): (NaiveDate, NaiveDate),
    status: LeaveStatus,
) -> leave::Model {
    leave::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        user_id: Set(user_id),
        leave_type_id: Set(leave_type_id),
        start_date: Set(start_date),
        end_date: Set(end_date),
        total_days: Set((end_date - start_date).num_days() as i32 + 1),
        reason: Set(None),
        status: Set(status),
        approved_by: Set(None),
        approved_at: Set(None),
    }
    .insert(db).await.unwrap()
}

/// Inserts an attendance row directly, without going through the recorder
pub async fn attendance(db: &DatabaseConnection, user_id: Uuid, date: NaiveDate) -> attendance::Model {
    let time_in = date.and_time(time(8, 0)).and_utc().fixed_offset();

    attendance::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(time_in),
        updated_at: Set(time_in),
        user_id: Set(user_id),
        location_id: Set(None),
        shift_id: Set(None),
        date: Set(date),
        time_in: Set(time_in),
        time_out: Set(None),
        latitude_in: Set(0.0),
        longitude_in: Set(0.0),
        latitude_out: Set(None),
        longitude_out: Set(None),
        status: Set(AttendanceStatus::OnTime),
        late_minutes: Set(0),
        is_weekend: Set(false),
        is_holiday: Set(false),
    }
    .insert(db).await.unwrap()
}
