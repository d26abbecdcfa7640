use sea_orm_migration::prelude::*;

use crate::{link, util::default_table_statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(default_table_statement()
                .table(Location::Table)
                .col(ColumnDef::new(Location::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Location::Latitude)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Location::Longitude)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Location::RadiusKm)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Location::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .col(ColumnDef::new(Location::Timezone)
                    .text()) // IANA name, NULL falls back to the service default
                .col(ColumnDef::new(Location::WeekendDays)
                    .text()
                    .not_null()
                    .default("sat,sun"))
                .col(ColumnDef::new(Location::NilaiHk)
                    .double()
                    .not_null()
                    .default(0.0))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Shift::Table)
                .col(ColumnDef::new(Shift::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Shift::StartTime)
                    .time()
                    .not_null())
                .col(ColumnDef::new(Shift::EndTime)
                    .time()
                    .not_null())
                .col(ColumnDef::new(Shift::IsCrossDay)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Shift::GracePeriodMinutes)
                    .integer()
                    .not_null()
                    .default(0))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(User::Table)
                .col(ColumnDef::new(User::Username)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(User::Password)
                    .binary()
                    .not_null()) // sha256 of `password:username`
                .col(ColumnDef::new(User::Role)
                    .text()
                    .not_null())
                .col(ColumnDef::new(User::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .col(ColumnDef::new(User::LocationId)
                    .uuid())
                .col(ColumnDef::new(User::ShiftId)
                    .uuid())
                .col(ColumnDef::new(User::NilaiHk)
                    .double())
                .col(ColumnDef::new(User::StandardWorkdays)
                    .integer())
                .take()
            ).await?;
        link!(manager, User::Table, User::LocationId => Location::Table, ForeignKeyAction::SetNull);
        link!(manager, User::Table, User::ShiftId => Shift::Table, ForeignKeyAction::SetNull);

        manager
            .create_table(default_table_statement()
                .table(ShiftAssignment::Table)
                .col(ColumnDef::new(ShiftAssignment::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(ShiftAssignment::ShiftId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(ShiftAssignment::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(ShiftAssignment::Status)
                    .text()
                    .not_null()
                    .default("scheduled"))
                .take()
            ).await?;
        link!(manager, ShiftAssignment::Table, ShiftAssignment::UserId => User::Table, ForeignKeyAction::Cascade);
        link!(manager, ShiftAssignment::Table, ShiftAssignment::ShiftId => Shift::Table, ForeignKeyAction::Cascade);

        manager
            .create_index(IndexCreateStatement::new()
                .name("idx_shift_assignments_user_date")
                .table(ShiftAssignment::Table)
                .col(ShiftAssignment::UserId)
                .col(ShiftAssignment::Date)
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Holiday::Table)
                .col(ColumnDef::new(Holiday::Date)
                    .date()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Holiday::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Holiday::Kind)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Holiday::IsOfficial)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(Attendance::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Attendance::LocationId)
                    .uuid())
                .col(ColumnDef::new(Attendance::ShiftId)
                    .uuid())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null()) // local attendance date, not the UTC date of `time_in`
                .col(ColumnDef::new(Attendance::TimeIn)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(Attendance::TimeOut)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Attendance::LatitudeIn)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Attendance::LongitudeIn)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Attendance::LatitudeOut)
                    .double())
                .col(ColumnDef::new(Attendance::LongitudeOut)
                    .double())
                .col(ColumnDef::new(Attendance::Status)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Attendance::LateMinutes)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Attendance::IsWeekend)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Attendance::IsHoliday)
                    .boolean()
                    .not_null()
                    .default(false))
                .take()
            ).await?;
        link!(manager, Attendance::Table, Attendance::UserId => User::Table, ForeignKeyAction::Cascade);
        link!(manager, Attendance::Table, Attendance::LocationId => Location::Table, ForeignKeyAction::SetNull);
        link!(manager, Attendance::Table, Attendance::ShiftId => Shift::Table, ForeignKeyAction::SetNull);

        manager
            .create_index(IndexCreateStatement::new()
                .name("uq_attendances_user_date")
                .table(Attendance::Table)
                .col(Attendance::UserId)
                .col(Attendance::Date)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeaveType::Table)
                .col(ColumnDef::new(LeaveType::Name)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(LeaveType::IsPaid)
                    .boolean()
                    .not_null()
                    .default(true))
                .col(ColumnDef::new(LeaveType::DefaultDays)
                    .integer()
                    .not_null()
                    .default(0))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(LeaveBalance::Table)
                .col(ColumnDef::new(LeaveBalance::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LeaveBalance::LeaveTypeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LeaveBalance::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(LeaveBalance::TotalDays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(LeaveBalance::UsedDays)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(LeaveBalance::RemainingDays)
                    .integer()
                    .not_null())
                .check(Expr::col(LeaveBalance::RemainingDays).gte(0))
                .take()
            ).await?;
        link!(manager, LeaveBalance::Table, LeaveBalance::UserId => User::Table, ForeignKeyAction::Cascade);
        link!(manager, LeaveBalance::Table, LeaveBalance::LeaveTypeId => LeaveType::Table, ForeignKeyAction::Cascade);

        manager
            .create_index(IndexCreateStatement::new()
                .name("uq_leave_balances_user_type_year")
                .table(LeaveBalance::Table)
                .col(LeaveBalance::UserId)
                .col(LeaveBalance::LeaveTypeId)
                .col(LeaveBalance::Year)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Leave::Table)
                .col(ColumnDef::new(Leave::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Leave::LeaveTypeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Leave::StartDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Leave::EndDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Leave::TotalDays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Leave::Reason)
                    .text())
                .col(ColumnDef::new(Leave::Status)
                    .text()
                    .not_null()
                    .default("pending"))
                .col(ColumnDef::new(Leave::ApprovedBy)
                    .uuid())
                .col(ColumnDef::new(Leave::ApprovedAt)
                    .timestamp_with_time_zone())
                .check(Expr::col(Leave::EndDate).gte(Expr::col(Leave::StartDate)))
                .take()
            ).await?;
        link!(manager, Leave::Table, Leave::UserId => User::Table, ForeignKeyAction::Cascade);
        link!(manager, Leave::Table, Leave::LeaveTypeId => LeaveType::Table, ForeignKeyAction::Restrict);
        link!(manager, Leave::Table, Leave::ApprovedBy => User::Table, ForeignKeyAction::SetNull);

        manager
            .create_index(IndexCreateStatement::new()
                .name("idx_leaves_user_dates")
                .table(Leave::Table)
                .col(Leave::UserId)
                .col(Leave::StartDate)
                .col(Leave::EndDate)
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Payroll::Table)
                .col(ColumnDef::new(Payroll::UserId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Payroll::Period)
                    .date()
                    .not_null()) // always the 1st of the month
                .col(ColumnDef::new(Payroll::StandardWorkdays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::PresentDays)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::Rate)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::BasicSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::EstimatedSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::FinalSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::HkReview)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::HkReviewedBy)
                    .uuid())
                .col(ColumnDef::new(Payroll::Selisih)
                    .integer()
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::Percentage)
                    .double()
                    .not_null()
                    .default(0.0))
                .col(ColumnDef::new(Payroll::Status)
                    .text()
                    .not_null()
                    .default("draft"))
                .col(ColumnDef::new(Payroll::ApprovedBy)
                    .uuid())
                .col(ColumnDef::new(Payroll::ApprovedAt)
                    .timestamp_with_time_zone())
                .take()
            ).await?;
        link!(manager, Payroll::Table, Payroll::UserId => User::Table, ForeignKeyAction::Cascade);
        link!(manager, Payroll::Table, Payroll::HkReviewedBy => User::Table, ForeignKeyAction::SetNull);
        link!(manager, Payroll::Table, Payroll::ApprovedBy => User::Table, ForeignKeyAction::SetNull);

        manager
            .create_index(IndexCreateStatement::new()
                .name("uq_payrolls_user_period")
                .table(Payroll::Table)
                .col(Payroll::UserId)
                .col(Payroll::Period)
                .unique()
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Payroll::Table.into_iden(),
            Leave::Table.into_iden(),
            LeaveBalance::Table.into_iden(),
            LeaveType::Table.into_iden(),
            Attendance::Table.into_iden(),
            Holiday::Table.into_iden(),
            ShiftAssignment::Table.into_iden(),
            User::Table.into_iden(),
            Shift::Table.into_iden(),
            Location::Table.into_iden(),
        ] {
            manager
                .drop_table(
                    TableDropStatement::new()
                        .table(table)
                        .if_exists()
                        .take()
                ).await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Location {
    #[sea_orm(iden = "locations")]
    Table,
    Name,
    Latitude,
    Longitude,
    RadiusKm,
    IsActive,
    Timezone,
    WeekendDays,
    NilaiHk,
}

#[derive(DeriveIden)]
pub(crate) enum Shift {
    #[sea_orm(iden = "shifts")]
    Table,
    Name,
    StartTime,
    EndTime,
    IsCrossDay,
    GracePeriodMinutes,
}

#[derive(DeriveIden)]
pub(crate) enum User {
    #[sea_orm(iden = "users")]
    Table,
    Username,
    Password,
    Role,
    IsActive,
    LocationId,
    ShiftId,
    NilaiHk,
    StandardWorkdays,
}

#[derive(DeriveIden)]
enum ShiftAssignment {
    #[sea_orm(iden = "shift_assignments")]
    Table,
    UserId,
    ShiftId,
    Date,
    Status,
}

#[derive(DeriveIden)]
enum Holiday {
    #[sea_orm(iden = "holidays")]
    Table,
    Date,
    Name,
    Kind,
    IsOfficial,
}

#[derive(DeriveIden)]
enum Attendance {
    #[sea_orm(iden = "attendances")]
    Table,
    UserId,
    LocationId,
    ShiftId,
    Date,
    TimeIn,
    TimeOut,
    LatitudeIn,
    LongitudeIn,
    LatitudeOut,
    LongitudeOut,
    Status,
    LateMinutes,
    IsWeekend,
    IsHoliday,
}

#[derive(DeriveIden)]
pub(crate) enum LeaveType {
    #[sea_orm(iden = "leave_types")]
    Table,
    Name,
    IsPaid,
    DefaultDays,
}

#[derive(DeriveIden)]
enum LeaveBalance {
    #[sea_orm(iden = "leave_balances")]
    Table,
    UserId,
    LeaveTypeId,
    Year,
    TotalDays,
    UsedDays,
    RemainingDays,
}

#[derive(DeriveIden)]
enum Leave {
    #[sea_orm(iden = "leaves")]
    Table,
    UserId,
    LeaveTypeId,
    StartDate,
    EndDate,
    TotalDays,
    Reason,
    Status,
    ApprovedBy,
    ApprovedAt,
}

#[derive(DeriveIden)]
enum Payroll {
    #[sea_orm(iden = "payrolls")]
    Table,
    UserId,
    Period,
    StandardWorkdays,
    PresentDays,
    Rate,
    BasicSalary,
    EstimatedSalary,
    FinalSalary,
    HkReview,
    HkReviewedBy,
    Selisih,
    Percentage,
    Status,
    ApprovedBy,
    ApprovedAt,
}
