use sea_orm_migration::prelude::*;
use sha2::Digest as _;

use crate::m20250701_000000_init::{LeaveType, Location, Shift, User};

const LOCATION_ID: u128 = 1;
const SHIFT_ID: u128 = 1;
const ANNUAL_LEAVE_ID: u128 = 1;
const UNPAID_LEAVE_ID: u128 = 2;
const ADMIN_ID: u128 = 12345;

fn uuid(id: u128) -> SimpleExpr {
    Expr::val(format!("{:032x}", id)).cast_as("uuid")
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::insert()
                .into_table(Location::Table)
                .columns(["id", "name", "latitude", "longitude", "radius_km", "timezone", "weekend_days", "nilai_hk"])
                .values_panic([uuid(LOCATION_ID), "Head Office".into(), (-6.2088).into(), 106.8456.into(), 0.5.into(), "Asia/Jakarta".into(), "sat,sun".into(), 150_000.0.into()])
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::insert()
                .into_table(Shift::Table)
                .columns(["id", "name", "start_time", "end_time", "is_cross_day", "grace_period_minutes"])
                .values_panic([uuid(SHIFT_ID), "Office".into(), Expr::val("08:00:00").cast_as("time"), Expr::val("17:00:00").cast_as("time"), false.into(), 10.into()])
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::insert()
                .into_table(LeaveType::Table)
                .columns(["id", "name", "is_paid", "default_days"])
                .values_panic([uuid(ANNUAL_LEAVE_ID), "Annual".into(), true.into(), 12.into()])
                .values_panic([uuid(UNPAID_LEAVE_ID), "Unpaid".into(), false.into(), 0.into()])
                .to_owned()
        ).await?;

        // Default credentials are admin / admin
        let hashed_password = &sha2::Sha256::digest("admin:admin")[..];

        manager
            .exec_stmt(Query::insert()
                .into_table(User::Table)
                .columns(["id", "username", "password", "role", "location_id", "shift_id"])
                .values_panic([uuid(ADMIN_ID), "admin".into(), hashed_password.into(), "admin".into(), uuid(LOCATION_ID), uuid(SHIFT_ID)])
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete()
                .from_table(User::Table)
                .and_where(Expr::col("id").eq(uuid(ADMIN_ID)))
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::delete()
                .from_table(LeaveType::Table)
                .and_where(Expr::col("id").is_in([uuid(ANNUAL_LEAVE_ID), uuid(UNPAID_LEAVE_ID)]))
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::delete()
                .from_table(Shift::Table)
                .and_where(Expr::col("id").eq(uuid(SHIFT_ID)))
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::delete()
                .from_table(Location::Table)
                .and_where(Expr::col("id").eq(uuid(LOCATION_ID)))
                .to_owned()
        ).await?;

        Ok(())
    }
}
