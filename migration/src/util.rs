use sea_orm_migration::prelude::*;

pub(crate) fn default_table_statement() -> TableCreateStatement {
    TableCreateStatement::new()
        .if_not_exists()
        .col(ColumnDef::new(DefaultColumn::Id)
            .uuid()
            .primary_key()
            .default(Expr::cust("GEN_RANDOM_UUID()"))
            .take())
        .col(ColumnDef::new(DefaultColumn::CreatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .default(Expr::current_timestamp())
            .take())
        .col(ColumnDef::new(DefaultColumn::UpdatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .default(Expr::current_timestamp())
            .take())
        .take()
}

#[derive(DeriveIden)]
pub(crate) enum DefaultColumn {
    Id,
    CreatedAt,
    UpdatedAt,
}

/// Links `$from.$column` to the `id` of `$to`
///
/// # Example
///
/// ```rs
/// link!(manager, Attendance::Table, Attendance::UserId => User::Table, ForeignKeyAction::Cascade);
/// ```
#[macro_export]
macro_rules! link {
    ($m:expr, $from:expr, $column:expr => $to:expr, $on_delete:expr) => {{
        use crate::util::DefaultColumn;

        $m.create_foreign_key(ForeignKeyCreateStatement::new()
                .from($from, $column)
                .to($to, DefaultColumn::Id)
                .on_delete($on_delete)
                .on_update(ForeignKeyAction::Cascade)
                .take()
        ).await?;
    }};
}
