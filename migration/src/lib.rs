pub use sea_orm_migration::prelude::*;

mod util;
mod m20250701_000000_init;
mod m20250701_000100_seed_defaults;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250701_000000_init::Migration),
            Box::new(m20250701_000100_seed_defaults::Migration),
        ]
    }
}
