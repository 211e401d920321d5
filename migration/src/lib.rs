pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_accounts_tables;
mod m20260301_000002_create_catalog_tables;
mod m20260302_000001_create_track_activity_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_accounts_tables::Migration),
            Box::new(m20260301_000002_create_catalog_tables::Migration),
            Box::new(m20260302_000001_create_track_activity_tables::Migration),
        ]
    }
}
