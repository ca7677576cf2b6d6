pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_users;
mod m20240301_000002_create_cars;
mod m20240301_000003_create_car_images;
mod m20240301_000004_create_bookings;
mod m20240301_000005_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users::Migration),
            Box::new(m20240301_000002_create_cars::Migration),
            Box::new(m20240301_000003_create_car_images::Migration),
            Box::new(m20240301_000004_create_bookings::Migration),
            Box::new(m20240301_000005_create_notifications::Migration),
        ]
    }
}
