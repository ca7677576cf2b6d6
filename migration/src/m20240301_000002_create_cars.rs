use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Car::Table)
                    .if_not_exists()
                    .col(pk_auto(Car::Id))
                    .col(string_len(Car::Name, 100).not_null())
                    .col(integer(Car::PricePerDay).not_null())
                    .col(string_len(Car::FuelType, 50).not_null().default(""))
                    .col(string_len(Car::FuelConsumption, 50).not_null().default(""))
                    .col(string_len(Car::CarType, 50).not_null().default(""))
                    .col(integer(Car::SeatCapacity).not_null().default(4))
                    .col(integer(Car::EngineCc).not_null().default(0))
                    .col(integer(Car::Horsepower).not_null().default(0))
                    .col(boolean(Car::IsActive).not_null().default(true))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    Name,
    PricePerDay,
    FuelType,
    FuelConsumption,
    CarType,
    SeatCapacity,
    EngineCc,
    Horsepower,
    IsActive,
}
