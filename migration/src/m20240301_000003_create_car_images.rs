use sea_orm_migration::{prelude::*, schema::*};

use super::m20240301_000002_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CarImage::Table)
                    .if_not_exists()
                    .col(pk_auto(CarImage::Id))
                    .col(integer(CarImage::CarId).not_null())
                    .col(string_len(CarImage::ImageUrl, 500).not_null())
                    .col(string_len(CarImage::Caption, 100).not_null().default(""))
                    .col(
                        timestamp_with_time_zone(CarImage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_image_car")
                            .from(CarImage::Table, CarImage::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CarImage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CarImage {
    Table,
    Id,
    CarId,
    ImageUrl,
    Caption,
    CreatedAt,
}
