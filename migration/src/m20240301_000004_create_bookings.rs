use sea_orm_migration::{prelude::*, schema::*};

use super::m20240301_000001_create_users::User;
use super::m20240301_000002_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(pk_auto(Booking::Id))
                    .col(integer(Booking::UserId).not_null())
                    .col(integer(Booking::CarId).not_null())
                    .col(date(Booking::StartDate).not_null())
                    .col(date(Booking::EndDate).not_null())
                    .col(string_len(Booking::CurrentProvince, 100).not_null())
                    .col(string_len(Booking::DestinationProvince, 100).not_null())
                    .col(string_len(Booking::PickupType, 20).not_null())
                    .col(big_integer(Booking::TotalPrice).not_null().default(0))
                    .col(string_len(Booking::ContactNumber, 15).not_null())
                    .col(string_len(Booking::Status, 20).not_null().default("pending"))
                    .col(
                        string_len(Booking::OrderStage, 30)
                            .not_null()
                            .default("awaiting_contact"),
                    )
                    .col(timestamp_with_time_zone_null(Booking::CompletedAt))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_car")
                            .from(Booking::Table, Booking::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Availability lookups scan a single car's bookings by date.
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_car_dates")
                    .table(Booking::Table)
                    .col(Booking::CarId)
                    .col(Booking::StartDate)
                    .col(Booking::EndDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    UserId,
    CarId,
    StartDate,
    EndDate,
    CurrentProvince,
    DestinationProvince,
    PickupType,
    TotalPrice,
    ContactNumber,
    Status,
    OrderStage,
    CompletedAt,
    CreatedAt,
}
