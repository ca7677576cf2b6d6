use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl BookingStatus {
    /// Statuses that hold the car and exclude overlapping bookings.
    pub fn is_blocking(self) -> bool {
        match self {
            BookingStatus::Pending | BookingStatus::Approved => true,
            BookingStatus::Rejected => false,
        }
    }

    pub fn blocking() -> [BookingStatus; 2] {
        [BookingStatus::Pending, BookingStatus::Approved]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }
}

/// Fulfilment position of a booking. Variants are declared in forward order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStage {
    #[sea_orm(string_value = "awaiting_contact")]
    AwaitingContact,
    #[sea_orm(string_value = "awaiting_deposit")]
    AwaitingDeposit,
    #[sea_orm(string_value = "awaiting_handover")]
    AwaitingHandover,
    #[sea_orm(string_value = "awaiting_full_payment")]
    AwaitingFullPayment,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// How the customer gets the car. Stored in `booking.pickup_type` as
/// `self` or `delivery`; `self` cannot name an active-enum variant, so the
/// column is a plain string converted with [`PickupType::parse`] and
/// [`PickupType::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupType {
    #[serde(rename = "self")]
    SelfPickup,
    #[serde(rename = "delivery")]
    Delivery,
}

impl PickupType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "self" => Some(PickupType::SelfPickup),
            "delivery" => Some(PickupType::Delivery),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PickupType::SelfPickup => "self",
            PickupType::Delivery => "delivery",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub car_id: i32,
    pub start_date: Date,
    pub end_date: Date,
    pub current_province: String,
    pub destination_province: String,
    pub pickup_type: String,
    pub total_price: i64,
    pub contact_number: String,
    pub status: BookingStatus,
    pub order_stage: OrderStage,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Model {
    /// The stored pickup type, if the column holds a known value.
    pub fn pickup(&self) -> Option<PickupType> {
        PickupType::parse(&self.pickup_type)
    }
}

impl ActiveModelBehavior for ActiveModel {}
