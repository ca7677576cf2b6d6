pub mod booking;
pub mod car;
pub mod car_image;
pub mod notification;
pub mod user;
