pub mod extract;
pub mod media;
pub mod password;
pub mod response;
pub mod time;
