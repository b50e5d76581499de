pub mod orientation;
pub mod roof;
