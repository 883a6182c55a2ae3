pub mod catalog;
pub mod client;
pub mod conflict;
pub mod reservation;
