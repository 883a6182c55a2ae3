pub mod availability;
pub mod booking;
pub mod coordinator;
pub mod directory;
pub mod lifecycle;
