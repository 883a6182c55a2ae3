pub mod bus;
pub mod consumer;
pub mod listener;
pub mod producer;
pub mod redis_bus;

pub use bus::*;
pub use consumer::*;
pub use listener::*;
pub use producer::*;
pub use redis_bus::*;
