pub mod confirmation;
pub mod coordinator;
pub mod engine;
pub mod variables;
pub mod worker;

pub use confirmation::*;
pub use coordinator::*;
pub use engine::*;
pub use variables::*;
pub use worker::*;
