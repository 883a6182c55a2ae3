pub mod error;
pub mod models;
pub mod services;

pub use error::WorkflowError;
pub use models::*;
pub use services::*;
