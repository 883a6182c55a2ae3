pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::ResourceError;
pub use models::*;
pub use router::resource_routes;
pub use services::catalog::seed_catalog;
pub use services::client::{HttpResourceClient, ResourceReservationClient};
pub use services::reservation::ReservationService;
pub use store::{InMemoryResourceStore, ResourceStore};
