pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::appointment_routes;
pub use services::booking::AppointmentBookingService;
pub use services::coordinator::{BookingCoordinator, SyncCoordinator};
pub use services::directory::{HttpParticipantDirectory, ParticipantDirectory, UncheckedDirectory};
pub use services::lifecycle::{AppliedTransition, AppointmentLifecycleService, Transition};
pub use store::{AppointmentStore, InMemoryAppointmentStore};
