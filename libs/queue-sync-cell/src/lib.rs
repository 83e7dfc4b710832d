pub mod models;
pub mod priority;
pub mod services;
pub mod error;
pub mod handlers;
pub mod router;

pub use models::*;
pub use priority::*;
pub use error::*;
pub use services::*;
pub use handlers::DashboardState;
pub use router::create_queue_router;
