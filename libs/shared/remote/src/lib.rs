pub mod scheduling;

pub use scheduling::{RemoteError, SchedulingClient};
