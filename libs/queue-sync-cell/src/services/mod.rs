pub mod gateway;
pub mod store;
pub mod scheduler;
pub mod coordinator;
pub mod degraded;
pub(crate) mod wire;

pub use gateway::*;
pub use store::*;
pub use scheduler::*;
pub use coordinator::*;
pub use degraded::*;
