//! Consumer task ownership and ordered shutdown.

pub mod error;
pub mod manager;
pub mod types;


pub use error::{LifecycleError, LifecycleResult};
pub use manager::LifecycleManager;
pub use types::ConsumerExit;
