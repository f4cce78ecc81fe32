pub mod deferred;
pub mod event_bus;
pub mod subscribers;

pub use deferred::*;
pub use event_bus::*;
pub use subscribers::*;
