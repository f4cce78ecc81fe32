pub mod config;
pub mod engine;
pub mod error;
pub mod headless;
pub mod script;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use headless::*;
