pub mod catalog;
pub mod entity;
pub mod error;
pub mod filter;
pub mod predicates;
pub mod source;

pub use entity::*;
pub use error::*;
pub use filter::*;
pub use predicates::*;

#[cfg(test)]
pub(crate) mod fixtures;
