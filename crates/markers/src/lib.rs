pub mod adapter;
pub mod grid;
pub mod handles;
pub mod layer;
pub mod palette;
pub mod popup;

pub use adapter::*;
pub use handles::*;
pub use layer::*;
