pub mod controller;
pub mod panel;
pub mod state;
pub mod view;

pub use controller::*;
pub use panel::*;
pub use state::*;
pub use view::*;
