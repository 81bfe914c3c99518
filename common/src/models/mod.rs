pub mod api;
pub mod session;

pub use api::*;
pub use session::*;
