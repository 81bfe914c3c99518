pub mod config;
pub mod eip712;
pub mod error;
pub mod models;
pub mod signature;
pub mod utils;

pub use config::*;
pub use error::*;
pub use utils::*;
