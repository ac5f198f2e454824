pub mod constants;
pub mod error;
pub mod frame;

pub use constants::*;
