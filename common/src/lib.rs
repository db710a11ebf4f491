pub mod constants;
pub mod utils;

pub use constants::*;
