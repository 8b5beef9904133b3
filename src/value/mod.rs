pub mod dynamic;
pub mod types;

pub use dynamic::*;
pub use types::*;
