pub mod matcher;
pub mod similarity;

pub use matcher::*;
pub use similarity::*;
