pub mod catalog;
pub mod export;
pub mod resolution;

pub use catalog::*;
pub use export::*;
pub use resolution::*;
