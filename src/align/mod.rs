pub mod aligner;
pub mod timestamp;

pub use aligner::*;
pub use timestamp::*;
