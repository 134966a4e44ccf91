pub mod catalog;
pub mod recording;
pub mod section;
pub mod transcript;
pub mod zoom;

pub use catalog::*;
pub use recording::*;
pub use section::*;
pub use transcript::*;
pub use zoom::*;
