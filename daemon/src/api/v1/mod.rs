mod archive;
mod build;
mod builder;
mod publishing;
mod queue;
mod source;

pub use archive::*;
pub use build::*;
pub use builder::*;
pub use publishing::*;
pub use queue::*;
pub use source::*;
