mod process;
mod snapshot;
mod system;

pub use process::*;
pub use snapshot::*;
pub use system::*;
