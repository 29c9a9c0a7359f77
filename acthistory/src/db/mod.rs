mod snapshot;
pub mod traits;

pub use snapshot::*;
pub use traits::*;
