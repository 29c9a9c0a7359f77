mod act;
mod common;
mod time;

pub use act::*;
pub use common::*;
pub use time::*;
