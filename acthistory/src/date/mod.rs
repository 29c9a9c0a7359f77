//! Date helpers.

mod relative;

pub use relative::RelativeDateParser;
