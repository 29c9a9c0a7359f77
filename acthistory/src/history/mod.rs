//! Patient medical history: clinical events and their items.

mod filter;
mod iterator;
mod query;

pub use filter::{history_filter, HistoryPolicy, PatientHistoryFilter};
pub use iterator::{reparentable_categories, PatientHistoryIterator};
pub use query::{CategorySelection, PatientHistoryQuery};
