//! Filtered, depth-bounded traversal of clinical act hierarchies and the
//! patient medical history built on it.

pub mod config;
pub mod date;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod history;
pub mod models;

pub use error::{ActHistoryError, Result};
