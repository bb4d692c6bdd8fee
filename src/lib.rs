pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod mtg;
pub mod names;
pub mod parsing;
pub mod render;
pub mod resolver;
pub mod store;
pub mod tooltip;

pub use error::{Error, Result};
