pub mod cli;
pub mod commands;
pub mod error;
pub mod render;

pub use runwatch_core::{api, config, events, session, source, types, utils};
