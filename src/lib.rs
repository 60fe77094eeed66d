pub mod common;
pub mod config;
pub mod downloads;
pub mod error;
pub mod fetch;
pub mod file_index;
pub mod library;
pub mod matcher;
pub mod microplaylists;
pub mod naming;
pub mod playlists;
pub mod reformat;
pub mod view;

#[cfg(test)]
mod testing;

pub use common::{initialize_logging, Artist, Playlist, Track};
pub use config::{Config, NameOrder, NamingConfig, Numbering, SettingsUpdate};
pub use error::{BridgeError, BridgeExpectedError, Result};
pub use library::Library;

#[cfg(test)]
mod common_test;
#[cfg(test)]
mod config_test;
#[cfg(test)]
mod reformat_test;
#[cfg(test)]
mod view_test;
