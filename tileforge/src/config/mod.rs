//! User configuration.
//!
//! Settings are stored in an INI file at `<config dir>/tileforge/config.ini`
//! with `[scheduler]`, `[cache]` and `[remote]` sections. Every key is
//! optional; missing keys keep their defaults.

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, IndexCacheConfig, RemoteSourceConfig, DEFAULT_PARALLEL_REQUESTS,
    DEFAULT_REMOTE_EXTENSION, DEFAULT_REMOTE_HOST, DEFAULT_REMOTE_MAX_ZOOM,
    DEFAULT_REMOTE_PROTOCOL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
