//! Configuration file discovery and loading
//!
//! Files are TOML. The schema belongs to whichever crate consumes the file;
//! this module only knows where to look and how to parse.

mod loader;

pub use loader::{ConfigFile, DEFAULT_CANDIDATES, find_config_file, load_config_file};
