//! Helpers shared by the dbrun engine and command line: the `key=value`
//! settings loader, path expansion, directory sweeping and secret key detection.

pub mod directories;
pub mod path_processing;
pub mod settings;
pub mod text_processing;

pub use directories::{clean_directory, ensure_directory};
pub use path_processing::{expand_tilde, resolve_under};
pub use settings::{SETTINGS_FILE_NAME, SETTINGS_PATH_ENV, Settings, default_settings_path, load_settings};
pub use text_processing::is_secret_key;
