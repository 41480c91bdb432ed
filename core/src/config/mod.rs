mod load;
mod types;

pub use load::{apply_env_overrides, get_dytomate_data_dir, load_default, load_from, read_config};
pub use types::{AppConfig, HttpConfig, LoggingConfig};
