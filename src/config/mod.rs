// Configuration management: TOML settings under the data directory

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, HOME_ENV_VAR, OllamaConfig};

/// Resolve the data directory: an explicit path wins over the environment and the home default
#[inline]
pub fn resolve_base_dir(
    explicit: Option<&std::path::Path>,
) -> Result<std::path::PathBuf, ConfigError> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Config::default_base_dir(),
    }
}
