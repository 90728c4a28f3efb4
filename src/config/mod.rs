// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
pub mod persona;
mod settings;

pub use loader::{apply_env, apply_toml, default_config_path, load_config};
pub use persona::{PersonaPolicy, BIRDIE};
pub use settings::{BackendConfig, Config, RelayConfig, ServerConfig};
