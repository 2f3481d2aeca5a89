//! File-backed configuration loading

use std::path::Path;

use mapvote_core::{ConfigError, MapVoteConfig};
use tokio::fs;

/// Load the configuration at `path`, writing the defaults there if the file is missing.
pub async fn load_or_default(path: &Path) -> Result<MapVoteConfig, ConfigError> {
    match fs::read_to_string(path).await {
        Ok(text) => {
            let config = MapVoteConfig::from_toml_str(&text)?;
            tracing::info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = MapVoteConfig::default();
            save(path, &config).await?;
            tracing::info!(path = %path.display(), "Wrote default configuration");
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `config` to `path` as TOML, creating parent directories
pub async fn save(path: &Path, config: &MapVoteConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, config.to_toml_string()?).await?;
    Ok(())
}
