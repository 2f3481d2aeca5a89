//! `mapvote check-config`

use std::path::Path;

use anyhow::Result;

use super::common;

/// Validate and print the effective configuration
pub async fn run(path: &Path) -> Result<()> {
    let config = common::load_config(path).await?;
    println!("# {} (valid)", path.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}
