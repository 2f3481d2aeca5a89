//! Candidate map sources backed by files and static lists

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mapvote_core::{CatalogError, MapMeta, MapSourceEffects};
use tokio::fs;

/// Maps written to a freshly created `maplist.txt`
pub const DEFAULT_MAPS: [&str; 3] = ["surf_beginner", "surf_kitsune", "surf_ski_2"];

/// Parse map list text: one map per line, blank lines and `//` comments skipped
pub fn parse_map_list(text: &str) -> Vec<MapMeta> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .map(MapMeta::new)
        .collect()
}

/// Map source reading a plain-text map list.
///
/// A missing file is created with [`DEFAULT_MAPS`].
#[derive(Debug, Clone)]
pub struct FileMapSource {
    path: PathBuf,
}

impl FileMapSource {
    /// Source reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this source
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_defaults(&self) -> Result<Vec<MapMeta>, CatalogError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut contents = DEFAULT_MAPS.join("\n");
        contents.push('\n');
        fs::write(&self.path, contents).await?;
        tracing::info!(path = %self.path.display(), "Created default map list");
        Ok(DEFAULT_MAPS.iter().map(|name| MapMeta::new(*name)).collect())
    }
}

#[async_trait]
impl MapSourceEffects for FileMapSource {
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => {
                let maps = parse_map_list(&text);
                tracing::debug!(path = %self.path.display(), maps = maps.len(), "Read map list");
                Ok(maps)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.write_defaults().await,
            Err(e) => Err(e.into()),
        }
    }
}

/// Map source serving a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticMapSource {
    maps: Vec<MapMeta>,
}

impl StaticMapSource {
    /// Source serving `maps`
    pub fn new(maps: Vec<MapMeta>) -> Self {
        Self { maps }
    }

    /// Source serving untiered maps named `names`
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            names
                .into_iter()
                .map(|name| MapMeta::new(name.as_ref()))
                .collect(),
        )
    }
}

#[async_trait]
impl MapSourceEffects for StaticMapSource {
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError> {
        Ok(self.maps.clone())
    }
}
