//! Configuration for jarprep
//!
//! The configuration comes from the command line (see [`crate::cli`]); this
//! module holds the validated value object and the on-disk locations derived
//! from it.

pub mod schema;

pub use schema::{
    CacheStrategy, Config, ConfigBuilder, LogLevel, SourcePaths, GROUP_SEPARATOR, PATH_SEPARATOR,
};

use std::path::PathBuf;

/// Name of the per-output-root state directory
const STATE_DIR_NAME: &str = ".jarprep";

/// File name of the checksum cache manifest
const MANIFEST_FILE_NAME: &str = "cache-manifest.json";

/// Get the platform cache directory used when no output directory is set
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jarprep")
}

impl Config {
    /// Location of the checksum cache manifest for this configuration
    pub fn cache_manifest_path(&self) -> PathBuf {
        match self.output_dir() {
            Some(dir) => dir.join(STATE_DIR_NAME).join(MANIFEST_FILE_NAME),
            None => default_cache_dir().join(MANIFEST_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn manifest_under_output_dir() {
        let config = Config::builder().output_dir("/out").build().unwrap();
        assert_eq!(
            config.cache_manifest_path(),
            Path::new("/out/.jarprep/cache-manifest.json")
        );
    }

    #[test]
    fn manifest_falls_back_to_cache_dir() {
        let config = Config::builder().build().unwrap();
        let path = config.cache_manifest_path();
        assert!(path.ends_with("jarprep/cache-manifest.json"));
    }
}
