use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CacheKey, FileExtraction};
use crate::config::MixinDetection;
use crate::error::{Error, Result};
use crate::parser::exports::FileExports;
use crate::parser::heritage::FileHeritage;

/// Current cache format version. Bump when any cached struct layout changes.
pub const CACHE_VERSION: u32 = 2;

/// Cache file name within the configured cache directory.
pub const CACHE_FILE: &str = "extraction.bin";

/// One persisted cache entry: key, content fingerprint, extraction outcome.
pub type Record<T> = (CacheKey, String, FileExtraction<T>);

/// Envelope wrapping both extraction namespaces with version metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    /// Export extraction depends on the mixin predicate; a mismatch invalidates the file.
    pub mixin_detection: MixinDetection,
    pub exports: Vec<Record<FileExports>>,
    pub heritage: Vec<Record<FileHeritage>>,
}

/// `<dir>/extraction.bin`
pub fn cache_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILE)
}

/// Save the envelope atomically using bincode serialization.
///
/// Writes to a temp file in the same directory first, then renames to the final path.
/// Creates `dir` if it doesn't exist.
pub fn save_cache(dir: &Path, envelope: &CacheEnvelope) -> Result<()> {
    let io_err = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let target = cache_path(dir);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    bincode::serde::encode_into_std_write(envelope, &mut tmp, bincode::config::standard())
        .map_err(|err| Error::Cache(format!("failed to encode cache: {err}")))?;
    tmp.as_file().flush().map_err(io_err)?;
    tmp.persist(&target)
        .map_err(|err| Error::Cache(format!("failed to persist {}: {err}", target.display())))?;

    Ok(())
}

/// Load a saved envelope. Returns None if:
/// - the cache file doesn't exist
/// - its version or mixin predicate doesn't match
/// - deserialization fails (corrupt cache)
pub fn load_cache(dir: &Path, mixin_detection: MixinDetection) -> Option<CacheEnvelope> {
    let target = cache_path(dir);
    let bytes = std::fs::read(&target).ok()?;
    let result =
        bincode::serde::decode_from_slice::<CacheEnvelope, _>(&bytes, bincode::config::standard());
    match result {
        Ok((envelope, _))
            if envelope.version == CACHE_VERSION && envelope.mixin_detection == mixin_detection =>
        {
            Some(envelope)
        }
        Ok(_) => {
            tracing::debug!(
                path = %target.display(),
                "discarding cache with stale format or settings"
            );
            None
        }
        Err(err) => {
            tracing::warn!(path = %target.display(), "discarding corrupt cache: {err}");
            None
        }
    }
}
