use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AvifloraError;
use crate::slug::slugify;

/// State of a cache entry on read. A file that exists but does not parse is
/// reported as `Corrupt` so callers can log it and fall through to a refetch
/// instead of failing.
#[derive(Debug)]
pub enum CacheEntry<T> {
    Absent,
    Valid(T),
    Corrupt,
}

/// Explicit handle to the on-disk store: the JSON cache of enrichment lookups
/// and the downloaded species images. Passed to every operation that touches
/// either; there is no process-wide location.
#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
    media_root: Utf8PathBuf,
}

impl Store {
    pub fn new(cache_root: Utf8PathBuf, media_root: Utf8PathBuf) -> Self {
        Self {
            cache_root,
            media_root,
        }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn media_root(&self) -> &Utf8Path {
        &self.media_root
    }

    pub fn ensure_roots(&self) -> Result<(), AvifloraError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        fs::create_dir_all(self.media_root.as_std_path())
            .map_err(|err| AvifloraError::Filesystem(err.to_string()))
    }

    pub fn profile_cache_path(&self, scientific_name: &str) -> Utf8PathBuf {
        self.cache_root
            .join(format!("{}.json", slugify(scientific_name)))
    }

    pub fn species_image_path(&self, scientific_name: &str) -> Utf8PathBuf {
        self.media_root
            .join(slugify(scientific_name))
            .join("image.jpg")
    }

    /// Relative reference stored in enrichment records and resolved by the
    /// serving layer, which mounts the media root at `/media`.
    pub fn species_image_ref(&self, scientific_name: &str) -> String {
        format!("/media/{}/image.jpg", slugify(scientific_name))
    }

    /// Read a JSON cache entry. Any read or parse failure degrades to
    /// `Corrupt`; only a missing file is `Absent`.
    pub fn read_json_cache<T: DeserializeOwned>(&self, path: &Utf8Path) -> CacheEntry<T> {
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return CacheEntry::Absent,
            Err(_) => return CacheEntry::Corrupt,
        };
        match serde_json::from_str(&content) {
            Ok(value) => CacheEntry::Valid(value),
            Err(_) => CacheEntry::Corrupt,
        }
    }

    /// Write a JSON cache entry via temp file + rename so readers never see a
    /// half-written entry from this process.
    pub fn write_json_atomic<T: Serialize>(
        &self,
        path: &Utf8Path,
        value: &T,
    ) -> Result<(), AvifloraError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        }
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| AvifloraError::CacheEncode(err.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Persist a downloaded species image, overwriting any previous download,
    /// and return the serving reference.
    pub fn write_species_image(
        &self,
        scientific_name: &str,
        bytes: &[u8],
    ) -> Result<String, AvifloraError> {
        let path = self.species_image_path(scientific_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        }
        fs::write(path.as_std_path(), bytes)
            .map_err(|err| AvifloraError::Filesystem(err.to_string()))?;
        Ok(self.species_image_ref(scientific_name))
    }
}
