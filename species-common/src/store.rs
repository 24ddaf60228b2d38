//! On-disk species store
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/
//!   <key>/
//!     <key>.jpg    original upload bytes
//!     <key>.json   indented SpeciesRecord
//! ```
//!
//! `<key>` is the record's `common_name` with spaces replaced by underscores.
//! A second record with the same key overwrites the first.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::species::SpeciesRecord;

/// Species store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("common_name is empty")]
    EmptyCommonName,

    #[error("invalid folder key: {0:?}")]
    InvalidKey(String),

    #[error("no stored species named {0}")]
    NotFound(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed species JSON at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Filesystem-safe identifier for one stored species
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey(String);

/// Replace every space with an underscore, leaving all other characters alone
pub fn folder_name(common_name: &str) -> String {
    common_name.replace(' ', "_")
}

impl FolderKey {
    /// Derive the key from a record's `common_name`
    pub fn from_common_name(common_name: &str) -> Result<Self, StoreError> {
        if common_name.trim().is_empty() {
            return Err(StoreError::EmptyCommonName);
        }
        Self::parse(&folder_name(common_name))
    }

    /// Accept a key supplied by a caller (URL path, directory listing)
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let unsafe_key = raw.is_empty()
            || raw == "."
            || raw == ".."
            || raw.contains(['/', '\\', '\0'])
            || raw.len() > 255;
        if unsafe_key {
            return Err(StoreError::InvalidKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable caption (underscores back to spaces)
    pub fn display_name(&self) -> String {
        self.0.replace('_', " ")
    }

    pub fn image_file_name(&self) -> String {
        format!("{}.jpg", self.0)
    }

    pub fn json_file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths written by a successful save
#[derive(Debug, Clone)]
pub struct StoredSpecies {
    pub key: FolderKey,
    pub folder: PathBuf,
    pub image_path: PathBuf,
    pub json_path: PathBuf,
    /// The folder already held a record that was overwritten
    pub replaced: bool,
}

/// Result of listing the storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Storage root does not exist (nothing uploaded yet)
    MissingRoot,
    /// Storage root exists but holds no species folders
    Empty,
    /// Species folders, sorted by key
    Entries(Vec<FolderKey>),
}

impl Listing {
    pub fn entries(&self) -> &[FolderKey] {
        match self {
            Listing::Entries(keys) => keys,
            Listing::MissingRoot | Listing::Empty => &[],
        }
    }
}

/// State of a folder's `<key>.json`
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Missing,
    Valid(SpeciesRecord),
    /// Present but unreadable (e.g. a write cut short); holds the parse error
    Malformed(String),
}

impl StoredRecord {
    pub fn valid(&self) -> Option<&SpeciesRecord> {
        match self {
            StoredRecord::Valid(record) => Some(record),
            StoredRecord::Missing | StoredRecord::Malformed(_) => None,
        }
    }
}

/// One stored species as found on disk; either file may be missing
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key: FolderKey,
    pub record: StoredRecord,
    pub image_path: Option<PathBuf>,
}

/// Species folders under a storage root
#[derive(Debug, Clone)]
pub struct SpeciesStore {
    root: PathBuf,
}

impl SpeciesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_path(&self, key: &FolderKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Persist a classified record and its original image
    ///
    /// Creates `<root>/<key>/` if needed, then writes the image followed by
    /// the JSON. The two writes are not atomic as a pair.
    pub async fn save(
        &self,
        record: &SpeciesRecord,
        image: &[u8],
    ) -> Result<StoredSpecies, StoreError> {
        let key = FolderKey::from_common_name(&record.common_name)?;
        let folder = self.folder_path(&key);
        let image_path = folder.join(key.image_file_name());
        let json_path = folder.join(key.json_file_name());

        let replaced = fs::try_exists(&json_path).await.unwrap_or(false)
            || fs::try_exists(&image_path).await.unwrap_or(false);
        if replaced {
            warn!(key = %key, "Overwriting previously stored species");
        }

        fs::create_dir_all(&folder)
            .await
            .map_err(|source| StoreError::Io {
                path: folder.clone(),
                source,
            })?;

        fs::write(&image_path, image)
            .await
            .map_err(|source| StoreError::Io {
                path: image_path.clone(),
                source,
            })?;

        let json = record.to_pretty_json().map_err(|source| StoreError::Json {
            path: json_path.clone(),
            source,
        })?;
        fs::write(&json_path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: json_path.clone(),
                source,
            })?;

        info!(
            key = %key,
            folder = %folder.display(),
            image_bytes = image.len(),
            "Species saved"
        );

        Ok(StoredSpecies {
            key,
            folder,
            image_path,
            json_path,
            replaced,
        })
    }

    /// List immediate subdirectories of the storage root
    pub async fn browse(&self) -> Result<Listing, StoreError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Listing::MissingRoot),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut keys = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.root.clone(),
                        source,
                    })
                }
            };

            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            let name = entry.file_name();
            match name.to_str().map(FolderKey::parse) {
                Some(Ok(key)) => keys.push(key),
                _ => debug!(name = ?name, "Skipping folder with unusable name"),
            }
        }

        if keys.is_empty() {
            return Ok(Listing::Empty);
        }
        keys.sort();
        Ok(Listing::Entries(keys))
    }

    /// Read one stored species; the JSON and image are each optional
    ///
    /// A JSON file that does not parse is reported in the entry, not as an
    /// error, so the folder's image stays reachable.
    pub async fn load(&self, key: &FolderKey) -> Result<StoredEntry, StoreError> {
        let folder = self.folder_path(key);
        if !fs::metadata(&folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let record = match self.read_record_json(key).await {
            Ok(json) => match serde_json::from_slice::<SpeciesRecord>(&json) {
                Ok(record) => StoredRecord::Valid(record),
                Err(e) => {
                    warn!(
                        key = %key,
                        path = %folder.join(key.json_file_name()).display(),
                        error = %e,
                        "Stored species record is malformed"
                    );
                    StoredRecord::Malformed(e.to_string())
                }
            },
            Err(StoreError::NotFound(_)) => StoredRecord::Missing,
            Err(e) => return Err(e),
        };

        let image_path = folder.join(key.image_file_name());
        let image_path = fs::try_exists(&image_path)
            .await
            .unwrap_or(false)
            .then_some(image_path);

        Ok(StoredEntry {
            key: key.clone(),
            record,
            image_path,
        })
    }

    /// Stored JSON bytes exactly as written
    pub async fn read_record_json(&self, key: &FolderKey) -> Result<Vec<u8>, StoreError> {
        let path = self.folder_path(key).join(key.json_file_name());
        read_optional(&path, key).await
    }

    /// Stored image bytes
    pub async fn read_image(&self, key: &FolderKey) -> Result<Vec<u8>, StoreError> {
        let path = self.folder_path(key).join(key.image_file_name());
        read_optional(&path, key).await
    }
}

async fn read_optional(path: &Path, key: &FolderKey) -> Result<Vec<u8>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
