//! # Species Lens Common Library
//!
//! Shared code for the Species Lens services:
//! - `SpeciesRecord` data model and its structured-output schema
//! - On-disk species store (folder key derivation, save, browse, load)
//! - Configuration loading (TOML, environment, compiled defaults)
//! - HTML helpers shared by the analyzer and dashboard pages

pub mod config;
pub mod error;
pub mod species;
pub mod store;
pub mod ui;

pub use error::{Error, Result};
pub use species::{RecordError, SpeciesRecord};
pub use store::{
    FolderKey, Listing, SpeciesStore, StoreError, StoredEntry, StoredRecord, StoredSpecies,
};
