//! Species record model
//!
//! `SpeciesRecord` is the structured output requested from the inference API
//! and the JSON document persisted next to each stored image.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::store::FolderKey;

/// Name under which the schema is sent in `response_format`
pub const SCHEMA_NAME: &str = "SpeciesData";

/// Field names in declaration (and serialization) order
pub const FIELD_NAMES: [&str; 13] = [
    "group",
    "binomial",
    "iucn_id_no",
    "common_name",
    "name_language",
    "iucn_category",
    "iso_a3",
    "total_area",
    "small_range",
    "wb_datanam",
    "wb_iso",
    "datanam_area",
    "datanam_pct_area",
];

/// One classified animal: taxonomy, range and identifier fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesRecord {
    pub group: String,
    pub binomial: String,
    pub iucn_id_no: i64,
    /// Source of the folder key; stored verbatim (spaces kept)
    pub common_name: String,
    pub name_language: String,
    pub iucn_category: String,
    /// ISO 3166-1 alpha-3 country code
    pub iso_a3: String,
    pub total_area: f64,
    pub small_range: bool,
    pub wb_datanam: String,
    pub wb_iso: String,
    pub datanam_area: f64,
    pub datanam_pct_area: f64,
}

/// Record rejected by boundary validation
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("common_name is empty")]
    EmptyCommonName,

    #[error("common_name {0:?} cannot be used as a folder name")]
    UnsafeCommonName(String),

    #[error("iso_a3 {0:?} is not a 3-letter country code")]
    InvalidIsoA3(String),

    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
}

impl SpeciesRecord {
    /// Check the constraints the JSON schema cannot express
    ///
    /// Runs once, right after the API response is deserialized.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.common_name.trim().is_empty() {
            return Err(RecordError::EmptyCommonName);
        }
        if FolderKey::from_common_name(&self.common_name).is_err() {
            return Err(RecordError::UnsafeCommonName(self.common_name.clone()));
        }

        if self.iso_a3.len() != 3 || !self.iso_a3.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RecordError::InvalidIsoA3(self.iso_a3.clone()));
        }

        for (name, value) in [
            ("total_area", self.total_area),
            ("datanam_area", self.datanam_area),
            ("datanam_pct_area", self.datanam_pct_area),
        ] {
            if !value.is_finite() {
                return Err(RecordError::NonFinite(name));
            }
        }

        Ok(())
    }

    /// Strict JSON schema for structured output
    ///
    /// Every field is required and no additional properties are allowed.
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "group": { "type": "string" },
                "binomial": { "type": "string" },
                "iucn_id_no": { "type": "integer" },
                "common_name": { "type": "string" },
                "name_language": { "type": "string" },
                "iucn_category": { "type": "string" },
                "iso_a3": { "type": "string" },
                "total_area": { "type": "number" },
                "small_range": { "type": "boolean" },
                "wb_datanam": { "type": "string" },
                "wb_iso": { "type": "string" },
                "datanam_area": { "type": "number" },
                "datanam_pct_area": { "type": "number" },
            },
            "required": FIELD_NAMES,
            "additionalProperties": false,
        })
    }

    /// (field, value) pairs in declaration order, for table rendering
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let values = [
            self.group.clone(),
            self.binomial.clone(),
            self.iucn_id_no.to_string(),
            self.common_name.clone(),
            self.name_language.clone(),
            self.iucn_category.clone(),
            self.iso_a3.clone(),
            self.total_area.to_string(),
            self.small_range.to_string(),
            self.wb_datanam.clone(),
            self.wb_iso.clone(),
            self.datanam_area.to_string(),
            self.datanam_pct_area.to_string(),
        ];
        FIELD_NAMES.into_iter().zip(values).collect()
    }

    /// Serialize with 4-space indentation, the on-disk format
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
