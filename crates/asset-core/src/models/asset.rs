//! Asset description and detail types.
//!
//! Field names on the wire are PascalCase to match what the asset viewer UI reads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A loose description of an asset.
///
/// Used both as a partially-filled query template and as a concrete search result.
/// The `id` is backend-private: it is never serialized and does not take part in
/// equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetDescription {
    #[serde(skip)]
    pub id: String,
    /// Asset group / collection name
    #[serde(default)]
    pub name: String,
    /// Asset major class / type
    #[serde(default)]
    pub class: String,
    /// Asset subtype
    #[serde(default)]
    pub subclass: String,
    /// Free-form text left to the backend
    #[serde(default)]
    pub description: String,
}

impl AssetDescription {
    /// Build a query template from the three lookup fields.
    pub fn query(
        name: impl Into<String>,
        class: impl Into<String>,
        subclass: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            subclass: subclass.into(),
            ..Default::default()
        }
    }

    /// Attach a backend identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether name, class and subclass are all set.
    pub fn is_fully_specified(&self) -> bool {
        !self.name.is_empty() && !self.class.is_empty() && !self.subclass.is_empty()
    }
}

impl PartialEq for AssetDescription {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.class == other.class
            && self.subclass == other.subclass
            && self.description == other.description
    }
}

impl Eq for AssetDescription {}

/// A resource attached to an asset (file, texture, cache...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescription {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Class", default)]
    pub class: String,
    #[serde(rename = "URI", default)]
    pub uri: String,
}

/// Detailed asset record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetData {
    #[serde(rename = "Data", default)]
    pub description: AssetDescription,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub linked: Vec<AssetDescription>,
    #[serde(default)]
    pub resources: Vec<ResourceDescription>,
}
