//! Raw registry types: the storage engine's model metadata as JSON (file) or as introspected from the database.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKindConfig {
    BelongsTo,
    HasMany,
    HasOne,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub kind: AssociationKindConfig,
    /// Target model's table name.
    pub target: String,
    /// Column holding the key: on this model for belongs_to, on the target for has_many/has_one.
    pub foreign_key: String,
    /// Wire name override; defaults to the lowercased target table name.
    #[serde(default, rename = "as")]
    pub as_: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_column_type")]
    pub type_: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
}

fn default_column_type() -> String {
    "text".into()
}

fn default_true() -> bool {
    true
}

fn default_primary_key() -> String {
    "id".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Table name. Lowercased, it becomes the resource path segment.
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Empty means "unknown": stores accept any attribute.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
}

/// All registered models, in declaration order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl RegistryConfig {
    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }
}
