//! Registry validation: referential integrity between models, keys and associations.

use crate::config::{AssociationKindConfig, RegistryConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(registry: &RegistryConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for m in &registry.models {
        if !names.insert(m.name.to_lowercase()) {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
    }

    for m in &registry.models {
        let own_columns: HashSet<&str> = m.columns.iter().map(|c| c.name.as_str()).collect();
        if !own_columns.is_empty() && !own_columns.contains(m.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                model: m.name.clone(),
                column: m.primary_key.clone(),
            });
        }

        for a in &m.associations {
            let target = registry.model(&a.target).ok_or_else(|| ConfigError::MissingReference {
                kind: "association target",
                id: format!("{} -> {}", m.name, a.target),
            })?;
            // Column holding the key lives on us for belongs_to, on the target otherwise.
            let (owner, owner_columns) = match a.kind {
                AssociationKindConfig::BelongsTo => (&m.name, &m.columns),
                AssociationKindConfig::HasMany | AssociationKindConfig::HasOne => (&target.name, &target.columns),
            };
            if !owner_columns.is_empty() && !owner_columns.iter().any(|c| c.name == a.foreign_key) {
                return Err(ConfigError::MissingReference {
                    kind: "foreign key column",
                    id: format!("{}.{}", owner, a.foreign_key),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssociationConfig, ColumnConfig, ModelConfig};

    fn column(name: &str) -> ColumnConfig {
        ColumnConfig {
            name: name.into(),
            type_: "integer".into(),
            nullable: true,
            has_default: false,
        }
    }

    fn model(name: &str, columns: &[&str], associations: Vec<AssociationConfig>) -> ModelConfig {
        ModelConfig {
            name: name.into(),
            schema: None,
            primary_key: "id".into(),
            columns: columns.iter().map(|c| column(c)).collect(),
            associations,
        }
    }

    fn assoc(kind: AssociationKindConfig, target: &str, fk: &str) -> AssociationConfig {
        AssociationConfig {
            kind,
            target: target.into(),
            foreign_key: fk.into(),
            as_: None,
        }
    }

    #[test]
    fn test_valid_registry() {
        let registry = RegistryConfig {
            models: vec![
                model("parents", &["id"], vec![assoc(AssociationKindConfig::HasMany, "children", "parent_id")]),
                model("children", &["id", "parent_id"], vec![assoc(AssociationKindConfig::BelongsTo, "parents", "parent_id")]),
            ],
        };
        validate(&registry).unwrap();
    }

    #[test]
    fn test_duplicate_model() {
        let registry = RegistryConfig {
            models: vec![model("widgets", &[], vec![]), model("Widgets", &[], vec![])],
        };
        assert!(matches!(validate(&registry), Err(ConfigError::DuplicateModel(_))));
    }

    #[test]
    fn test_missing_target() {
        let registry = RegistryConfig {
            models: vec![model("widgets", &[], vec![assoc(AssociationKindConfig::HasMany, "gadgets", "widget_id")])],
        };
        assert!(matches!(validate(&registry), Err(ConfigError::MissingReference { .. })));
    }

    #[test]
    fn test_missing_foreign_key_column() {
        let registry = RegistryConfig {
            models: vec![
                model("parents", &["id"], vec![assoc(AssociationKindConfig::HasMany, "children", "owner_id")]),
                model("children", &["id", "parent_id"], vec![]),
            ],
        };
        assert!(matches!(validate(&registry), Err(ConfigError::MissingReference { .. })));
    }

    #[test]
    fn test_primary_key_must_be_declared() {
        let registry = RegistryConfig {
            models: vec![model("widgets", &["name"], vec![])],
        };
        assert!(matches!(validate(&registry), Err(ConfigError::InvalidPrimaryKey { .. })));
    }
}
