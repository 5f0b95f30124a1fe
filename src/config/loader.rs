//! Build the model index from a registry, and load the registry from a JSON file or from the live database.

use crate::config::options::ApiOptions;
use crate::config::resolved::{
    AssociationDescriptor, AssociationKind, ColumnInfo, EagerLoad, ModelDescriptor, ModelIndex,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::inflect::{pluralize, singularize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;

/// Build the association index for every registered model and check the allowed set against it.
pub fn resolve(registry: &RegistryConfig, options: &ApiOptions) -> Result<ModelIndex, ConfigError> {
    validate(registry)?;

    let by_name: HashMap<String, &ModelConfig> = registry
        .models
        .iter()
        .map(|m| (m.name.to_lowercase(), m))
        .collect();

    let mut models = HashMap::new();
    for m in &registry.models {
        let name = m.name.to_lowercase();
        let mut associations = Vec::new();
        for a in &m.associations {
            let target = a.target.to_lowercase();
            match a.kind {
                AssociationKindConfig::BelongsTo => associations.push(AssociationDescriptor {
                    name: a.foreign_key.clone(),
                    target,
                    kind: AssociationKind::BelongsTo {
                        foreign_key: a.foreign_key.clone(),
                    },
                }),
                AssociationKindConfig::HasMany => {
                    let assoc_name = a.as_.clone().unwrap_or_else(|| target.clone());
                    let target_model = by_name
                        .get(&target)
                        .ok_or_else(|| ConfigError::MissingReference {
                            kind: "association target",
                            id: target.clone(),
                        })?;
                    let eager = EagerLoad {
                        name: assoc_name.clone(),
                        target: target.clone(),
                        schema: target_model.schema.clone(),
                        table: target_model.name.clone(),
                        foreign_key: a.foreign_key.clone(),
                        attributes: vec![target_model.primary_key.clone()],
                    };
                    associations.push(AssociationDescriptor {
                        name: assoc_name,
                        target,
                        kind: AssociationKind::HasMany {
                            foreign_key: a.foreign_key.clone(),
                            eager,
                        },
                    });
                }
                AssociationKindConfig::HasOne => {
                    tracing::debug!(model = %name, association = %target, "skipping has_one association");
                }
            }
        }

        let columns = m
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                pg_type: c.type_.to_lowercase(),
                nullable: c.nullable,
                has_default: c.has_default,
            })
            .collect();

        let descriptor = ModelDescriptor {
            singular: singularize(&name),
            plural: pluralize(&name),
            name: name.clone(),
            schema: m.schema.clone(),
            table: m.name.clone(),
            primary_key: m.primary_key.clone(),
            columns,
            associations,
        };
        models.insert(name, descriptor);
    }

    let allowed: Vec<String> = match &options.config.allowed {
        Some(list) => list.iter().map(|n| n.to_lowercase()).collect(),
        None => registry.models.iter().map(|m| m.name.to_lowercase()).collect(),
    };
    for name in &allowed {
        if !models.contains_key(name) {
            return Err(ConfigError::UnknownModel(name.clone()));
        }
    }

    Ok(ModelIndex { models, allowed })
}

/// Load a registry from a JSON file of the form `{"models": [...]}`.
pub async fn load_registry_from_path(path: impl AsRef<Path>) -> Result<RegistryConfig, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

const COLUMNS_SQL: &str = r#"
SELECT table_name::text, column_name::text, data_type::text, (is_nullable = 'YES') AS nullable, (column_default IS NOT NULL) AS has_default
FROM information_schema.columns
WHERE table_schema = $1
ORDER BY table_name, ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
SELECT kcu.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1
ORDER BY kcu.table_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
SELECT kcu.table_name::text, kcu.column_name::text, ccu.table_name::text AS target_table
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
ORDER BY kcu.table_name, kcu.column_name
"#;

/// Introspect `schema` and derive models plus belongs_to/has_many pairs from its foreign keys.
pub async fn load_registry_from_pool(pool: &PgPool, schema: &str) -> Result<RegistryConfig, ConfigError> {
    tracing::debug!(sql = %COLUMNS_SQL, schema = %schema, "query");
    let columns: Vec<(String, String, String, bool, bool)> = sqlx::query_as(COLUMNS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    tracing::debug!(sql = %PRIMARY_KEYS_SQL, schema = %schema, "query");
    let primary_keys: Vec<(String, String)> = sqlx::query_as(PRIMARY_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    tracing::debug!(sql = %FOREIGN_KEYS_SQL, schema = %schema, "query");
    let foreign_keys: Vec<(String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    Ok(registry_from_catalog(schema, columns, primary_keys, foreign_keys))
}

fn registry_from_catalog(
    schema: &str,
    columns: Vec<(String, String, String, bool, bool)>,
    primary_keys: Vec<(String, String)>,
    foreign_keys: Vec<(String, String, String)>,
) -> RegistryConfig {
    let mut models: Vec<ModelConfig> = Vec::new();
    for (table, name, type_, nullable, has_default) in columns {
        let idx = match models.iter().position(|m| m.name == table) {
            Some(i) => i,
            None => {
                models.push(ModelConfig {
                    name: table.clone(),
                    schema: Some(schema.to_string()),
                    primary_key: "id".into(),
                    columns: Vec::new(),
                    associations: Vec::new(),
                });
                models.len() - 1
            }
        };
        models[idx].columns.push(ColumnConfig {
            name,
            type_,
            nullable,
            has_default,
        });
    }

    // Composite keys are not addressable by a single path id; the first column wins.
    for (table, column) in primary_keys.into_iter().rev() {
        if let Some(m) = models.iter_mut().find(|m| m.name == table) {
            m.primary_key = column;
        }
    }

    for (child, fk, parent) in foreign_keys {
        if let Some(m) = models.iter_mut().find(|m| m.name == child) {
            m.associations.push(AssociationConfig {
                kind: AssociationKindConfig::BelongsTo,
                target: parent.clone(),
                foreign_key: fk.clone(),
                as_: None,
            });
        }
        if let Some(m) = models.iter_mut().find(|m| m.name == parent) {
            let taken = m
                .associations
                .iter()
                .any(|a| a.kind == AssociationKindConfig::HasMany && a.target == child);
            if taken {
                tracing::warn!(parent = %parent, child = %child, foreign_key = %fk, "second has_many to the same table, skipped");
                continue;
            }
            m.associations.push(AssociationConfig {
                kind: AssociationKindConfig::HasMany,
                target: child,
                foreign_key: fk,
                as_: None,
            });
        }
    }

    RegistryConfig { models }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    fn registry() -> RegistryConfig {
        serde_json::from_value(serde_json::json!({
            "models": [
                {
                    "name": "Parents",
                    "columns": [{"name": "id", "type": "integer"}, {"name": "name"}],
                    "associations": [
                        {"kind": "has_many", "target": "children", "foreign_key": "parent_id"},
                        {"kind": "has_one", "target": "profiles", "foreign_key": "parent_id"}
                    ]
                },
                {
                    "name": "children",
                    "columns": [{"name": "id", "type": "integer"}, {"name": "parent_id", "type": "integer"}],
                    "associations": [
                        {"kind": "belongs_to", "target": "parents", "foreign_key": "parent_id"}
                    ]
                },
                {
                    "name": "profiles",
                    "primary_key": "key",
                    "associations": []
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_builds_association_index() {
        let index = resolve(&registry(), &ApiOptions::default()).unwrap();
        assert_eq!(vec!["parents", "children", "profiles"], index.allowed);

        let parents = index.model("parents").unwrap();
        assert_eq!("Parents", parents.table);
        assert_eq!("parent", parents.singular);
        assert_eq!("parents", parents.plural);
        assert_eq!(1, parents.associations.len(), "has_one must be skipped");
        assert_eq!(
            vec![EagerLoad {
                name: "children".into(),
                target: "children".into(),
                schema: None,
                table: "children".into(),
                foreign_key: "parent_id".into(),
                attributes: vec!["id".into()],
            }],
            parents.eager_loads()
        );

        let children = index.model("children").unwrap();
        assert_eq!("child", children.singular);
        assert_eq!(Some("parent_id"), children.foreign_key_to("parents"));
        assert!(children.eager_loads().is_empty());
    }

    #[test]
    fn test_resolve_unknown_allowed_model() {
        let options = ApiOptions::new(ApiConfig {
            allowed: Some(vec!["parents".into(), "gadgets".into()]),
            ..ApiConfig::default()
        });
        match resolve(&registry(), &options) {
            Err(ConfigError::UnknownModel(name)) => assert_eq!("gadgets", name),
            other => panic!("unexpected {:?}", other.map(|i| i.allowed)),
        }
    }

    #[test]
    fn test_resolve_restricts_resources() {
        let options = ApiOptions::new(ApiConfig {
            allowed: Some(vec!["children".into()]),
            ..ApiConfig::default()
        });
        let index = resolve(&registry(), &options).unwrap();
        assert!(index.resource("children").is_some());
        assert!(index.resource("parents").is_none());
        assert!(index.model("parents").is_some());
    }

    #[test]
    fn test_routes() {
        let index = resolve(&registry(), &ApiOptions::default()).unwrap();
        let paths: Vec<String> = index.routes().into_iter().map(|r| r.resource_path).collect();
        assert!(paths.contains(&"/parents/:id/children".to_string()));
        assert!(paths.contains(&"/children/:id".to_string()));
        assert_eq!(7, paths.len());

        for route in index.routes() {
            if let [_, parent, _, child] = route.resource_path.split('/').collect::<Vec<_>>()[..] {
                assert!(index.nested_foreign_key(parent, child).is_some(), "{}", route.resource_path);
            }
        }
    }

    #[test]
    fn test_nested_route_needs_belongs_to_only() {
        let registry: RegistryConfig = serde_json::from_value(serde_json::json!({
            "models": [
                {"name": "owners"},
                {
                    "name": "pets",
                    "associations": [{"kind": "belongs_to", "target": "owners", "foreign_key": "owner_id"}]
                }
            ]
        }))
        .unwrap();
        let index = resolve(&registry, &ApiOptions::default()).unwrap();
        assert_eq!(Some("owner_id"), index.nested_foreign_key("owners", "pets"));
        assert_eq!(None, index.nested_foreign_key("pets", "owners"));
        let paths: Vec<String> = index.routes().into_iter().map(|r| r.resource_path).collect();
        assert!(paths.contains(&"/owners/:id/pets".to_string()));

        let options = ApiOptions::new(ApiConfig {
            allowed: Some(vec!["owners".into()]),
            ..ApiConfig::default()
        });
        let index = resolve(&registry, &options).unwrap();
        assert_eq!(None, index.nested_foreign_key("owners", "pets"));
    }

    #[test]
    fn test_registry_from_catalog() {
        let columns = vec![
            ("parents".into(), "id".into(), "integer".into(), false, true),
            ("children".into(), "id".into(), "integer".into(), false, true),
            ("children".into(), "parent_id".into(), "integer".into(), true, false),
        ];
        let pks = vec![("parents".into(), "id".into()), ("children".into(), "id".into())];
        let fks = vec![("children".into(), "parent_id".into(), "parents".into())];
        let registry = registry_from_catalog("public", columns, pks, fks);

        assert_eq!(2, registry.models.len());
        let parents = registry.model("parents").unwrap();
        assert_eq!(AssociationKindConfig::HasMany, parents.associations[0].kind);
        assert_eq!("children", parents.associations[0].target);
        let children = registry.model("children").unwrap();
        assert_eq!(AssociationKindConfig::BelongsTo, children.associations[0].kind);
        assert_eq!("parent_id", children.associations[0].foreign_key);
        validate(&registry).unwrap();
    }
}
