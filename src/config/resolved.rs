//! Resolved model index: registry validated and flattened for runtime use. Built once, read-only afterwards.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type name (e.g. "integer", "timestamptz").
    pub pg_type: String,
    pub nullable: bool,
    pub has_default: bool,
}

/// Eager-load projection for a has-many: fetch only the target's primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EagerLoad {
    /// Key under which the id list is attached to the instance.
    pub name: String,
    pub target: String,
    pub schema: Option<String>,
    pub table: String,
    pub foreign_key: String,
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssociationKind {
    /// This model holds `foreign_key` referencing the target's primary key.
    BelongsTo { foreign_key: String },
    /// The target holds `foreign_key` referencing this model's primary key.
    HasMany { foreign_key: String, eager: EagerLoad },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssociationDescriptor {
    /// Wire key: the belongs-to foreign key or the has-many collection name.
    pub name: String,
    /// Target model name (lowercased table name).
    pub target: String,
    pub kind: AssociationKind,
}

#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    /// Lowercased table name; also the resource path segment.
    pub name: String,
    pub singular: String,
    pub plural: String,
    pub schema: Option<String>,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<ColumnInfo>,
    pub associations: Vec<AssociationDescriptor>,
}

impl ModelDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True when `name` is a storable attribute. Models without declared columns accept everything.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.is_empty() || self.column(name).is_some()
    }

    pub fn eager_loads(&self) -> Vec<EagerLoad> {
        self.associations
            .iter()
            .filter_map(|a| match &a.kind {
                AssociationKind::HasMany { eager, .. } => Some(eager.clone()),
                AssociationKind::BelongsTo { .. } => None,
            })
            .collect()
    }

    pub fn has_many(&self) -> impl Iterator<Item = (&AssociationDescriptor, &str)> {
        self.associations.iter().filter_map(|a| match &a.kind {
            AssociationKind::HasMany { foreign_key, .. } => Some((a, foreign_key.as_str())),
            AssociationKind::BelongsTo { .. } => None,
        })
    }

    /// Foreign key column on this model that references `parent`, if any.
    pub fn foreign_key_to(&self, parent: &str) -> Option<&str> {
        self.associations.iter().find_map(|a| match &a.kind {
            AssociationKind::BelongsTo { foreign_key } if a.target == parent => Some(foreign_key.as_str()),
            _ => None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
    ListNested,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::ListNested => "listNested",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub resource_path: String,
    pub target_model: String,
    pub supported_operations: BTreeSet<Operation>,
}

#[derive(Clone, Debug, Default)]
pub struct ModelIndex {
    /// Every registered model, allowed or not (association targets need lookups).
    pub models: HashMap<String, ModelDescriptor>,
    /// Exposed model names in configuration order.
    pub allowed: Vec<String>,
}

impl ModelIndex {
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    /// Model reachable through the HTTP surface.
    pub fn resource(&self, name: &str) -> Option<&ModelDescriptor> {
        if self.allowed.iter().any(|a| a == name) {
            self.models.get(name)
        } else {
            None
        }
    }

    /// Filter column for `/{parent}/:id/{child}`: both must be exposed and the child must belong to the parent.
    pub fn nested_foreign_key(&self, parent: &str, child: &str) -> Option<&str> {
        self.resource(parent)?;
        self.resource(child)?.foreign_key_to(parent)
    }

    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.allowed
            .iter()
            .filter_map(|name| self.models.get(name))
            .flat_map(|model| {
                let mut out = vec![
                    RouteDescriptor {
                        resource_path: format!("/{}", model.name),
                        target_model: model.name.clone(),
                        supported_operations: [Operation::List, Operation::Create].into_iter().collect(),
                    },
                    RouteDescriptor {
                        resource_path: format!("/{}/:id", model.name),
                        target_model: model.name.clone(),
                        supported_operations: [Operation::Read, Operation::Update, Operation::Delete]
                            .into_iter()
                            .collect(),
                    },
                ];
                for child in &self.allowed {
                    if self.nested_foreign_key(&model.name, child).is_some() {
                        out.push(RouteDescriptor {
                            resource_path: format!("/{}/:id/{}", model.name, child),
                            target_model: child.clone(),
                            supported_operations: [Operation::ListNested].into_iter().collect(),
                        });
                    }
                }
                out
            })
            .collect()
    }
}
