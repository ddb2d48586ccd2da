use crate::{ColumnRef, Error, ErrorDetail, FieldDef, FieldKind, Record, Result};
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// What `$select` defaults to when the builder was given no selection.
#[derive(Clone, Default)]
pub enum SelectPolicy {
    /// No `$select` clause, the service decides.
    #[default]
    All,
    /// Select exactly the declared fields.
    SchemaOnly,
    /// Caller-provided projection over the declared schema.
    Custom(Arc<dyn Fn(&TableSchema) -> Vec<String> + Send + Sync>),
}

impl Debug for SelectPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectPolicy::All => "All",
            SelectPolicy::SchemaOnly => "SchemaOnly",
            SelectPolicy::Custom(..) => "Custom",
        })
    }
}

/// Field description handed to the adapter's schema mutation operations.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub nullable: bool,
    pub primary: bool,
}

/// Named table description assembled from field declarations.
///
/// Declared once, immutable afterwards; the single source of column refs and
/// of the read/write validation schemas derived from the declaration.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    wire_id: Option<String>,
    fields: Vec<(String, FieldDef)>,
    relations: BTreeSet<String>,
    select_policy: SelectPolicy,
}

impl TableSchema {
    pub fn declare(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            wire_id: None,
            fields: Vec::new(),
            relations: BTreeSet::new(),
            select_policy: SelectPolicy::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table identifier used on the wire.
    pub fn wire_name(&self) -> &str {
        self.wire_id.as_deref().unwrap_or(&self.name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find_map(|(n, def)| (n == name).then_some(def))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Wire identifier of a declared field.
    pub fn wire_field_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.field(name)
            .map(|def| def.wire_id_ref().unwrap_or(name))
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(String::as_str)
    }

    pub fn declares_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }

    pub fn select_policy(&self) -> &SelectPolicy {
        &self.select_policy
    }

    /// Column ref for one declared field.
    pub fn column(&self, name: &str) -> Result<ColumnRef> {
        let def = self.field(name).ok_or_else(|| {
            Error::validation(format!(
                "table `{}` does not declare a field `{name}`",
                self.name
            ))
        })?;
        Ok(ColumnRef {
            name: name.to_owned(),
            wire: def.wire_id_ref().unwrap_or(name).to_owned(),
            table: self.name.clone(),
            table_wire: self.wire_name().to_owned(),
            kind: def.kind(),
        })
    }

    /// Column refs for every declared field, in declaration order.
    pub fn columns(&self) -> Vec<ColumnRef> {
        self.fields
            .iter()
            .map(|(name, def)| ColumnRef {
                name: name.clone(),
                wire: def.wire_id_ref().unwrap_or(name).to_owned(),
                table: self.name.clone(),
                table_wire: self.wire_name().to_owned(),
                kind: def.kind(),
            })
            .collect()
    }

    /// The declared primary key, if any.
    pub fn primary_key(&self) -> Option<(&str, &FieldDef)> {
        self.fields
            .iter()
            .find_map(|(n, d)| d.is_primary_key().then_some((n.as_str(), d)))
    }

    /// Primary key column, required by composite filter-addressed writes.
    pub fn key_column(&self) -> Result<ColumnRef> {
        let (name, _) = self.primary_key().ok_or_else(|| {
            Error::validation(format!(
                "table `{}` declares no primary key field",
                self.name
            ))
        })?;
        self.column(name)
    }

    /// Field specs for the adapter's create-table / add-fields operations.
    pub fn field_specs(&self) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .filter(|(_, def)| def.kind() != FieldKind::Calculated)
            .map(|(name, def)| FieldSpec {
                name: def.wire_id_ref().unwrap_or(name).to_owned(),
                kind: def.kind().wire_name().to_owned(),
                nullable: def.is_nullable(),
                primary: def.is_primary_key(),
            })
            .collect()
    }

    /// Check a write payload against the declaration and produce the JSON
    /// body, applying write transforms.
    ///
    /// All issues are gathered before failing so the caller sees the complete
    /// mismatch in one report. With `creating` set, every required field must
    /// be present.
    pub fn validate_write(
        &self,
        record: &Record,
        creating: bool,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut body = serde_json::Map::new();
        let mut issues = Vec::new();
        for (name, value) in record.iter() {
            let Some(def) = self.field(name) else {
                issues.push(
                    ErrorDetail::new(format!("field `{name}` is not declared"))
                        .with_target(name.to_owned()),
                );
                continue;
            };
            if def.is_read_only() {
                issues.push(
                    ErrorDetail::new(format!("field `{name}` is read only"))
                        .with_target(name.to_owned()),
                );
                continue;
            }
            if !def.is_nullable() && value.is_null() {
                issues.push(
                    ErrorDetail::new(format!("field `{name}` is not nullable"))
                        .with_target(name.to_owned()),
                );
                continue;
            }
            if !value.matches_kind(def.kind()) {
                issues.push(
                    ErrorDetail::new(format!(
                        "field `{name}` expects a {} value",
                        def.kind()
                    ))
                    .with_target(name.to_owned()),
                );
                continue;
            }
            match def.apply_write(value.clone()) {
                Ok(value) => {
                    let wire = def.wire_id_ref().unwrap_or(name);
                    body.insert(wire.to_owned(), value.to_json());
                }
                Err(error) => {
                    issues.push(ErrorDetail::new(error.message).with_target(name.to_owned()));
                }
            }
        }
        if creating {
            for (name, def) in self.fields() {
                if def.is_required() && record.get(name).is_none() {
                    issues.push(
                        ErrorDetail::new(format!("required field `{name}` is missing"))
                            .with_target(name.to_owned()),
                    );
                }
            }
        }
        if issues.is_empty() {
            Ok(body)
        } else {
            Err(Error::validation(format!(
                "write payload for table `{}` failed validation",
                self.name
            ))
            .with_details(issues))
        }
    }
}

/// Assembles a [`TableSchema`], rejecting invalid declarations on `build`.
pub struct TableBuilder {
    name: String,
    wire_id: Option<String>,
    fields: Vec<(String, FieldDef)>,
    relations: BTreeSet<String>,
    select_policy: SelectPolicy,
}

impl TableBuilder {
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.push((name.into(), def));
        self
    }

    pub fn wire_id(mut self, wire_id: impl Into<String>) -> Self {
        self.wire_id = Some(wire_id.into());
        self
    }

    /// Declare a navigable relation. The name is checked against the
    /// service's relationship metadata at call time, not here.
    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.relations.insert(name.into());
        self
    }

    pub fn select_policy(mut self, policy: SelectPolicy) -> Self {
        self.select_policy = policy;
        self
    }

    pub fn build(self) -> Result<TableSchema> {
        let mut seen = BTreeSet::new();
        for (name, def) in &self.fields {
            if !seen.insert(name.as_str()) {
                return Err(Error::validation(format!(
                    "table `{}` declares field `{name}` twice",
                    self.name
                )));
            }
            if def.is_primary_key() && def.is_nullable() {
                return Err(Error::validation(format!(
                    "primary key field `{name}` of table `{}` cannot be nullable",
                    self.name
                )));
            }
        }
        Ok(TableSchema {
            name: self.name,
            wire_id: self.wire_id,
            fields: self.fields,
            relations: self.relations,
            select_policy: self.select_policy,
        })
    }
}
