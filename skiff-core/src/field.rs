use crate::{Result, Value};
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

/// Semantic type of one table field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Time,
    Timestamp,
    Container,
    /// Server-side computed projection, always read only.
    Calculated,
}

impl FieldKind {
    /// Name used in schema mutation payloads.
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Number => "numeric",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Container => "container",
            FieldKind::Calculated => "calculation",
        }
    }

    /// The typed null for this kind.
    pub fn null_value(&self) -> Value {
        match self {
            FieldKind::Text => Value::Text(None),
            FieldKind::Number => Value::Decimal(None),
            FieldKind::Date => Value::Date(None),
            FieldKind::Time => Value::Time(None),
            FieldKind::Timestamp => Value::Timestamp(None),
            FieldKind::Container => Value::Container(None),
            FieldKind::Calculated => Value::Null,
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Value transform applied when a field crosses the wire boundary.
pub type Transform = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Declarative specification of one table field.
///
/// Constructed once at table declaration time, immutable afterwards.
#[derive(Clone)]
pub struct FieldDef {
    kind: FieldKind,
    nullable: bool,
    primary_key: bool,
    read_only: bool,
    wire_id: Option<String>,
    read_transform: Option<Transform>,
    write_transform: Option<Transform>,
}

impl FieldDef {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: true,
            primary_key: false,
            read_only: matches!(kind, FieldKind::Calculated),
            wire_id: None,
            read_transform: None,
            write_transform: None,
        }
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }
    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }
    pub fn time() -> Self {
        Self::new(FieldKind::Time)
    }
    pub fn timestamp() -> Self {
        Self::new(FieldKind::Timestamp)
    }
    pub fn container() -> Self {
        Self::new(FieldKind::Container)
    }
    pub fn calculated() -> Self {
        Self::new(FieldKind::Calculated)
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// A primary key field is implicitly read only and not nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.read_only = true;
        self.nullable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Stable wire identifier, used instead of the field name on the wire.
    pub fn wire_id(mut self, wire_id: impl Into<String>) -> Self {
        self.wire_id = Some(wire_id.into());
        self
    }

    pub fn on_read(mut self, transform: impl Fn(Value) -> Result<Value> + Send + Sync + 'static) -> Self {
        self.read_transform = Some(Arc::new(transform));
        self
    }

    pub fn on_write(mut self, transform: impl Fn(Value) -> Result<Value> + Send + Sync + 'static) -> Self {
        self.write_transform = Some(Arc::new(transform));
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
    /// Required on create: neither nullable nor populated by the server.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.read_only
    }
    pub fn wire_id_ref(&self) -> Option<&str> {
        self.wire_id.as_deref()
    }

    pub(crate) fn apply_read(&self, value: Value) -> Result<Value> {
        match &self.read_transform {
            Some(transform) => transform(value),
            None => Ok(value),
        }
    }

    pub(crate) fn apply_write(&self, value: Value) -> Result<Value> {
        match &self.write_transform {
            Some(transform) => transform(value),
            None => Ok(value),
        }
    }
}

impl Debug for FieldDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("primary_key", &self.primary_key)
            .field("read_only", &self.read_only)
            .field("wire_id", &self.wire_id)
            .field("read_transform", &self.read_transform.is_some())
            .field("write_transform", &self.write_transform.is_some())
            .finish()
    }
}
