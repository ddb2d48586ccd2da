use crate::{Error, ErrorDetail, FieldKind, Result, Selection, TableSchema, Value};
use serde_json::{Map, Value as Json};

/// Wire level record: the field map of one response entry plus the protocol
/// metadata the service attaches to it. Built fresh on every response and
/// never cached across calls.
#[derive(Debug, Clone, Default)]
pub struct WireRecord {
    pub id: Option<String>,
    pub edit_link: Option<String>,
    pub fields: Map<String, Json>,
}

impl WireRecord {
    pub fn from_json(value: Json) -> Result<Self> {
        let Json::Object(map) = value else {
            return Err(Error::protocol(format!(
                "expected a JSON object record, got `{value}`"
            )));
        };
        let mut record = WireRecord::default();
        for (key, value) in map {
            match key.as_str() {
                "@odata.id" => record.id = value.as_str().map(str::to_owned),
                "@odata.editLink" => record.edit_link = value.as_str().map(str::to_owned),
                k if k.starts_with('@') => {}
                _ => {
                    record.fields.insert(key, value);
                }
            }
        }
        Ok(record)
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.fields.get(name)
    }
}

/// Response wrapper: the record list plus the service reported found count
/// when `$count=true` was requested.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub records: Vec<WireRecord>,
    pub count: Option<u64>,
}

impl Envelope {
    pub fn from_json(value: Json) -> Result<Self> {
        match value {
            Json::Null => Ok(Envelope::default()),
            Json::Object(mut map) => {
                let count = map.get("@odata.count").and_then(Json::as_u64);
                match map.remove("value") {
                    Some(Json::Array(items)) => Ok(Envelope {
                        records: items
                            .into_iter()
                            .map(WireRecord::from_json)
                            .collect::<Result<_>>()?,
                        count,
                    }),
                    // A to-one navigation answers with the bare record.
                    None => Ok(Envelope {
                        records: vec![WireRecord::from_json(Json::Object(map))?],
                        count,
                    }),
                    Some(other) => Err(Error::protocol(format!(
                        "expected a record list in the response envelope, got `{other}`"
                    ))),
                }
            }
            other => Err(Error::protocol(format!(
                "expected a response envelope object, got `{other}`"
            ))),
        }
    }
}

/// Decoded, schema shaped record. Doubles as the write payload builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value for the same name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a wire record against the declared schema.
    ///
    /// With an explicit selection, output names follow the selection (which
    /// is how renaming works); otherwise every declared field present in the
    /// response is decoded. Field level issues are gathered and raised as one
    /// aggregate validation error so the caller sees the complete mismatch.
    pub fn from_wire(
        schema: &TableSchema,
        selection: &[Selection],
        wire: &WireRecord,
    ) -> Result<Record> {
        let mut record = Record::new();
        let mut issues = Vec::new();
        let decode = |record: &mut Record,
                          issues: &mut Vec<ErrorDetail>,
                          output: &str,
                          field: &str| {
            let Some(def) = schema.field(field) else {
                issues.push(
                    ErrorDetail::new(format!("field `{field}` is not declared"))
                        .with_target(field.to_owned()),
                );
                return;
            };
            let wire_name = def.wire_id_ref().unwrap_or(field);
            if let Some(json) = wire.get(wire_name) {
                match Value::from_json(def.kind(), json).and_then(|v| def.apply_read(v)) {
                    Ok(value) => record.insert(output, value),
                    Err(error) => {
                        issues.push(ErrorDetail::new(error.message).with_target(field.to_owned()));
                    }
                }
            }
        };
        if selection.is_empty() {
            for (name, _) in schema.fields() {
                decode(&mut record, &mut issues, name, name);
            }
        } else {
            for entry in selection {
                match entry {
                    Selection::Typed { output, column } => {
                        decode(&mut record, &mut issues, output, &column.name);
                    }
                    Selection::Raw(name) => {
                        if let Some(json) = wire.get(name) {
                            // Untyped fallback, decoded by JSON shape only.
                            match Value::from_json(FieldKind::Calculated, json) {
                                Ok(value) => record.insert(name.clone(), value),
                                Err(error) => issues.push(
                                    ErrorDetail::new(error.message).with_target(name.clone()),
                                ),
                            }
                        }
                    }
                }
            }
        }
        if issues.is_empty() {
            Ok(record)
        } else {
            Err(Error::validation(format!(
                "response record from table `{}` failed validation",
                schema.name()
            ))
            .with_details(issues))
        }
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}
