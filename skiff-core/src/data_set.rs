use crate::{
    Adapter, BatchPart, BatchReply, CallOptions, ColumnRef, Envelope, Error, ErrorKind,
    ExecutionStrategy, FieldSpec, FilterExpr, QueryBuilder, QueryState, QueryWriter, Record,
    RecordKey, Result, SelectPolicy, TableInfo, TableSchema, Value, WireRecord,
    writer::{Context, Fragment},
};
use serde_json::Value as Json;

/// Binds an adapter instance to the tables it serves.
///
/// The adapter's connection level configuration is immutable after
/// construction; the options set here are the defaults every derived call
/// starts from.
pub struct Database<A: Adapter> {
    adapter: A,
    options: CallOptions,
}

impl<A: Adapter> Database<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            options: CallOptions::default(),
        }
    }

    /// Default call options for every operation issued through this handle.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Entity set over one declared table.
    pub fn table<'a>(&'a self, schema: &'a TableSchema) -> EntitySet<'a, A> {
        EntitySet {
            adapter: &self.adapter,
            schema,
            options: self.options.clone(),
            strategy: ExecutionStrategy::default(),
        }
    }

    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        self.adapter.list_tables(&self.options).await
    }

    pub async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.adapter
            .create_table(schema.wire_name(), &schema.field_specs(), &self.options)
            .await
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        self.adapter.drop_table(table, &self.options).await
    }

    /// Submit independent sub-requests as one batch.
    pub async fn batch(&self, parts: &[BatchPart]) -> Result<Vec<BatchReply>> {
        self.adapter.execute_batch(parts, &self.options).await
    }

    /// Cross join multiple tables; the result rows are not schema shaped.
    pub async fn cross_join(&self, tables: &[&str], state: QueryState) -> Result<Vec<WireRecord>> {
        let mut query = String::with_capacity(256);
        self.adapter
            .writer()
            .write_query(&mut Context::default(), &mut query, &state);
        Ok(self
            .adapter
            .cross_join(tables, &query, &self.options)
            .await?
            .records)
    }

    /// Run a named remote procedure.
    pub async fn call_procedure(&self, name: &str, parameters: Json) -> Result<Json> {
        self.adapter
            .call_procedure(name, parameters, &self.options)
            .await
    }
}

/// One declared table bound to an adapter: the builder producing entry point
/// and every record addressed operation, consumable without knowledge of the
/// rendered query grammar.
pub struct EntitySet<'a, A: Adapter> {
    adapter: &'a A,
    schema: &'a TableSchema,
    options: CallOptions,
    strategy: ExecutionStrategy,
}

impl<'a, A: Adapter> EntitySet<'a, A> {
    pub fn schema(&self) -> &TableSchema {
        self.schema
    }

    pub fn adapter(&self) -> &A {
        self.adapter
    }

    pub(crate) fn call_options(&self) -> &CallOptions {
        &self.options
    }

    /// Override the call options for operations issued through this set.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Start a query over this table.
    pub fn query(&self) -> QueryBuilder<'_, A> {
        QueryBuilder::new(self)
    }

    /// Fetch one record by key; `Ok(None)` when it does not exist.
    pub async fn get(&self, key: impl Into<RecordKey>) -> Result<Option<Record>> {
        let query = self.render_query(&QueryState::default());
        match self
            .adapter
            .fetch_record(self.schema.wire_name(), &key.into(), &query, &self.options)
            .await?
        {
            Some(wire) => Record::from_wire(self.schema, &[], &wire).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a single field value of one record.
    pub async fn field_value(&self, key: impl Into<RecordKey>, field: &str) -> Result<Value> {
        let def = self.schema.field(field).ok_or_else(|| {
            Error::validation(format!(
                "table `{}` does not declare a field `{field}`",
                self.schema.name()
            ))
        })?;
        let wire_name = def.wire_id_ref().unwrap_or(field);
        let json = self
            .adapter
            .fetch_field_value(self.schema.wire_name(), &key.into(), wire_name, &self.options)
            .await?;
        Value::from_json(def.kind(), &json).and_then(|v| def.apply_read(v))
    }

    pub async fn count(&self) -> Result<u64> {
        self.adapter
            .count_records(self.schema.wire_name(), None, &self.options)
            .await
    }

    pub async fn create(&self, record: Record) -> Result<Record> {
        let body = self.schema.validate_write(&record, true)?;
        let wire = self
            .adapter
            .create_record(self.schema.wire_name(), body, &self.options)
            .await?;
        Record::from_wire(self.schema, &[], &wire)
    }

    /// Patch one record by key and return its new state.
    pub async fn update(&self, key: impl Into<RecordKey>, record: Record) -> Result<Record> {
        let key = key.into();
        let body = self.schema.validate_write(&record, false)?;
        match self
            .adapter
            .update_record(self.schema.wire_name(), &key, body, &self.options)
            .await?
        {
            Some(wire) => Record::from_wire(self.schema, &[], &wire),
            // The service answered 204, read the record back.
            None => self.get(key).await?.ok_or_else(|| {
                Error::not_found(format!(
                    "record vanished from `{}` after the update",
                    self.schema.name()
                ))
            }),
        }
    }

    pub async fn delete(&self, key: impl Into<RecordKey>) -> Result<()> {
        self.adapter
            .delete_record(self.schema.wire_name(), &key.into(), &self.options)
            .await
    }

    /// Delete the first record matching the filter.
    ///
    /// Zero matches is a no-op, not an error; the return value says whether
    /// a record was deleted.
    pub async fn delete_where(&self, filter: FilterExpr) -> Result<bool> {
        let key_column = self.schema.key_column()?;
        match self.first_matching_key(&key_column, filter).await? {
            Some(key) => {
                self.adapter
                    .delete_record(self.schema.wire_name(), &key, &self.options)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete every record matching the filter, one wire call per record.
    ///
    /// A failed individual delete does not abort the remaining deletions; it
    /// is only reflected in the returned success count.
    pub async fn delete_all_where(&self, filter: FilterExpr) -> Result<u64> {
        let key_column = self.schema.key_column()?;
        let keys = self.matching_keys(&key_column, filter).await?;
        let mut deleted = 0;
        match self.strategy {
            ExecutionStrategy::Sequential => {
                for key in keys {
                    match self
                        .adapter
                        .delete_record(self.schema.wire_name(), &key, &self.options)
                        .await
                    {
                        Ok(()) => deleted += 1,
                        Err(error) => log::warn!(
                            "Skipping failed delete of `{}` record {key:?}: {error}",
                            self.schema.name()
                        ),
                    }
                }
            }
        }
        Ok(deleted)
    }

    /// Patch the first record matching the filter and return its new state.
    ///
    /// Zero matches, or the record disappearing between the find and the
    /// patch, answers `Ok(None)`; any other failure propagates.
    pub async fn update_where(
        &self,
        filter: FilterExpr,
        record: Record,
    ) -> Result<Option<Record>> {
        let body = self.schema.validate_write(&record, false)?;
        let key_column = self.schema.key_column()?;
        let Some(key) = self.first_matching_key(&key_column, filter).await? else {
            return Ok(None);
        };
        match self
            .adapter
            .update_record(self.schema.wire_name(), &key, body, &self.options)
            .await
        {
            Ok(_) => {}
            Err(error) if error.is_kind(ErrorKind::NotFound) => return Ok(None),
            Err(error) => return Err(error),
        }
        let query = self.render_query(&QueryState::default());
        match self
            .adapter
            .fetch_record(self.schema.wire_name(), &key, &query, &self.options)
            .await?
        {
            Some(wire) => Record::from_wire(self.schema, &[], &wire).map(Some),
            None => Ok(None),
        }
    }

    /// Patch every record matching the filter, one wire call per record.
    /// Individual failures are reflected only in the success count.
    pub async fn update_all_where(&self, filter: FilterExpr, record: Record) -> Result<u64> {
        let body = self.schema.validate_write(&record, false)?;
        let key_column = self.schema.key_column()?;
        let keys = self.matching_keys(&key_column, filter).await?;
        let mut updated = 0;
        match self.strategy {
            ExecutionStrategy::Sequential => {
                for key in keys {
                    match self
                        .adapter
                        .update_record(self.schema.wire_name(), &key, body.clone(), &self.options)
                        .await
                    {
                        Ok(_) => updated += 1,
                        Err(error) => log::warn!(
                            "Skipping failed update of `{}` record {key:?}: {error}",
                            self.schema.name()
                        ),
                    }
                }
            }
        }
        Ok(updated)
    }

    /// Fetch the records related through a navigable relation.
    pub async fn navigate(
        &self,
        key: impl Into<RecordKey>,
        relation: &str,
    ) -> Result<Vec<WireRecord>> {
        self.navigate_query(key, relation, QueryState::default())
            .await
    }

    /// Like [`Self::navigate`] with a sub-query over the related records.
    pub async fn navigate_query(
        &self,
        key: impl Into<RecordKey>,
        relation: &str,
        state: QueryState,
    ) -> Result<Vec<WireRecord>> {
        self.check_relation(relation, &self.options).await?;
        let mut query = String::with_capacity(128);
        self.adapter
            .writer()
            .write_query(&mut Context::default(), &mut query, &state);
        Ok(self
            .adapter
            .navigate(
                self.schema.wire_name(),
                &key.into(),
                relation,
                &query,
                &self.options,
            )
            .await?
            .records)
    }

    /// Replace the references of a navigable relation.
    pub async fn update_references(
        &self,
        key: impl Into<RecordKey>,
        relation: &str,
        targets: &[String],
    ) -> Result<()> {
        self.check_relation(relation, &self.options).await?;
        self.adapter
            .update_references(
                self.schema.wire_name(),
                &key.into(),
                relation,
                targets,
                &self.options,
            )
            .await
    }

    pub async fn add_fields(&self, fields: &[FieldSpec]) -> Result<()> {
        self.adapter
            .add_fields(self.schema.wire_name(), fields, &self.options)
            .await
    }

    pub async fn drop_field(&self, field: &str) -> Result<()> {
        let wire_name = self.schema.wire_field_name(field).unwrap_or(field);
        self.adapter
            .drop_field(self.schema.wire_name(), wire_name, &self.options)
            .await
    }

    /// Render builder state, applying the table's default select policy when
    /// the caller made no explicit selection.
    pub(crate) fn render_query(&self, state: &QueryState) -> String {
        let effective;
        let state = if state.select.is_empty() {
            match self.schema.select_policy() {
                SelectPolicy::All => state,
                SelectPolicy::SchemaOnly => {
                    effective = state.clone().select(self.schema.columns());
                    &effective
                }
                SelectPolicy::Custom(project) => {
                    effective = state.clone().select_raw(project(self.schema));
                    &effective
                }
            }
        } else {
            state
        };
        let mut out = String::with_capacity(256);
        self.adapter
            .writer()
            .write_query(&mut Context::default(), &mut out, state);
        out
    }

    pub(crate) fn render_filter(&self, filter: &FilterExpr) -> String {
        let mut out = String::with_capacity(128);
        self.adapter
            .writer()
            .write_filter(&mut Context::new(Fragment::Filter), &mut out, filter);
        out
    }

    pub(crate) async fn fetch_page(
        &self,
        state: &QueryState,
        options: &CallOptions,
    ) -> Result<Envelope> {
        let query = self.render_query(state);
        log::debug!(
            "Fetching `{}` records with {}",
            self.schema.name(),
            crate::printable_query!(query)
        );
        self.adapter
            .fetch_records(self.schema.wire_name(), &query, options)
            .await
    }

    /// Expansion relation names must be declared and confirmed by the
    /// service's relationship metadata before use.
    pub(crate) async fn check_expansions(
        &self,
        state: &QueryState,
        options: &CallOptions,
    ) -> Result<()> {
        if state.expand.is_empty() {
            return Ok(());
        }
        for expansion in &state.expand {
            if !self.schema.declares_relation(&expansion.relation) {
                return Err(Error::validation(format!(
                    "table `{}` does not declare a relation `{}`",
                    self.schema.name(),
                    expansion.relation
                )));
            }
        }
        let metadata = self.adapter.metadata(options).await?;
        for expansion in &state.expand {
            if !metadata.has_relation(self.schema.wire_name(), &expansion.relation) {
                return Err(Error::validation(format!(
                    "the service reports no relation `{}` on table `{}`",
                    expansion.relation,
                    self.schema.name()
                )));
            }
        }
        Ok(())
    }

    async fn check_relation(&self, relation: &str, options: &CallOptions) -> Result<()> {
        if !self.schema.declares_relation(relation) {
            return Err(Error::validation(format!(
                "table `{}` does not declare a relation `{relation}`",
                self.schema.name()
            )));
        }
        let metadata = self.adapter.metadata(options).await?;
        if !metadata.has_relation(self.schema.wire_name(), relation) {
            return Err(Error::validation(format!(
                "the service reports no relation `{relation}` on table `{}`",
                self.schema.name()
            )));
        }
        Ok(())
    }

    async fn first_matching_key(
        &self,
        key_column: &ColumnRef,
        filter: FilterExpr,
    ) -> Result<Option<RecordKey>> {
        let state = QueryState::default()
            .select([key_column.clone()])
            .filter(filter)
            .top(1);
        let envelope = self.fetch_page(&state, &self.options).await?;
        envelope
            .records
            .first()
            .map(|wire| record_key_of(key_column, wire))
            .transpose()
    }

    /// All keys matching the filter, paged through like `list_all`.
    async fn matching_keys(
        &self,
        key_column: &ColumnRef,
        filter: FilterExpr,
    ) -> Result<Vec<RecordKey>> {
        let mut state = QueryState::default()
            .select([key_column.clone()])
            .filter(filter)
            .include_count()
            .skip(0);
        let mut keys = Vec::new();
        loop {
            let envelope = self.fetch_page(&state, &self.options).await?;
            if envelope.records.is_empty() {
                break;
            }
            for wire in &envelope.records {
                keys.push(record_key_of(key_column, wire)?);
            }
            let Some(found) = envelope.count else {
                break;
            };
            if keys.len() as u64 >= found {
                break;
            }
            state.skip = Some(keys.len() as u64);
        }
        Ok(keys)
    }
}

fn record_key_of(key_column: &ColumnRef, wire: &WireRecord) -> Result<RecordKey> {
    let json = wire.get(key_column.wire_name()).ok_or_else(|| {
        Error::validation(format!(
            "key field `{}` is missing from the response",
            key_column.name
        ))
    })?;
    match json {
        Json::String(v) => Ok(RecordKey::Text(v.clone())),
        Json::Number(v) => v.as_i64().map(RecordKey::Int).ok_or_else(|| {
            Error::validation(format!(
                "key field `{}` is not an integral number",
                key_column.name
            ))
        }),
        _ => Err(Error::validation(format!(
            "key field `{}` has an unsupported shape",
            key_column.name
        ))),
    }
}
