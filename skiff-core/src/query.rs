use crate::{
    Adapter, CallOptions, ColumnRef, EntitySet, Error, FilterExpr, Ordered, Record, Result,
};

/// One `$select` entry: a typed column with its output name, or a raw field
/// name for the untyped fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Typed { output: String, column: ColumnRef },
    Raw(String),
}

/// One `$expand` entry with its recursively nested sub-query.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub relation: String,
    pub nested: QueryState,
}

/// Accumulated builder state for one query against one table.
///
/// Mutated only through the chainable methods below; rendered to a query
/// string on demand and never persisted.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub select: Vec<Selection>,
    pub filter: Option<FilterExpr>,
    pub order: Vec<Ordered>,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: bool,
    pub expand: Vec<Expansion>,
}

impl QueryState {
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
            && self.filter.is_none()
            && self.order.is_empty()
            && self.top.is_none()
            && self.skip.is_none()
            && !self.count
            && self.expand.is_empty()
    }

    /// Select typed columns under their declared names.
    pub fn select(mut self, columns: impl IntoIterator<Item = ColumnRef>) -> Self {
        self.select.extend(columns.into_iter().map(|column| Selection::Typed {
            output: column.name.clone(),
            column,
        }));
        self
    }

    /// Select typed columns under caller chosen output names.
    pub fn select_as<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = (S, ColumnRef)>,
    ) -> Self {
        self.select
            .extend(columns.into_iter().map(|(output, column)| Selection::Typed {
                output: output.into(),
                column,
            }));
        self
    }

    /// Untyped fallback: select plain field names.
    pub fn select_raw<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.select
            .extend(names.into_iter().map(|name| Selection::Raw(name.into())));
        self
    }

    /// Add a filter; repeated calls combine under `and`.
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add a filter combined with the existing one under `or`.
    pub fn or_filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.or(expr),
            None => expr,
        });
        self
    }

    pub fn order_by(mut self, items: impl IntoIterator<Item = Ordered>) -> Self {
        self.order.extend(items);
        self
    }

    pub fn top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Request the service reported found count alongside the page.
    pub fn include_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Expand a relation without configuring the nested query.
    pub fn expand(mut self, relation: impl Into<String>) -> Self {
        self.expand.push(Expansion {
            relation: relation.into(),
            nested: QueryState::default(),
        });
        self
    }

    /// Expand a relation, configuring the nested sub-query through the
    /// callback. Nesting recurses to arbitrary depth.
    pub fn expand_with(
        mut self,
        relation: impl Into<String>,
        configure: impl FnOnce(QueryState) -> QueryState,
    ) -> Self {
        self.expand.push(Expansion {
            relation: relation.into(),
            nested: configure(QueryState::default()),
        });
        self
    }
}

/// Fluent query plan over one table, bound to the entity set that created it.
///
/// Configuration methods chain in any order; execution methods are terminal
/// and consume the builder, so a builder runs exactly once.
pub struct QueryBuilder<'a, A: Adapter> {
    set: &'a EntitySet<'a, A>,
    state: QueryState,
    options: CallOptions,
}

impl<'a, A: Adapter> QueryBuilder<'a, A> {
    pub(crate) fn new(set: &'a EntitySet<'a, A>) -> Self {
        Self {
            set,
            state: QueryState::default(),
            options: set.call_options().clone(),
        }
    }

    pub fn select(mut self, columns: impl IntoIterator<Item = ColumnRef>) -> Self {
        self.state = self.state.select(columns);
        self
    }

    pub fn select_as<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = (S, ColumnRef)>,
    ) -> Self {
        self.state = self.state.select_as(columns);
        self
    }

    pub fn select_raw<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.state = self.state.select_raw(names);
        self
    }

    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.state = self.state.filter(expr);
        self
    }

    pub fn or_filter(mut self, expr: FilterExpr) -> Self {
        self.state = self.state.or_filter(expr);
        self
    }

    pub fn order_by(mut self, items: impl IntoIterator<Item = Ordered>) -> Self {
        self.state = self.state.order_by(items);
        self
    }

    pub fn top(mut self, top: u64) -> Self {
        self.state = self.state.top(top);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.state = self.state.skip(skip);
        self
    }

    pub fn expand(mut self, relation: impl Into<String>) -> Self {
        self.state = self.state.expand(relation);
        self
    }

    pub fn expand_with(
        mut self,
        relation: impl Into<String>,
        configure: impl FnOnce(QueryState) -> QueryState,
    ) -> Self {
        self.state = self.state.expand_with(relation, configure);
        self
    }

    /// Override the call options for this execution.
    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// The query string exactly as execution would send it.
    pub fn render(&self) -> String {
        self.set.render_query(&self.state)
    }

    /// Fetch all matched records, subject to `top`/`skip`.
    ///
    /// When the service reports more matches than it returned and neither
    /// `top` nor `skip` was set, a non fatal warning advises [`Self::list_all`].
    pub async fn list(self) -> Result<Vec<Record>> {
        let Self {
            set,
            mut state,
            options,
        } = self;
        set.check_expansions(&state, &options).await?;
        state.count = true;
        let envelope = set.fetch_page(&state, &options).await?;
        if let Some(found) = envelope.count {
            let returned = envelope.records.len() as u64;
            if returned < found && state.top.is_none() && state.skip.is_none() {
                log::warn!(
                    "Query on `{}` matched {found} records but the service returned {returned}; use list_all to page through the whole set",
                    set.schema().name()
                );
            }
        }
        envelope
            .records
            .iter()
            .map(|wire| Record::from_wire(set.schema(), &state.select, wire))
            .collect()
    }

    /// Fetch every matched record by re-issuing the query with an advancing
    /// `$skip` until the running total reaches the service reported found
    /// count. An empty page is a defensive stop.
    pub async fn list_all(self) -> Result<Vec<Record>> {
        let Self {
            set,
            mut state,
            options,
        } = self;
        set.check_expansions(&state, &options).await?;
        state.count = true;
        let base_skip = state.skip.unwrap_or(0);
        state.skip = Some(base_skip);
        let mut records = Vec::new();
        loop {
            let envelope = set.fetch_page(&state, &options).await?;
            if envelope.records.is_empty() {
                break;
            }
            for wire in &envelope.records {
                records.push(Record::from_wire(set.schema(), &state.select, wire)?);
            }
            let Some(found) = envelope.count else {
                break;
            };
            if records.len() as u64 >= found {
                break;
            }
            state.skip = Some(base_skip + records.len() as u64);
        }
        Ok(records)
    }

    /// Expect exactly one matched record.
    pub async fn single(self) -> Result<Record> {
        let (set, state, records) = self.probe_single().await?;
        match records.len() {
            0 => Err(Error::not_found(format!(
                "query on `{}` matched no record",
                set.schema().name()
            ))),
            1 => Record::from_wire(set.schema(), &state.select, &records[0]),
            _ => Err(Error::cardinality(format!(
                "query on `{}` matched more than one record",
                set.schema().name()
            ))),
        }
    }

    /// Expect zero or one matched record.
    pub async fn maybe_single(self) -> Result<Option<Record>> {
        let (set, state, records) = self.probe_single().await?;
        match records.len() {
            0 => Ok(None),
            1 => Record::from_wire(set.schema(), &state.select, &records[0]).map(Some),
            _ => Err(Error::cardinality(format!(
                "query on `{}` matched more than one record",
                set.schema().name()
            ))),
        }
    }

    /// Count matching records without fetching them.
    pub async fn count(self) -> Result<u64> {
        let Self {
            set,
            state,
            options,
        } = self;
        let filter = state.filter.as_ref().map(|f| set.render_filter(f));
        set.adapter()
            .count_records(set.schema().wire_name(), filter.as_deref(), &options)
            .await
    }

    async fn probe_single(
        self,
    ) -> Result<(&'a EntitySet<'a, A>, QueryState, Vec<crate::WireRecord>)> {
        let Self {
            set,
            mut state,
            options,
        } = self;
        set.check_expansions(&state, &options).await?;
        // Two records are enough to detect a cardinality violation.
        if state.top.is_none() {
            state.top = Some(2);
        }
        let envelope = set.fetch_page(&state, &options).await?;
        Ok((set, state, envelope.records))
    }
}
