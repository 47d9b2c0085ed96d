//! Fluent select queries.
//!
//! A [`Query`] collects comparisons, paging and ordering for one select and
//! compiles them into the service's URL syntax:
//!
//! ```text
//! {base}/tables/listing?$filter=((bedrooms%20eq%202)%20and%20(footage%20gt%201337))&$top=10
//! ```
//!
//! Comparisons are always ANDed. A second comparison on the same column
//! replaces the first.

use crate::dispatch::{ExecutionContext, Pending};
use crate::error::{ClientResult, Operation, QueryError, QueryResult};
use crate::table::Table;
use mobilestack_model::{TableEntity, ValueType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Comparison operator of a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "eq",
            Comparison::Gt => "gt",
            Comparison::Lt => "lt",
        }
    }
}

/// A literal compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Integer(v) => write!(f, "{v}"),
            QueryValue::Float(v) => write!(f, "{v}"),
            QueryValue::Bool(v) => write!(f, "{v}"),
            QueryValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Integer(i64::from(v))
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Integer(v)
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Integer(i64::from(v))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Text(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Predicate {
    comparison: Comparison,
    value: QueryValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Ordering {
    Ascending(Vec<String>),
    Descending(Vec<String>),
}

/// A select against one table, built up fluently and run with
/// [`select`](Self::select) or one of its async forms.
pub struct Query<E: TableEntity> {
    table: Table<E>,
    predicates: BTreeMap<String, Predicate>,
    top: Option<u32>,
    skip: Option<u32>,
    ordering: Option<Ordering>,
}

impl<E: TableEntity> Query<E> {
    pub(crate) fn new(table: Table<E>) -> Self {
        Self {
            table,
            predicates: BTreeMap::new(),
            top: None,
            skip: None,
            ordering: None,
        }
    }

    pub fn equal(self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.compare(column.into(), Comparison::Eq, value.into())
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.compare(column.into(), Comparison::Gt, value.into())
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.compare(column.into(), Comparison::Lt, value.into())
    }

    fn compare(mut self, column: String, comparison: Comparison, value: QueryValue) -> Self {
        self.predicates
            .insert(column, Predicate { comparison, value });
        self
    }

    /// Limits the number of rows returned. May be set once.
    pub fn top(mut self, rows: u32) -> QueryResult<Self> {
        if let Some(existing) = self.top {
            return Err(QueryError::TopAlreadySet(existing));
        }
        self.top = Some(rows);
        Ok(self)
    }

    /// Skips leading rows. May be set once.
    pub fn skip(mut self, rows: u32) -> QueryResult<Self> {
        if let Some(existing) = self.skip {
            return Err(QueryError::SkipAlreadySet(existing));
        }
        self.skip = Some(rows);
        Ok(self)
    }

    /// Orders ascending by the given columns.
    pub fn order_by<I, S>(self, columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_ordering(Ordering::Ascending(columns.into_iter().map(Into::into).collect()))
    }

    /// Orders descending by the given columns.
    pub fn order_by_desc<I, S>(self, columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_ordering(Ordering::Descending(columns.into_iter().map(Into::into).collect()))
    }

    fn set_ordering(mut self, ordering: Ordering) -> QueryResult<Self> {
        match (&self.ordering, &ordering) {
            (None, _) => {
                self.ordering = Some(ordering);
                Ok(self)
            }
            (Some(Ordering::Ascending(_)), Ordering::Ascending(_)) => {
                Err(QueryError::OrderAlreadySet("orderby"))
            }
            (Some(Ordering::Descending(_)), Ordering::Descending(_)) => {
                Err(QueryError::OrderAlreadySet("orderby desc"))
            }
            _ => Err(QueryError::MixedOrdering),
        }
    }

    /// Compiles the query into the URL the select is sent to.
    ///
    /// Paging and ordering only accompany a filter. A query without
    /// predicates compiles to the bare table URL, though its order columns
    /// are still checked.
    pub fn build_url(&self) -> QueryResult<String> {
        let (columns, descending) = match &self.ordering {
            Some(Ordering::Ascending(columns)) => (columns.as_slice(), false),
            Some(Ordering::Descending(columns)) => (columns.as_slice(), true),
            None => (&[][..], false),
        };
        for column in columns {
            self.column_type(column)?;
        }

        let base = self.table.url();
        if self.predicates.is_empty() {
            if self.top.is_some() || self.skip.is_some() || !columns.is_empty() {
                debug!(
                    table = self.table.schema().table_name(),
                    "query has no filter, ignoring paging and ordering"
                );
            }
            return Ok(base);
        }

        let mut terms = Vec::with_capacity(self.predicates.len());
        for (column, predicate) in &self.predicates {
            let column_type = self.column_type(column)?;
            terms.push(format!(
                "({}%20{}%20{})",
                urlencoding::encode(column),
                predicate.comparison.as_str(),
                render_value(&predicate.value, column_type),
            ));
        }
        let mut segments = vec![format!("$filter=({})", terms.join("%20and%20"))];

        if let Some(top) = self.top {
            segments.push(format!("$top={top}"));
        }
        if let Some(skip) = self.skip {
            segments.push(format!("$skip={skip}"));
        }
        if !columns.is_empty() {
            let rendered: Vec<String> = columns
                .iter()
                .map(|column| {
                    let mut term = urlencoding::encode(column).into_owned();
                    if descending {
                        term.push_str("%20desc");
                    }
                    term
                })
                .collect();
            segments.push(format!("$orderby={}", rendered.join(",")));
        }

        Ok(format!("{base}?{}", segments.join("&")))
    }

    fn column_type(&self, column: &str) -> QueryResult<ValueType> {
        let schema = self.table.schema();
        schema
            .column_type(column)
            .ok_or_else(|| QueryError::UnknownColumn {
                table: schema.table_name().to_string(),
                column: column.to_string(),
            })
    }

    /// Runs the query, blocking until the rows arrive.
    pub fn select(self) -> ClientResult<Vec<E>> {
        self.run()
    }

    fn run(&self) -> ClientResult<Vec<E>> {
        let url = self.build_url()?;
        debug!(table = self.table.schema().table_name(), %url, "executing select");
        self.table.fetch(url)
    }

    /// Runs the query on the worker pool and hands the rows to `callback`.
    pub fn select_async<F>(self, context: Option<Arc<dyn ExecutionContext>>, callback: F)
    where
        F: FnOnce(ClientResult<Vec<E>>) + Send + 'static,
    {
        let service = self.table.service();
        service
            .pool
            .dispatch(Operation::Select, self, Query::run, context, callback);
    }

    /// Runs the query on the worker pool, returning its eventual rows.
    pub fn submit(self) -> Pending<Vec<E>> {
        let service = self.table.service();
        service.pool.submit(Operation::Select, self, Query::run)
    }
}

fn render_value(value: &QueryValue, column_type: ValueType) -> String {
    match column_type {
        ValueType::String => {
            let text = value.to_string().replace('\'', "''");
            format!("'{}'", urlencoding::encode(&text))
        }
        _ => urlencoding::encode(&value.to_string()).into_owned(),
    }
}
