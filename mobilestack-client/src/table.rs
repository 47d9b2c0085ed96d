//! Typed CRUD against one remote table.
//!
//! Every operation is a single request with no retries. The blocking forms
//! run on the caller's thread; the `_async` forms run the same blocking call
//! on the service's worker pool and deliver the outcome exactly once through
//! a callback, and the `submit_` forms return a [`Pending`] instead.

use crate::dispatch::{ExecutionContext, Pending};
use crate::error::{ClientResult, Operation, OperationError};
use crate::query::Query;
use crate::service::ServiceInner;
use crate::transport::{HttpRequest, HttpResponse, Method};
use mobilestack_model::mapper::coerce;
use mobilestack_model::{EntitySchema, KEY_COLUMN, TableEntity, ValueType, decode, encode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Client for the table an entity type maps to.
pub struct Table<E: TableEntity> {
    service: Arc<ServiceInner>,
    schema: Arc<EntitySchema<E>>,
}

impl<E: TableEntity> Clone for Table<E> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<E: TableEntity> Table<E> {
    pub(crate) fn new(service: Arc<ServiceInner>, schema: Arc<EntitySchema<E>>) -> Self {
        Self { service, schema }
    }

    pub fn schema(&self) -> &EntitySchema<E> {
        &self.schema
    }

    pub(crate) fn service(&self) -> Arc<ServiceInner> {
        self.service.clone()
    }

    /// `{base}/tables/{table}`
    pub fn url(&self) -> String {
        format!(
            "{}/tables/{}",
            self.service.config.service_url,
            urlencoding::encode(self.schema.table_name())
        )
    }

    fn row_url(&self, id: i64) -> String {
        format!("{}/{id}", self.url())
    }

    /// Starts a select query against this table.
    pub fn query(&self) -> Query<E> {
        Query::new(self.clone())
    }

    // ── Blocking operations ──

    /// Inserts `entity` and writes the server-assigned id into its key.
    pub fn insert(&self, entity: &mut E) -> ClientResult<()> {
        let body = Value::Object(encode(&self.schema, entity, false)?).to_string();
        let url = self.url();
        debug!(table = self.schema.table_name(), %url, "inserting row");

        let request = HttpRequest::new(Method::Post, url).json_headers().body(body);
        let response = self.service.send(Operation::Insert, request)?;
        let id = assigned_id(&response)?;
        self.schema.set_key(entity, id)?;

        info!(table = self.schema.table_name(), id, "row inserted");
        Ok(())
    }

    /// Sends the full state of an already inserted entity.
    pub fn update(&self, entity: &E) -> ClientResult<()> {
        let id = self.schema.require_key(entity)?;
        let body = Value::Object(encode(&self.schema, entity, true)?).to_string();
        let url = self.row_url(id);
        debug!(table = self.schema.table_name(), %url, "updating row");

        let request = HttpRequest::new(Method::Patch, url).json_headers().body(body);
        self.service.send(Operation::Update, request)?;

        info!(table = self.schema.table_name(), id, "row updated");
        Ok(())
    }

    /// Deletes the row behind an already inserted entity.
    pub fn delete(&self, entity: &E) -> ClientResult<()> {
        let id = self.schema.require_key(entity)?;
        let url = self.row_url(id);
        debug!(table = self.schema.table_name(), %url, "deleting row");

        self.service
            .send(Operation::Delete, HttpRequest::new(Method::Delete, url))?;

        info!(table = self.schema.table_name(), id, "row deleted");
        Ok(())
    }

    /// Fetches every row of the table.
    pub fn select_all(&self) -> ClientResult<Vec<E>> {
        self.fetch(self.url())
    }

    /// Runs a select against an already compiled URL.
    pub(crate) fn fetch(&self, url: String) -> ClientResult<Vec<E>> {
        debug!(table = self.schema.table_name(), %url, "selecting rows");
        let request = HttpRequest::new(Method::Get, url).json_headers();
        let response = self.service.send(Operation::Select, request)?;

        let parsed: Value = serde_json::from_str(&response.body).map_err(|e| {
            OperationError::malformed(
                Operation::Select,
                response.status,
                "response body is not JSON",
                Some(Box::new(e)),
            )
        })?;
        let Value::Array(rows) = parsed else {
            return Err(OperationError::malformed(
                Operation::Select,
                response.status,
                "expected a JSON array of rows",
                None,
            )
            .into());
        };

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push(decode(&self.schema, row)?);
        }
        debug!(table = self.schema.table_name(), rows = entities.len(), "select complete");
        Ok(entities)
    }

    // ── Callback operations ──

    /// Inserts on the worker pool; the callback receives the entity with its
    /// key assigned.
    pub fn insert_async<F>(&self, entity: E, context: Option<Arc<dyn ExecutionContext>>, callback: F)
    where
        F: FnOnce(ClientResult<E>) + Send + 'static,
    {
        self.service.pool.dispatch(
            Operation::Insert,
            self.clone(),
            move |table| {
                let mut entity = entity;
                table.insert(&mut entity)?;
                Ok(entity)
            },
            context,
            callback,
        );
    }

    pub fn update_async<F>(&self, entity: E, context: Option<Arc<dyn ExecutionContext>>, callback: F)
    where
        F: FnOnce(ClientResult<E>) + Send + 'static,
    {
        self.service.pool.dispatch(
            Operation::Update,
            self.clone(),
            move |table| table.update(&entity).map(|()| entity),
            context,
            callback,
        );
    }

    pub fn delete_async<F>(&self, entity: E, context: Option<Arc<dyn ExecutionContext>>, callback: F)
    where
        F: FnOnce(ClientResult<()>) + Send + 'static,
    {
        self.service.pool.dispatch(
            Operation::Delete,
            self.clone(),
            move |table| table.delete(&entity),
            context,
            callback,
        );
    }

    pub fn select_all_async<F>(&self, context: Option<Arc<dyn ExecutionContext>>, callback: F)
    where
        F: FnOnce(ClientResult<Vec<E>>) + Send + 'static,
    {
        self.service.pool.dispatch(
            Operation::Select,
            self.clone(),
            Table::select_all,
            context,
            callback,
        );
    }

    // ── Pending operations ──

    pub fn submit_insert(&self, entity: E) -> Pending<E> {
        self.service
            .pool
            .submit(Operation::Insert, self.clone(), move |table| {
                let mut entity = entity;
                table.insert(&mut entity)?;
                Ok(entity)
            })
    }

    pub fn submit_update(&self, entity: E) -> Pending<E> {
        self.service.pool.submit(Operation::Update, self.clone(), move |table| {
            table.update(&entity).map(|()| entity)
        })
    }

    pub fn submit_delete(&self, entity: E) -> Pending<()> {
        self.service
            .pool
            .submit(Operation::Delete, self.clone(), move |table| table.delete(&entity))
    }

    pub fn submit_select_all(&self) -> Pending<Vec<E>> {
        self.service
            .pool
            .submit(Operation::Select, self.clone(), Table::select_all)
    }
}

fn assigned_id(response: &HttpResponse) -> ClientResult<i64> {
    let malformed = |detail: &str, source: Option<Box<dyn std::error::Error + Send + Sync>>| {
        OperationError::malformed(Operation::Insert, response.status, detail, source)
    };

    let parsed: Value = serde_json::from_str(&response.body)
        .map_err(|e| malformed("response body is not JSON", Some(Box::new(e))))?;
    let raw = parsed
        .get(KEY_COLUMN)
        .ok_or_else(|| malformed("response carries no id", None))?;
    let id = coerce(KEY_COLUMN, ValueType::Int64, raw)
        .map_err(|e| malformed("response id is not an integer", Some(Box::new(e))))?;
    id.as_i64()
        .ok_or_else(|| malformed("response id is not an integer", None).into())
}
