//! ORM entry point
//!
//! [`Orm`] ties the model registry to a shared session and provides the bulk
//! query operations. Records created through it share the same session.

use serde_json::Value;
use std::sync::Arc;

use crate::config::OrmConfig;
use crate::error::{OrmError, Result, TransportError};
use crate::model::{ModelDescriptor, ModelRegistry};
use crate::record::Record;
use crate::response::{self, Row};
use crate::session::SessionManager;
use crate::soql;
use crate::transport::Transport;

/// Outcome of a raw statement: the transport error and the raw result are
/// both handed back for the caller to interpret
#[derive(Debug, Clone, Default)]
pub struct RawQuery {
    pub error: Option<TransportError>,
    pub result: Option<Value>,
}

impl RawQuery {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The raw result, or the transport error if one occurred
    pub fn into_result(self) -> std::result::Result<Value, TransportError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Model registry and query orchestration over one shared session
#[derive(Debug)]
pub struct Orm {
    session: Arc<SessionManager>,
    registry: ModelRegistry,
}

impl Orm {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::from_session(Arc::new(SessionManager::new(transport)))
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: &OrmConfig) -> Self {
        Self::from_session(Arc::new(SessionManager::with_config(transport, config)))
    }

    /// Build an ORM around an existing session context
    pub fn from_session(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            registry: ModelRegistry::new(),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Register a model, returning false if the name is already taken
    pub fn add_model(&self, descriptor: ModelDescriptor) -> bool {
        self.registry.register(descriptor)
    }

    pub fn model(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.registry.resolve(name)
    }

    /// Create an empty record of a registered model
    pub fn new_record(&self, model_name: &str) -> Result<Record> {
        let model = self.require_model(model_name)?;
        Ok(Record::new(model, self.session.clone()))
    }

    /// Create a record of a registered model from an existing row
    pub fn instance_existing(&self, model_name: &str, row: &Row) -> Result<Record> {
        let model = self.require_model(model_name)?;
        Ok(Record::from_row(model, self.session.clone(), row, &[]))
    }

    /// Escape text for use inside a single-quoted SOQL literal
    pub fn escape(&self, text: &str) -> String {
        soql::escape(text)
    }

    /// Run a caller-supplied statement as-is
    ///
    /// Only a session failure is returned as `Err`; transport failures come
    /// back inside [`RawQuery`].
    pub async fn query(&self, statement: &str) -> Result<RawQuery> {
        let client = self.session.ensure_ready().await?;
        let statement = self.session.transport().format_query(statement);
        log::debug!("Running query: {}", statement);

        Ok(match client.query_all(&statement).await {
            Ok(result) => RawQuery {
                error: None,
                result: Some(result),
            },
            Err(err) => {
                log::warn!("Query failed: {}", err);
                RawQuery {
                    result: err.payload.clone(),
                    error: Some(err),
                }
            }
        })
    }

    /// Find records of a model matching a where clause
    ///
    /// The where clause is used verbatim; escape literal values with
    /// [`escape`](Orm::escape). `extra_fields` are selected in addition to the
    /// model's fields and kept on the returned records.
    pub async fn search(
        &self,
        model_name: &str,
        where_clause: &str,
        extra_fields: &[String],
    ) -> Result<Vec<Record>> {
        let model = self.require_model(model_name)?;
        let statement = soql::search_statement(&model, where_clause, extra_fields);

        let client = self.session.ensure_ready().await?;
        let statement = self.session.transport().format_query(&statement);
        log::debug!("Searching {}: {}", model.name, statement);

        let response = client.query_all(&statement).await?;
        let rows = response::completed_rows(&response)?;

        let extras = soql::extra_projection(&model, extra_fields);
        let records: Vec<Record> = rows
            .iter()
            .map(|row| Record::from_row(model.clone(), self.session.clone(), row, &extras))
            .collect();

        log::info!("Search on {} returned {} records", model.name, records.len());
        Ok(records)
    }

    fn require_model(&self, name: &str) -> Result<Arc<ModelDescriptor>> {
        self.registry
            .resolve(name)
            .ok_or_else(|| OrmError::UnknownModel(name.to_string()))
    }
}
