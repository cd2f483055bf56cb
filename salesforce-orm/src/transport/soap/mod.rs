//! Salesforce SOAP Partner API transport
//!
//! Logs in with username, password and security token, then issues
//! `queryAll`, `create`, `update` and `delete` calls against the server URL
//! returned by the login.

mod envelope;
mod parse;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::config::{Credentials, OrmConfig};
use crate::error::TransportError;
use crate::transport::{IdBatch, RecordBatch, RemoteClient, SessionHandle, Transport};

/// Field listing the names of fields to clear on update
pub const FIELDS_TO_NULL: &str = "fieldsToNull";

/// SOAP transport holding credentials and the login endpoint
pub struct SoapTransport {
    http: reqwest::Client,
    credentials: Credentials,
    login_endpoint: String,
}

impl SoapTransport {
    pub fn new(credentials: Credentials, config: &OrmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            login_endpoint: config.login_endpoint(),
        }
    }

    pub fn login_endpoint(&self) -> &str {
        &self.login_endpoint
    }
}

impl fmt::Debug for SoapTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapTransport")
            .field("credentials", &self.credentials)
            .field("login_endpoint", &self.login_endpoint)
            .finish()
    }
}

#[async_trait]
impl Transport for SoapTransport {
    async fn login(&self) -> Result<SessionHandle, TransportError> {
        log::debug!(
            "Logging in to {} as {}",
            self.login_endpoint,
            self.credentials.username
        );

        let body = envelope::login(&self.credentials.username, &self.credentials.login_password())?;
        let xml = post(&self.http, &self.login_endpoint, "login", body).await?;
        let result = parse::login_result(&xml)?;

        log::debug!("Login succeeded, server URL {}", result.server_url);
        Ok(Arc::new(SoapSession {
            http: self.http.clone(),
            server_url: result.server_url,
            session_id: result.session_id,
        }))
    }

    fn format_query(&self, statement: &str) -> String {
        statement.trim().to_string()
    }

    /// Null values cannot be sent as elements; list them under `fieldsToNull`
    fn format_object(&self, fields: Map<String, Value>, _object_type: &str) -> Map<String, Value> {
        let mut formatted = Map::new();
        let mut to_null = Vec::new();

        for (name, value) in fields {
            if value.is_null() {
                to_null.push(Value::String(name));
            } else {
                formatted.insert(name, value);
            }
        }

        if !to_null.is_empty() {
            formatted.insert(FIELDS_TO_NULL.to_string(), Value::Array(to_null));
        }
        formatted
    }
}

/// An authenticated Partner API session
struct SoapSession {
    http: reqwest::Client,
    server_url: String,
    session_id: String,
}

impl SoapSession {
    async fn call(&self, action: &str, body: String) -> Result<String, TransportError> {
        post(&self.http, &self.server_url, action, body).await
    }
}

#[async_trait]
impl RemoteClient for SoapSession {
    async fn query_all(&self, statement: &str) -> Result<Value, TransportError> {
        let xml = self
            .call("queryAll", envelope::query_all(&self.session_id, statement)?)
            .await?;
        parse::query_result(&xml)
    }

    async fn create(&self, batch: RecordBatch) -> Result<Value, TransportError> {
        let xml = self
            .call("create", envelope::create(&self.session_id, &batch)?)
            .await?;
        parse::save_results(&xml, "create")
    }

    async fn update(&self, batch: RecordBatch) -> Result<Value, TransportError> {
        let xml = self
            .call("update", envelope::update(&self.session_id, &batch)?)
            .await?;
        parse::save_results(&xml, "update")
    }

    async fn delete(&self, batch: IdBatch) -> Result<Value, TransportError> {
        let xml = self
            .call("delete", envelope::delete(&self.session_id, &batch)?)
            .await?;
        parse::save_results(&xml, "delete")
    }
}

/// POST a SOAP envelope and return the response body
///
/// Faults come back with HTTP 500, so the body is returned for any status
/// that carries a SOAP envelope.
async fn post(
    http: &reqwest::Client,
    url: &str,
    action: &str,
    body: String,
) -> Result<String, TransportError> {
    let response = http
        .post(url)
        .header(CONTENT_TYPE, "text/xml; charset=utf-8")
        .header("SOAPAction", format!("\"{}\"", action))
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    log::debug!("SOAP {} responded with {}", action, status);

    if !status.is_success() && !text.contains("Envelope") {
        return Err(TransportError::new(format!(
            "SOAP {} failed with HTTP {}",
            action, status
        )));
    }

    Ok(text)
}
