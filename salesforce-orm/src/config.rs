//! ORM configuration with builder pattern
//!
//! Holds the session renewal policy, API endpoint settings, login credentials
//! and the TOML model declaration file used by the CLI.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::model::ModelDescriptor;

/// Default SOAP Partner API version
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Default login endpoint (use https://test.salesforce.com for sandboxes)
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Salesforce drops idle sessions after 120 minutes
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(120 * 60);

/// Sessions are renewed after 100 minutes, well before the server expires them
pub const DEFAULT_RENEWAL_WINDOW: Duration = Duration::from_secs(100 * 60);

/// Global ORM configuration
#[derive(Debug, Clone)]
pub struct OrmConfig {
    /// How long a session is trusted after login before renewing it
    pub renewal_window: Duration,
    /// True server-side lifetime of a session
    pub session_lifetime: Duration,
    pub api_version: String,
    pub login_url: String,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            renewal_window: DEFAULT_RENEWAL_WINDOW,
            session_lifetime: DEFAULT_SESSION_LIFETIME,
            api_version: DEFAULT_API_VERSION.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl OrmConfig {
    /// Create a new builder for OrmConfig
    pub fn builder() -> OrmConfigBuilder {
        OrmConfigBuilder::new()
    }

    /// Check that the renewal policy leaves a margin before true expiry
    pub fn validate(&self) -> Result<()> {
        if self.renewal_window.is_zero() {
            anyhow::bail!("Session renewal window must be greater than zero");
        }
        if self.renewal_window >= self.session_lifetime {
            anyhow::bail!(
                "Session renewal window ({:?}) must be shorter than the session lifetime ({:?})",
                self.renewal_window,
                self.session_lifetime
            );
        }
        if self.api_version.trim().is_empty() {
            anyhow::bail!("API version must not be empty");
        }
        Ok(())
    }

    /// SOAP Partner endpoint used for login
    pub fn login_endpoint(&self) -> String {
        format!(
            "{}/services/Soap/u/{}",
            self.login_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

/// Builder for OrmConfig
#[derive(Debug)]
pub struct OrmConfigBuilder {
    config: OrmConfig,
}

impl OrmConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: OrmConfig::default(),
        }
    }

    /// Set how long a session is reused before renewing
    pub fn renewal_window(mut self, window: Duration) -> Self {
        self.config.renewal_window = window;
        self
    }

    /// Set the server-side session lifetime
    pub fn session_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.session_lifetime = lifetime;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.config.login_url = url.into();
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<OrmConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for OrmConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Username/password/security-token credentials for the SOAP login call
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub security_token: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            security_token: security_token.into(),
        }
    }

    /// Load credentials from `SF_USERNAME`, `SF_PASSWORD` and `SF_SECURITY_TOKEN`
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = std::env::var("SF_USERNAME").context("SF_USERNAME is not set")?;
        let password = std::env::var("SF_PASSWORD").context("SF_PASSWORD is not set")?;
        let security_token = std::env::var("SF_SECURITY_TOKEN").unwrap_or_default();

        Ok(Self {
            username,
            password,
            security_token,
        })
    }

    /// The login password is the account password followed by the security token
    pub(crate) fn login_password(&self) -> String {
        format!("{}{}", self.password, self.security_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .finish()
    }
}

/// Read the login URL override from `SF_LOGIN_URL`, if set
pub fn login_url_from_env() -> Option<String> {
    std::env::var("SF_LOGIN_URL").ok().filter(|url| !url.trim().is_empty())
}

/// Model declarations loaded from a TOML file
///
/// ```toml
/// [[model]]
/// name = "Account"
/// fields = ["Name", "Industry"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsFile {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelDescriptor>,
}

impl ModelsFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse model declarations")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid model file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrmConfig::default();

        assert_eq!(config.renewal_window, Duration::from_secs(6000));
        assert_eq!(config.session_lifetime, Duration::from_secs(7200));
        assert!(config.validate().is_ok());
        assert_eq!(
            config.login_endpoint(),
            "https://login.salesforce.com/services/Soap/u/59.0"
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = OrmConfig::builder()
            .renewal_window(Duration::from_secs(60))
            .session_lifetime(Duration::from_secs(120))
            .api_version("60.0")
            .login_url("https://test.salesforce.com/")
            .build()
            .unwrap();

        assert_eq!(config.renewal_window, Duration::from_secs(60));
        assert_eq!(
            config.login_endpoint(),
            "https://test.salesforce.com/services/Soap/u/60.0"
        );
    }

    #[test]
    fn test_renewal_window_must_be_shorter_than_lifetime() {
        let result = OrmConfig::builder()
            .renewal_window(Duration::from_secs(7200))
            .build();
        assert!(result.is_err());

        let result = OrmConfig::builder().renewal_window(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("user@example.com", "hunter2", "TOKEN123");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("TOKEN123"));
        assert_eq!(creds.login_password(), "hunter2TOKEN123");
    }

    #[test]
    fn test_models_file_parse() {
        let file = ModelsFile::parse(
            r#"
            [[model]]
            name = "Account"
            fields = ["Name", "Industry"]

            [[model]]
            name = "Contact"
            fields = ["FirstName", "LastName", "Email"]
            "#,
        )
        .unwrap();

        assert_eq!(file.models.len(), 2);
        assert_eq!(file.models[0].name, "Account");
        assert_eq!(file.models[1].fields, vec!["FirstName", "LastName", "Email"]);
    }

    #[test]
    fn test_models_file_empty() {
        let file = ModelsFile::parse("").unwrap();
        assert!(file.models.is_empty());
    }
}
