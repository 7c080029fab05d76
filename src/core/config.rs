use std::env;
use std::fmt;
use std::time::Duration;

/// Connection parameters for a StretchFS backend.
///
/// The endpoint and auth token are both required and have no defaults.
/// Neither is validated at construction; a malformed endpoint or rejected
/// token surfaces on the first request.
#[derive(Clone)]
pub struct StorageConfig {
    /// Base URL of the StretchFS instance (e.g. `https://sfs.example.com`)
    pub endpoint: String,
    /// API token sent as a bearer credential on every request
    pub auth_token: String,
    /// Request timeout applied to the whole HTTP client
    pub timeout: Duration,
}

impl StorageConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(endpoint: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        let endpoint = env::var("STRETCHFS_ENDPOINT")
            .map_err(|_| "STRETCHFS_ENDPOINT environment variable is required".to_string())?;

        let auth_token = env::var("STRETCHFS_TOKEN")
            .map_err(|_| "STRETCHFS_TOKEN environment variable is required".to_string())?;

        let timeout_secs = env::var("STRETCHFS_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "STRETCHFS_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            endpoint,
            auth_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// The token is a secret; it must never reach logs, so Debug redacts it.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
