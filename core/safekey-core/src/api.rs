//! Calls to the collection API outside the batch flow.
//!
//! - `POST /register`: parent registration from the setup screen
//! - `POST /send`: the DONE key's single-message send
//!
//! Bodies are built with serde, never by string interpolation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fs_err as fs;
use safekey_protocol::{
    RegisterRequest, SendMessageRequest, JSON_CONTENT_TYPE, REGISTER_PATH, SEND_PATH,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SafekeyError};
use crate::storage::StorageConfig;
use crate::upload::Transport;

/// A registration the endpoint accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub child_age: String,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn save(&self, storage: &StorageConfig) -> Result<()> {
        storage
            .ensure_dirs()
            .map_err(|e| SafekeyError::io("create storage root", e))?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SafekeyError::json("serialize registration", e))?;
        fs::write(storage.registration_file(), content)
            .map_err(|e| SafekeyError::io("write registration", e))
    }
}

/// Reads the saved registration. Missing or corrupt files read as "not registered".
pub fn load_registration(storage: &StorageConfig) -> Option<Registration> {
    let content = fs::read_to_string(storage.registration_file()).ok()?;
    match serde_json::from_str(&content) {
        Ok(registration) => Some(registration),
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring malformed registration file");
            None
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Registers the installation. Both fields are trimmed and must be non-empty.
    pub fn register(&self, email: &str, child_age: &str) -> Result<Registration> {
        let email = email.trim();
        let child_age = child_age.trim();
        if email.is_empty() || child_age.is_empty() {
            return Err(SafekeyError::Validation(
                "email and child age are both required".to_string(),
            ));
        }

        let body = RegisterRequest {
            email: email.to_string(),
            child_age: child_age.to_string(),
        };
        self.post_json(REGISTER_PATH, &body)?;
        tracing::info!("Registration accepted");

        Ok(Registration {
            email: body.email,
            child_age: body.child_age,
            registered_at: Utc::now(),
        })
    }

    pub fn send_message(&self, message: &str) -> Result<()> {
        self.post_json(
            SEND_PATH,
            &SendMessageRequest {
                message: message.to_string(),
            },
        )
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let payload = serde_json::to_string(body)
            .map_err(|e| SafekeyError::json(format!("serialize {} body", path), e))?;
        let status = self.transport.post(path, JSON_CONTENT_TYPE, payload)?;
        if status != 200 {
            return Err(SafekeyError::RemoteStatus {
                endpoint: path.to_string(),
                status,
            });
        }
        Ok(())
    }
}
