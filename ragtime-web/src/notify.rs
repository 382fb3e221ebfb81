//! Admin notifications
//!
//! When a notify URL is configured, events are POSTed there as JSON (a
//! webhook the operator points at their mailer or chat bridge). Without
//! one, events are logged. Notification failures never fail the request
//! that triggered them.

use ragtime_common::config::Config;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Tell the admin contact that a new user registered
pub async fn notify_new_user(config: &Config, username: &str, email: &str) {
    let Some(url) = config.notify_url.as_deref() else {
        info!(
            "New user registered: {} <{}> (admin contact: {})",
            username,
            email,
            config.admin_email.as_deref().unwrap_or("unset")
        );
        return;
    };

    let payload = json!({
        "event": "new_user",
        "username": username,
        "email": email,
        "admin": config.admin_email,
    });

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build notify client: {}", e);
            return;
        }
    };

    match client.post(url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            info!("Notified admin of new user {}", username);
        }
        Ok(response) => {
            warn!("Notify endpoint returned {}", response.status());
        }
        Err(e) => {
            warn!("Failed to notify admin of new user {}: {}", username, e);
        }
    }
}
