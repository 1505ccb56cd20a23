use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use assetflow_core::config::NotifierConfig;
use assetflow_core::notify::{Notification, Notifier, NotifyError};

use crate::templates::EmailTemplates;

/// Notifier that renders an email per notification and posts it to a
/// Resend-style mail API. Callers treat delivery as fire-and-forget; a
/// failure here is reported as an error for the caller to log, never retry.
pub struct EmailNotifier {
    http: reqwest::Client,
    templates: EmailTemplates,
    api_url: String,
    api_key: SecretString,
    from_address: String,
}

impl EmailNotifier {
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| NotifyError::Transport("notifier api key is not configured".into()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            templates: EmailTemplates::new()?,
            api_url: config.api_url.clone(),
            api_key,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let email = self.templates.render(notification.kind, &notification.data)?;

        let payload = serde_json::json!({
            "from": self.from_address,
            "to": [notification.recipient],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Transport(format!(
                "mail api returned {}",
                response.status()
            )));
        }

        debug!(
            event_name = "notify.email_sent",
            kind = notification.kind.as_str(),
            "notification email delivered"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assetflow_core::config::NotifierConfig;
    use assetflow_core::notify::NotifyError;

    use super::EmailNotifier;

    #[test]
    fn construction_fails_without_an_api_key() {
        let config = NotifierConfig {
            enabled: true,
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: None,
            from_address: "Assetflow <onboarding@resend.dev>".to_string(),
            approvals_inbox: "approvals@example.com".to_string(),
        };

        let error = EmailNotifier::from_config(&config).err().expect("missing key must fail");
        assert!(matches!(error, NotifyError::Transport(_)));
    }
}

