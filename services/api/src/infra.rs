use assessment_portal::config::NotificationConfig;
use assessment_portal::workflows::assessment::{Notifier, NotifierError};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notification sent through `LoggingNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundMessage {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) subject: String,
}

/// Stand-in mail adapter: logs each message instead of delivering it. Only a
/// `recording` notifier keeps an outbox, so the long-running server holds none.
#[derive(Clone)]
pub(crate) struct LoggingNotifier {
    sender: String,
    enabled: bool,
    outbox: Option<Arc<Mutex<Vec<OutboundMessage>>>>,
}

impl LoggingNotifier {
    pub(crate) fn from_config(config: &NotificationConfig) -> Self {
        Self {
            sender: config.sender.clone(),
            enabled: config.enabled,
            outbox: None,
        }
    }

    pub(crate) fn recording(mut self) -> Self {
        self.outbox = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    pub(crate) fn outbox(&self) -> Vec<OutboundMessage> {
        self.outbox
            .as_ref()
            .map(|outbox| outbox.lock().expect("outbox mutex poisoned").clone())
            .unwrap_or_default()
    }
}

impl Notifier for LoggingNotifier {
    fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        if !self.enabled {
            return Err(NotifierError::Transport(
                "notifications disabled by APP_NOTIFICATIONS".to_string(),
            ));
        }
        if !to_email.contains('@') {
            return Err(NotifierError::Rejected {
                recipient: to_email.to_string(),
                reason: "not an e-mail address".to_string(),
            });
        }

        info!(from = %self.sender, to = %to_email, %subject, body_len = body.len(), "notification dispatched");
        if let Some(outbox) = &self.outbox {
            outbox
                .lock()
                .expect("outbox mutex poisoned")
                .push(OutboundMessage {
                    from: self.sender.clone(),
                    to: to_email.to_string(),
                    subject: subject.to_string(),
                });
        }
        Ok(())
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
