//! Telling members how their excuses were resolved.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::settings;
use crate::models::event::excuse::Resolution;
use crate::models::member::Member;

pub struct ExcuseNotice {
    pub recipient: Member,
    /// The event's name and date
    pub event: String,
    pub resolution: Resolution,
    /// What the member originally wrote
    pub reason: String,
}

impl ExcuseNotice {
    pub fn subject(&self) -> String {
        let outcome = match self.resolution {
            Resolution::Approved => "approved",
            Resolution::Denied => "denied",
        };

        format!("Your excuse for {} was {}", self.event, outcome)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn excuse_resolved(&self, notice: &ExcuseNotice) -> Result<()>;
}

/// Writes notices to the log instead of delivering them anywhere.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn excuse_resolved(&self, notice: &ExcuseNotice) -> Result<()> {
        info!(
            to = %notice.recipient.email,
            reason = %notice.reason,
            "{}",
            notice.subject()
        );

        Ok(())
    }
}

/// Hand a notice to the notifier unless notifications are turned off.
pub async fn send(notifier: &dyn Notifier, notice: &ExcuseNotice) -> Result<()> {
    if !settings().notify {
        return Ok(());
    }

    notifier.excuse_resolved(notice).await
}
