//! Notification pipeline.
//!
//! Log pumps hand announcements to a bounded channel through a cloned
//! [`NotifierHandle`]; a single [`Notifier`] task drains the channel and
//! delivers to Telegram. The single consumer keeps the two messages of
//! one announcement (header, then payload) from interleaving with
//! another announcement's pair. Delivery failures are logged and
//! swallowed so stream processing is never interrupted.

mod telegram;

pub use telegram::TelegramApi;

use log::{error, info};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::identity::ContainerIdentity;

const NOTIFICATION_BUFFER: usize = 64;

const DEPLOYED_MESSAGE: &str = "Container log watcher successfully deployed!";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// One-time confirmation sent after startup.
    Deployed,
    /// An error signal detected in one container's log stream.
    ContainerError {
        identity: ContainerIdentity,
        payload: String,
    },
}

#[derive(Clone)]
pub struct NotifierHandle {
    tx: Sender<Notification>,
}

impl NotifierHandle {
    pub(crate) fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Announce an error detected in a container's log output.
    pub fn announce(&self, identity: ContainerIdentity, payload: String) {
        self.send(Notification::ContainerError { identity, payload });
    }

    /// Announce that the watcher finished initializing.
    pub fn announce_deployed(&self) {
        self.send(Notification::Deployed);
    }

    // Use try_send so a slow or dead channel never blocks a log pump.
    // If the channel is full the notification is dropped and logged.
    fn send(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            error!("Failed to queue notification (channel full or closed): {e:?}");
        }
    }
}

pub struct Notifier {
    api: TelegramApi,
    rx: Receiver<Notification>,
}

impl Notifier {
    pub fn new(api: TelegramApi) -> (NotifierHandle, Self) {
        let (tx, rx) = tokio::sync::mpsc::channel(NOTIFICATION_BUFFER);
        (NotifierHandle::new(tx), Self { api, rx })
    }

    pub async fn run(mut self) {
        info!("Notifier started");
        while let Some(notification) = self.rx.recv().await {
            if let Err(e) = self.deliver(&notification).await {
                error!("Failed to deliver notification: {e}");
            }
        }
        info!("Notifier stopped");
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::Deployed => self.api.send_message(DEPLOYED_MESSAGE).await,
            Notification::ContainerError { identity, payload } => {
                self.api.send_message(&announcement_header(identity)).await?;
                self.api.send_message(payload).await?;
                info!(
                    "Successfully notified about error in container \"{}\" with image \"{}\"",
                    identity.id, identity.image_name
                );
                Ok(())
            }
        }
    }
}

fn announcement_header(identity: &ContainerIdentity) -> String {
    format!(
        "**** Error in container \"{}\" with image \"{}\" ****",
        identity.id, identity.image_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn identity() -> ContainerIdentity {
        ContainerIdentity {
            id: "abc123".to_string(),
            image_name: "web".to_string(),
        }
    }

    #[test]
    fn test_header_names_container_and_image() {
        let header = announcement_header(&identity());
        assert!(header.contains("abc123"));
        assert!(header.contains("web"));
    }

    #[tokio::test]
    async fn test_announce_queues_one_notification() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let handle = NotifierHandle::new(tx);

        handle.announce(identity(), "ERROR disk full".to_string());

        assert_eq!(
            rx.try_recv(),
            Ok(Notification::ContainerError {
                identity: identity(),
                payload: "ERROR disk full".to_string(),
            })
        );
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_panicking() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let handle = NotifierHandle::new(tx);

        handle.announce_deployed();
        handle.announce(identity(), "ERROR again".to_string());

        assert_eq!(rx.try_recv(), Ok(Notification::Deployed));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}
