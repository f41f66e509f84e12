//! In-memory registry of attached log streams.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{info, warn};
use tokio::task::JoinHandle;

use crate::identity::ContainerIdentity;

/// The log-watch resources owned for one container: the identity used
/// to label notifications and the pump task that holds the underlying
/// log stream open.
pub struct WatchedStream {
    pub identity: ContainerIdentity,
    pub task: JoinHandle<()>,
}

/// Mapping from full container id to its attached log stream.
///
/// All mutations go through the internal mutex so concurrent attach and
/// detach calls from the discovery pass and the event loop serialize
/// against each other. At most one stream exists per container id.
#[derive(Default)]
pub struct LogStreamRegistry {
    streams: Mutex<HashMap<String, WatchedStream>>,
}

impl LogStreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the stream for a container. A duplicate attach
    /// is treated as re-registration: the previous pump is aborted and
    /// its stream released.
    pub fn attach(&self, full_id: &str, stream: WatchedStream) {
        let previous = self
            .streams
            .lock()
            .expect("registry lock poisoned")
            .insert(full_id.to_string(), stream);

        if let Some(previous) = previous {
            previous.task.abort();
            warn!(
                "Replaced log stream for container \"{}\" with image \"{}\"",
                previous.identity.id, previous.identity.image_name
            );
        }
    }

    /// Abort and remove the stream for a container. Detaching an id
    /// that was never attached is a no-op; stop events can arrive late,
    /// duplicated, or for containers the watcher never saw start.
    pub fn detach(&self, full_id: &str) {
        let removed = self
            .streams
            .lock()
            .expect("registry lock poisoned")
            .remove(full_id);

        match removed {
            Some(stream) => {
                stream.task.abort();
                info!(
                    "Detached log stream for container \"{}\" with image \"{}\"",
                    stream.identity.id, stream.identity.image_name
                );
            }
            None => info!("No log stream attached for container \"{full_id}\", nothing to detach"),
        }
    }

    /// Ids of all currently attached containers.
    pub fn snapshot(&self) -> Vec<String> {
        self.streams
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Abort every pump and empty the registry. Used on shutdown.
    pub fn clear(&self) {
        let drained: Vec<WatchedStream> = {
            let mut streams = self.streams.lock().expect("registry lock poisoned");
            streams.drain().map(|(_, stream)| stream).collect()
        };

        info!("Releasing {} log streams", drained.len());
        for stream in drained {
            stream.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    // The pump task parks forever holding a guard; when the registry
    // aborts it, the guard drops and the receiver completes.
    fn parked_stream(short_id: &str, image: &str) -> (WatchedStream, oneshot::Receiver<()>) {
        let (guard, released) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        let stream = WatchedStream {
            identity: ContainerIdentity {
                id: short_id.to_string(),
                image_name: image.to_string(),
            },
            task,
        };
        (stream, released)
    }

    #[tokio::test]
    async fn test_attach_then_detach_removes_entry() {
        let registry = LogStreamRegistry::new();
        let (stream, released) = parked_stream("abc123", "web");

        registry.attach("abc123", stream);
        assert_eq!(registry.snapshot(), vec!["abc123".to_string()]);

        registry.detach("abc123");
        assert!(registry.snapshot().is_empty());
        assert!(released.await.is_err(), "detach should abort the pump");
    }

    #[tokio::test]
    async fn test_duplicate_attach_replaces_and_releases_previous() {
        let registry = LogStreamRegistry::new();
        let (first, first_released) = parked_stream("abc123", "web");
        let (second, _second_released) = parked_stream("abc123", "web");

        registry.attach("abc123", first);
        registry.attach("abc123", second);

        assert_eq!(registry.snapshot(), vec!["abc123".to_string()]);
        assert!(
            first_released.await.is_err(),
            "duplicate attach should abort the previous pump"
        );
    }

    #[tokio::test]
    async fn test_detach_of_unknown_id_is_a_no_op() {
        let registry = LogStreamRegistry::new();
        let (stream, _released) = parked_stream("abc123", "web");

        registry.attach("abc123", stream);
        registry.detach("def456");
        registry.detach("def456");

        assert_eq!(registry.snapshot(), vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_aborts_everything() {
        let registry = LogStreamRegistry::new();
        let (first, first_released) = parked_stream("abc123", "web");
        let (second, second_released) = parked_stream("def456", "db");

        registry.attach("abc123", first);
        registry.attach("def456", second);
        registry.clear();

        assert!(registry.snapshot().is_empty());
        assert!(first_released.await.is_err());
        assert!(second_released.await.is_err());
    }
}
