//! Container log-watch lifecycle management.
//!
//! [`ContainerLogWatcher`] discovers the running containers, attaches a
//! follow-mode log stream for each, then consumes the Docker lifecycle
//! event feed to attach and detach streams as containers start and
//! stop. Per-container and per-event failures are logged and never
//! terminate the watch loop.

mod registry;
mod stream;

pub use registry::{LogStreamRegistry, WatchedStream};

use std::collections::HashMap;

use bollard::Docker;
use bollard::models::EventMessage;
use bollard::query_parameters::{
    EventsOptions, EventsOptionsBuilder, InspectContainerOptions, InspectContainerOptionsBuilder,
    ListContainersOptions, ListContainersOptionsBuilder,
};
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{Receiver, Sender};

use crate::identity::ContainerIdentity;
use crate::notify::NotifierHandle;

/// Image this watcher itself runs as. Containers started from it are
/// excluded from watching so an error notification never feeds back
/// into its own log stream.
const SELF_IMAGE: &str = "lookout/lookout";

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
    #[error("container \"{0}\" not found")]
    ContainerNotFound(String),
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(String),
}

pub struct ContainerLogWatcher {
    docker: Docker,
    registry: LogStreamRegistry,
    notifier: Option<NotifierHandle>,
    cancel_tx: Sender<()>,
    cancel_rx: Mutex<Receiver<()>>,
}

/// What a lifecycle event asks the watcher to do, if anything.
#[derive(Debug)]
enum LifecycleAction {
    Started {
        full_id: String,
        identity: ContainerIdentity,
    },
    Stopped {
        full_id: String,
        identity: ContainerIdentity,
    },
}

impl ContainerLogWatcher {
    /// Discover the running containers and attach a log stream for each
    /// of them. Failing to list containers at all is fatal; failing to
    /// attach one container is logged and that container is skipped.
    pub async fn create(
        docker: Docker,
        notifier: Option<NotifierHandle>,
    ) -> Result<Self, WatchError> {
        info!("Initializing container log watcher...");

        let options: ListContainersOptions = ListContainersOptionsBuilder::new().build();
        let containers = docker.list_containers(Some(options)).await?;

        let (cancel_tx, cancel_rx) = tokio::sync::mpsc::channel(1);
        let watcher = Self {
            docker,
            registry: LogStreamRegistry::new(),
            notifier,
            cancel_tx,
            cancel_rx: Mutex::new(cancel_rx),
        };

        info!("Found {} containers.", containers.len());

        for summary in containers {
            let Some(full_id) = summary.id.clone() else {
                warn!("Skipping listed container without an id");
                continue;
            };
            let identity = ContainerIdentity::from_summary(&summary);
            if is_own_image(&identity.image_name) {
                debug!("Skipping own container \"{}\"", identity.id);
                continue;
            }
            info!(
                "Watching container \"{}\" with image \"{}\"",
                identity.id, identity.image_name
            );
            if let Err(e) = watcher.attach_container(&full_id, identity).await {
                warn!("Failed to attach log stream: {e}");
            }
        }

        info!(
            "Registered error listeners for {} containers.",
            watcher.registry.snapshot().len()
        );
        Ok(watcher)
    }

    /// Consume the container lifecycle event feed until the stream ends
    /// or [`cancel`](Self::cancel) is called, then release all streams.
    pub async fn watch(&self) {
        let filters = HashMap::from([("type".to_string(), vec!["container".to_string()])]);
        let options: EventsOptions = EventsOptionsBuilder::new().filters(&filters).build();
        let mut events = self.docker.events(Some(options));

        let mut cancel_rx = self.cancel_rx.lock().await;

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => warn!("Lifecycle event stream error: {e}"),
                    None => {
                        warn!("Lifecycle event stream ended");
                        break;
                    }
                },
                _ = cancel_rx.recv() => {
                    info!("Shutting down container log watcher");
                    break;
                }
            }
        }

        self.registry.clear();
    }

    /// Signal the watch loop to shut down.
    pub async fn cancel(&self) {
        let _ = self.cancel_tx.send(()).await;
    }

    async fn handle_event(&self, event: EventMessage) {
        match classify_event(&event) {
            Ok(Some(LifecycleAction::Started { full_id, identity })) => {
                info!(
                    "Container \"{}\" with image \"{}\" started, attaching log stream",
                    identity.id, identity.image_name
                );
                if let Err(e) = self.attach_container(&full_id, identity).await {
                    warn!("Failed to attach log stream: {e}");
                }
            }
            Ok(Some(LifecycleAction::Stopped { full_id, identity })) => {
                info!(
                    "Container \"{}\" with image \"{}\" stopped, detaching log stream",
                    identity.id, identity.image_name
                );
                self.registry.detach(&full_id);
            }
            Ok(None) => {}
            Err(e) => warn!("Dropping lifecycle event: {e}"),
        }
    }

    /// Open a follow-mode log stream for a container and register it.
    /// Shared by the discovery pass and the start-event handler.
    async fn attach_container(
        &self,
        full_id: &str,
        identity: ContainerIdentity,
    ) -> Result<(), WatchError> {
        // The log stream surfaces a missing container only on its first
        // poll; inspect up front so a container that vanished between
        // discovery and attach is classified and skipped cleanly.
        let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();
        match self.docker.inspect_container(full_id, Some(options)).await {
            Ok(_) => {}
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                return Err(WatchError::ContainerNotFound(identity.id));
            }
            Err(e) => return Err(WatchError::DockerApi(e)),
        }

        let task = stream::spawn_log_pump(
            self.docker.clone(),
            full_id.to_string(),
            identity.clone(),
            self.notifier.clone(),
        );
        self.registry.attach(full_id, WatchedStream { identity, task });
        Ok(())
    }
}

fn is_own_image(image_name: &str) -> bool {
    image_name == SELF_IMAGE
}

/// Classify a lifecycle event into the action it requires. Statuses
/// other than start and stop are ignored; a start or stop that carries
/// no container id is malformed and dropped by the caller.
fn classify_event(event: &EventMessage) -> Result<Option<LifecycleAction>, WatchError> {
    let status = match event.action.as_deref() {
        Some(status @ ("start" | "stop")) => status,
        _ => return Ok(None),
    };

    let full_id = event
        .actor
        .as_ref()
        .and_then(|actor| actor.id.clone())
        .ok_or_else(|| WatchError::MalformedEvent(format!("{status} event without container id")))?;
    let identity = ContainerIdentity::from_event(event);

    Ok(Some(match status {
        "start" => LifecycleAction::Started { full_id, identity },
        _ => LifecycleAction::Stopped { full_id, identity },
    }))
}
