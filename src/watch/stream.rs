//! Per-container log pump.
//!
//! Each attached container gets one spawned task that follows its log
//! stream and routes every chunk through error detection. The pump runs
//! until the stream ends, errors, or the registry aborts it.

use bollard::Docker;
use bollard::query_parameters::{LogsOptions, LogsOptionsBuilder};
use futures_util::StreamExt;
use log::{info, warn};
use tokio::task::JoinHandle;

use crate::detect;
use crate::identity::ContainerIdentity;
use crate::notify::NotifierHandle;

/// Options shared by the discovery pass and the start-event handler:
/// follow new output only, both std streams, runtime timestamps.
fn log_stream_options() -> LogsOptions {
    LogsOptionsBuilder::new()
        .follow(true)
        .stdout(true)
        .stderr(true)
        .timestamps(true)
        .tail("0")
        .build()
}

/// Spawn the pump task for one container's log stream.
pub(crate) fn spawn_log_pump(
    docker: Docker,
    full_id: String,
    identity: ContainerIdentity,
    notifier: Option<NotifierHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = docker.logs(&full_id, Some(log_stream_options()));

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => process_chunk(&identity, &output.to_string(), notifier.as_ref()),
                Err(e) => {
                    warn!(
                        "Log stream error for container \"{}\" with image \"{}\": {}",
                        identity.id, identity.image_name, e
                    );
                    break;
                }
            }
        }

        info!(
            "Log stream for container \"{}\" with image \"{}\" closed",
            identity.id, identity.image_name
        );
    })
}

/// Scan one chunk of log output and announce it if it carries an error
/// signal. With notifications disabled the detection is still logged.
pub(crate) fn process_chunk(
    identity: &ContainerIdentity,
    chunk: &str,
    notifier: Option<&NotifierHandle>,
) {
    if !detect::is_error(chunk) {
        return;
    }

    info!(
        "Error in container \"{}\" with image \"{}\". Notifying...",
        identity.id, identity.image_name
    );

    if let Some(notifier) = notifier {
        notifier.announce(identity.clone(), chunk.to_string());
    }
}
