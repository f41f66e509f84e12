//! Canonical short identity for a container.
//!
//! Containers reach the watcher in two shapes: a listing entry during
//! discovery and an actor record inside a lifecycle event. Both carry a
//! full container id and an image reference, and both normalize to the
//! same `ContainerIdentity` so the rest of the watcher is agnostic to
//! where a container was first seen.

use bollard::models::{ContainerSummary, EventMessage};

const SHORT_ID_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    /// First six characters of the full container id.
    pub id: String,
    /// The image reference the container was started from.
    pub image_name: String,
}

impl ContainerIdentity {
    pub fn from_summary(summary: &ContainerSummary) -> Self {
        Self {
            id: short_id(summary.id.as_deref().unwrap_or_default()),
            image_name: summary.image.clone().unwrap_or_default(),
        }
    }

    pub fn from_event(event: &EventMessage) -> Self {
        let actor = event.actor.as_ref();
        Self {
            id: short_id(actor.and_then(|a| a.id.as_deref()).unwrap_or_default()),
            image_name: actor
                .and_then(|a| a.attributes.as_ref())
                .and_then(|attrs| attrs.get("image"))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Truncate a full container id to its short form. Ids shorter than the
/// short length are kept as-is; malformed input must never panic here.
fn short_id(full_id: &str) -> String {
    full_id.chars().take(SHORT_ID_LEN).collect()
}
