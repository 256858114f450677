/*!
 * Callback Bridge
 *
 * The `PlatformCallbacks` implementation handed to the host. Runs on host
 * threads: session notifications become completions on the channel, and
 * quiescence notifications go to the suspend coordinator. Nothing here
 * touches the session registry.
 */

use super::coordinator::SuspendCoordinator;
use crate::core::errors::LifecycleError;
use crate::core::types::LocalId;
use crate::dispatch::{CompletionSender, PendingCompletion};
use crate::host::{DeviceAssociationChange, PlatformCallbacks, SignInOutcome};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CallbackBridge {
    sender: CompletionSender,
    coordinator: Arc<SuspendCoordinator>,
}

impl CallbackBridge {
    pub fn new(sender: CompletionSender, coordinator: Arc<SuspendCoordinator>) -> Self {
        Self {
            sender,
            coordinator,
        }
    }

    fn enqueue(&self, completion: PendingCompletion) {
        let kind = completion.kind();
        match self.sender.send(completion) {
            Ok(()) => debug!(kind, "Completion enqueued"),
            Err(LifecycleError::ChannelClosed) => {
                debug!(kind, "Completion after shutdown dropped")
            }
            Err(e) => warn!(kind, error = %e, "Completion dropped"),
        }
    }
}

impl PlatformCallbacks for CallbackBridge {
    fn quiescence_changed(&self, quiescing: bool) {
        self.coordinator.on_quiescence(quiescing);
    }

    fn session_changed(&self, local_id: LocalId, raw_event: u32) {
        self.enqueue(PendingCompletion::SessionChanged {
            local_id,
            raw_event,
        });
    }

    fn device_association_changed(&self, change: DeviceAssociationChange) {
        self.enqueue(PendingCompletion::DeviceAssociation(change));
    }

    fn sign_in_completed(&self, outcome: SignInOutcome) {
        self.enqueue(PendingCompletion::SignIn(outcome));
    }
}
