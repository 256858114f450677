/*!
 * Completion Application
 *
 * Main-thread half of the dispatch loop: turns one completion into session
 * registry operations.
 */

use super::completion::{PendingCompletion, SessionChangeEvent};
use crate::core::errors::CompletionError;
use crate::host::{DeviceAssociationChange, SignInOutcome};
use crate::session::{SessionRegistry, SessionToken};
use tracing::{debug, info};

/// Apply one completion to the registry
///
/// Lookup misses are no-ops. Capacity overflows are logged by the registry
/// and count as applied; only undecodable completions return an error.
pub fn apply_completion(
    registry: &mut SessionRegistry,
    completion: PendingCompletion,
) -> Result<(), CompletionError> {
    match completion {
        PendingCompletion::SignIn(outcome) => apply_sign_in(registry, outcome),
        PendingCompletion::SessionChanged {
            local_id,
            raw_event,
        } => {
            let event = SessionChangeEvent::from_raw(raw_event)?;
            info!(local_id = %local_id, event = ?event, "User event");
            if event == SessionChangeEvent::SignedOut {
                registry.remove(local_id);
            }
            Ok(())
        }
        PendingCompletion::DeviceAssociation(change) => {
            apply_device_association(registry, change);
            Ok(())
        }
    }
}

fn apply_sign_in(registry: &mut SessionRegistry, outcome: SignInOutcome) -> Result<(), CompletionError> {
    let handle = outcome.map_err(CompletionError::SignInFailed)?;
    let local_id = handle.local_id();
    // From here on the handle is released whenever the token drops
    let token = SessionToken::new(handle);
    let local_id = local_id.map_err(CompletionError::LocalIdUnavailable)?;

    if let Err(e) = registry.add(token, local_id) {
        debug!(error = %e, "Sign-in not registered");
    }
    Ok(())
}

fn apply_device_association(registry: &mut SessionRegistry, change: DeviceAssociationChange) {
    info!(
        device = %change.device,
        old_user = ?change.old_user.map(|id| id.value()),
        new_user = ?change.new_user.map(|id| id.value()),
        "User device association event"
    );

    if let Some(old_user) = change.old_user {
        registry.detach_device(old_user, &change.device);
    }
    if let Some(new_user) = change.new_user {
        if let Err(e) = registry.attach_device(new_user, change.device) {
            debug!(error = %e, "Device association not recorded");
        }
    }
}
