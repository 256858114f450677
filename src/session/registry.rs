/*!
 * Session Registry
 *
 * Bounded set of signed-in sessions keyed by `LocalId`. Owned by the
 * lifecycle context and only mutated from the dispatch loop, so it carries
 * no locking of its own.
 */

use super::types::{SessionToken, UserSession};
use crate::core::errors::SessionError;
use crate::core::limits::DEFAULT_MAX_SESSIONS;
use crate::core::types::{DeviceId, LocalId};
use tracing::{debug, info, warn};

/// Outcome of [`SessionRegistry::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    /// A session with the same local id exists; the new token was released
    AlreadyPresent,
}

/// Signed-in sessions, at most one per `LocalId`
///
/// Index 0 is the default session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<UserSession>,
    capacity: usize,
    device_capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize, device_capacity: usize) -> Self {
        Self {
            sessions: Vec::with_capacity(capacity.min(DEFAULT_MAX_SESSIONS)),
            capacity,
            device_capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a signed-in session
    ///
    /// Idempotent per `local_id`. A rejected token (duplicate or over
    /// capacity) is dropped, which releases it.
    pub fn add(&mut self, token: SessionToken, local_id: LocalId) -> Result<AddOutcome, SessionError> {
        if self.contains(local_id) {
            debug!(local_id = %local_id, "Session already registered, releasing duplicate handle");
            drop(token);
            return Ok(AddOutcome::AlreadyPresent);
        }
        if self.sessions.len() >= self.capacity {
            warn!(
                local_id = %local_id,
                capacity = self.capacity,
                "Session registry full, dropping sign-in"
            );
            drop(token);
            return Err(SessionError::CapacityExceeded {
                local_id,
                capacity: self.capacity,
            });
        }

        self.sessions
            .push(UserSession::new(token, local_id, self.device_capacity));
        info!(local_id = %local_id, sessions = self.sessions.len(), "Session added");
        Ok(AddOutcome::Inserted)
    }

    /// Release and remove the session for `local_id`
    ///
    /// Returns `true` if a session was removed.
    pub fn remove(&mut self, local_id: LocalId) -> bool {
        let Some(index) = self.position(local_id) else {
            debug!(local_id = %local_id, "Remove for unknown session ignored");
            return false;
        };

        // Vec::remove keeps the remaining order, so the default session only
        // changes when index 0 itself leaves.
        let mut session = self.sessions.remove(index);
        session.release_token();
        info!(local_id = %local_id, sessions = self.sessions.len(), "Session removed");
        true
    }

    pub fn find(&self, local_id: LocalId) -> Option<&UserSession> {
        self.sessions.iter().find(|s| s.local_id() == local_id)
    }

    pub fn find_mut(&mut self, local_id: LocalId) -> Option<&mut UserSession> {
        self.sessions.iter_mut().find(|s| s.local_id() == local_id)
    }

    pub fn contains(&self, local_id: LocalId) -> bool {
        self.position(local_id).is_some()
    }

    /// Bind a device to a session; unknown sessions are ignored
    ///
    /// Returns `Ok(true)` if the device was newly bound.
    pub fn attach_device(&mut self, local_id: LocalId, device: DeviceId) -> Result<bool, SessionError> {
        match self.find_mut(local_id) {
            Some(session) => session.attach_device(device),
            None => {
                debug!(local_id = %local_id, device = %device, "Attach for unknown session ignored");
                Ok(false)
            }
        }
    }

    /// Unbind a device from a session; unknown sessions are ignored
    pub fn detach_device(&mut self, local_id: LocalId, device: &DeviceId) -> bool {
        match self.find_mut(local_id) {
            Some(session) => session.detach_device(device),
            None => {
                debug!(local_id = %local_id, device = %device, "Detach for unknown session ignored");
                false
            }
        }
    }

    /// The primary session (index 0), if any
    pub fn default_session(&self) -> Option<&UserSession> {
        self.sessions.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserSession> {
        self.sessions.iter()
    }

    /// Release and remove every session
    pub fn clear(&mut self) -> usize {
        let count = self.sessions.len();
        for mut session in self.sessions.drain(..) {
            session.release_token();
        }
        if count > 0 {
            info!(released = count, "Session registry cleared");
        }
        count
    }

    fn position(&self, local_id: LocalId) -> Option<usize> {
        self.sessions.iter().position(|s| s.local_id() == local_id)
    }
}
