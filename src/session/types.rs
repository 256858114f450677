/*!
 * Session Types
 * Account handles, their ownership tokens, and per-session device sets
 */

use crate::core::errors::{HostResult, SessionError};
use crate::core::limits::DEFAULT_MAX_DEVICES_PER_SESSION;
use crate::core::types::{DeviceId, LocalId};
use std::fmt;
use tracing::{debug, warn};

/// Host-side account handle
///
/// The host hands one out per successful sign-in. `close` releases it and is
/// called exactly once, by [`SessionToken`] on drop.
pub trait SessionHandle: Send {
    /// Stable identity of the account behind this handle
    fn local_id(&self) -> HostResult<LocalId>;

    /// Release the handle back to the host
    fn close(&mut self);
}

/// Owning wrapper around a [`SessionHandle`]
///
/// Releases the handle when dropped, so every path that discards a session
/// (sign-out, duplicate sign-in, capacity overflow, exit) closes it.
pub struct SessionToken {
    handle: Option<Box<dyn SessionHandle>>,
}

impl SessionToken {
    pub fn new(handle: Box<dyn SessionHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Borrow the underlying host handle
    pub fn handle(&self) -> Option<&dyn SessionHandle> {
        self.handle.as_deref()
    }

    pub fn local_id(&self) -> Option<HostResult<LocalId>> {
        self.handle.as_ref().map(|h| h.local_id())
    }

    /// Release the handle now instead of at drop
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("released", &self.is_released())
            .finish()
    }
}

/// A signed-in account and the devices currently bound to it
#[derive(Debug)]
pub struct UserSession {
    token: SessionToken,
    local_id: LocalId,
    devices: Vec<DeviceId>,
    device_capacity: usize,
}

impl UserSession {
    pub(crate) fn new(token: SessionToken, local_id: LocalId, device_capacity: usize) -> Self {
        Self {
            token,
            local_id,
            devices: Vec::with_capacity(device_capacity.min(DEFAULT_MAX_DEVICES_PER_SESSION)),
            device_capacity,
        }
    }

    #[inline]
    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn handle(&self) -> Option<&dyn SessionHandle> {
        self.token.handle()
    }

    /// Close the host handle ahead of discarding the entry
    pub(crate) fn release_token(&mut self) {
        self.token.release();
    }

    /// Devices bound to this session, in no particular order
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn has_device(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }

    pub fn device_capacity(&self) -> usize {
        self.device_capacity
    }

    /// Bind a device; already-bound devices are left alone
    ///
    /// Returns `Ok(true)` if the device was added.
    pub fn attach_device(&mut self, device: DeviceId) -> Result<bool, SessionError> {
        if self.has_device(&device) {
            return Ok(false);
        }
        if self.devices.len() >= self.device_capacity {
            warn!(
                local_id = %self.local_id,
                device = %device,
                capacity = self.device_capacity,
                "Device set full, dropping association"
            );
            return Err(SessionError::DeviceCapacityExceeded {
                local_id: self.local_id,
                device,
                capacity: self.device_capacity,
            });
        }
        self.devices.push(device);
        debug!(local_id = %self.local_id, device = %device, "Device attached");
        Ok(true)
    }

    /// Unbind a device. Returns `true` if it was bound.
    pub fn detach_device(&mut self, device: &DeviceId) -> bool {
        match self.devices.iter().position(|d| d == device) {
            Some(index) => {
                self.devices.swap_remove(index);
                debug!(local_id = %self.local_id, device = %device, "Device detached");
                true
            }
            None => false,
        }
    }
}
