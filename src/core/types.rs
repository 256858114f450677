/*!
 * Core Types
 * Identifiers shared by the session, dispatch and lifecycle layers
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::limits::DEVICE_ID_LEN;

/// Raw identity of a signed-in account as reported by the host
///
/// Notifications are correlated to sessions by this value, never by the
/// ownership token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(pub u64);

impl LocalId {
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LocalId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Fixed-width raw identifier of a physical input/output device
///
/// Equality is byte-exact over the whole identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub [u8; DEVICE_ID_LEN]);

impl DeviceId {
    pub const fn from_bytes(bytes: [u8; DEVICE_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; DEVICE_ID_LEN] {
        &self.0
    }

    /// The identifier as eight native-endian words
    pub fn words(&self) -> [u32; DEVICE_ID_LEN / 4] {
        let mut words = [0u32; DEVICE_ID_LEN / 4];
        for (word, chunk) in words.iter_mut().zip(self.0.chunks_exact(4)) {
            *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words().iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", word)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self)
    }
}

/// Opaque native handle of the main window
///
/// Only used as the target of the suspend wake-up message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

/// Token returned by a host notification registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationToken(pub u64);
