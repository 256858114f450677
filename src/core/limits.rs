/*!
 * Lifecycle Limits and Constants
 *
 * Centralized capacities for the session registry and device sets.
 * Runtime configuration may lower or raise the registry capacities; the
 * device identifier width is fixed by the host.
 */

// =============================================================================
// SESSION LIMITS
// =============================================================================

/// Default number of concurrently signed-in sessions
/// Index 0 is the default session for consumers
pub const DEFAULT_MAX_SESSIONS: usize = 8;

/// Default number of devices bound to one session
pub const DEFAULT_MAX_DEVICES_PER_SESSION: usize = 32;

/// Largest accepted `max_sessions` setting
pub const MAX_SESSIONS_LIMIT: usize = 64;

/// Largest accepted `max_devices_per_session` setting
pub const MAX_DEVICES_PER_SESSION_LIMIT: usize = 256;

// =============================================================================
// DEVICE IDENTIFIERS
// =============================================================================

/// Width of a raw device identifier in bytes
pub const DEVICE_ID_LEN: usize = 32;
