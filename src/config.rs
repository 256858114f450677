/*!
 * Lifecycle Configuration
 *
 * Runtime knobs for the lifecycle context, loadable from the environment or
 * a JSON file.
 */

use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::{
    DEFAULT_MAX_DEVICES_PER_SESSION, DEFAULT_MAX_SESSIONS, MAX_DEVICES_PER_SESSION_LIMIT,
    MAX_SESSIONS_LIMIT,
};
use crate::host::SignInOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// What the main thread does between acknowledging a suspend and resuming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Park inside the wake-up handler until the host signals resume
    #[default]
    Park,
    /// Return to the caller and complete the resume on a later tick
    Poll,
}

impl FromStr for ResumeMode {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "park" => Ok(ResumeMode::Park),
            "poll" => Ok(ResumeMode::Poll),
            other => Err(LifecycleError::Config(format!(
                "unknown resume mode '{}', expected 'park' or 'poll'",
                other
            ))),
        }
    }
}

/// Lifecycle context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub resume_mode: ResumeMode,
    pub max_sessions: usize,
    pub max_devices_per_session: usize,
    /// Sign-in issued by `init`; `None` skips the automatic sign-in
    pub sign_in_on_init: Option<SignInOptions>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            resume_mode: ResumeMode::Park,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_devices_per_session: DEFAULT_MAX_DEVICES_PER_SESSION,
            sign_in_on_init: Some(SignInOptions::AddDefaultUserAllowingUi),
        }
    }
}

impl LifecycleConfig {
    /// Configuration for hosts that must keep pumping while suspended
    pub fn polling() -> Self {
        Self {
            resume_mode: ResumeMode::Poll,
            ..Default::default()
        }
    }

    /// Defaults overridden by LIFECYCLE_* environment variables
    ///
    /// Environment variables:
    /// - LIFECYCLE_RESUME_MODE: park | poll
    /// - LIFECYCLE_MAX_SESSIONS: session capacity
    /// - LIFECYCLE_MAX_DEVICES: device capacity per session
    /// - LIFECYCLE_SIGN_IN_ON_INIT: true | false
    pub fn from_env() -> LifecycleResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> LifecycleResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LifecycleError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            LifecycleError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> LifecycleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("LIFECYCLE_RESUME_MODE") {
            config.resume_mode = mode.parse()?;
        }
        if let Some(value) = lookup("LIFECYCLE_MAX_SESSIONS") {
            config.max_sessions = parse_capacity("LIFECYCLE_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = lookup("LIFECYCLE_MAX_DEVICES") {
            config.max_devices_per_session = parse_capacity("LIFECYCLE_MAX_DEVICES", &value)?;
        }
        if let Some(value) = lookup("LIFECYCLE_SIGN_IN_ON_INIT") {
            if !parse_flag("LIFECYCLE_SIGN_IN_ON_INIT", &value)? {
                config.sign_in_on_init = None;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        check_range("max_sessions", self.max_sessions, MAX_SESSIONS_LIMIT)?;
        check_range(
            "max_devices_per_session",
            self.max_devices_per_session,
            MAX_DEVICES_PER_SESSION_LIMIT,
        )
    }
}

fn check_range(name: &str, value: usize, limit: usize) -> LifecycleResult<()> {
    if (1..=limit).contains(&value) {
        Ok(())
    } else {
        Err(LifecycleError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, limit, value
        )))
    }
}

fn parse_flag(key: &str, value: &str) -> LifecycleResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(LifecycleError::Config(format!(
            "{}='{}': expected 'true' or 'false'",
            key, other
        ))),
    }
}

fn parse_capacity(key: &str, value: &str) -> LifecycleResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| LifecycleError::Config(format!("{}='{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LifecycleConfig::default());
        assert_eq!(config.max_sessions, 8);
        assert_eq!(config.max_devices_per_session, 32);
    }

    #[test]
    fn test_env_overrides() {
        let config = LifecycleConfig::from_lookup(lookup(&[
            ("LIFECYCLE_RESUME_MODE", "Poll"),
            ("LIFECYCLE_MAX_SESSIONS", "2"),
            ("LIFECYCLE_MAX_DEVICES", "4"),
            ("LIFECYCLE_SIGN_IN_ON_INIT", "false"),
        ]))
        .unwrap();

        assert_eq!(config.resume_mode, ResumeMode::Poll);
        assert_eq!(config.max_sessions, 2);
        assert_eq!(config.max_devices_per_session, 4);
        assert_eq!(config.sign_in_on_init, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_RESUME_MODE", "sleep")])).is_err());
        assert!(LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_MAX_SESSIONS", "0")])).is_err());
        assert!(LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_MAX_DEVICES", "many")])).is_err());
    }

    #[test]
    fn test_sign_in_flag_is_strict() {
        let enabled = LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_SIGN_IN_ON_INIT", "TRUE")])).unwrap();
        assert!(enabled.sign_in_on_init.is_some());
        let disabled = LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_SIGN_IN_ON_INIT", "0")])).unwrap();
        assert_eq!(disabled.sign_in_on_init, None);

        let err = LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_SIGN_IN_ON_INIT", "ture")])).unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
    }

    #[test]
    fn test_rejects_oversized_capacities() {
        let sessions = LifecycleConfig {
            max_sessions: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(sessions.validate(), Err(LifecycleError::Config(_))));

        let devices = LifecycleConfig {
            max_devices_per_session: MAX_DEVICES_PER_SESSION_LIMIT + 1,
            ..Default::default()
        };
        assert!(matches!(devices.validate(), Err(LifecycleError::Config(_))));

        let at_limit = LifecycleConfig {
            max_sessions: MAX_SESSIONS_LIMIT,
            max_devices_per_session: MAX_DEVICES_PER_SESSION_LIMIT,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());

        let env = LifecycleConfig::from_lookup(lookup(&[("LIFECYCLE_MAX_SESSIONS", "100000")]));
        assert!(env.is_err());
    }

    #[test]
    fn test_json_file_rejects_oversized_device_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_devices_per_session": 18446744073709551615 }}"#).unwrap();

        let err = LifecycleConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
    }

    #[test]
    fn test_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "resume_mode": "poll", "max_sessions": 3 }}"#).unwrap();

        let config = LifecycleConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.resume_mode, ResumeMode::Poll);
        assert_eq!(config.max_sessions, 3);
        assert_eq!(config.max_devices_per_session, 32);
    }

    #[test]
    fn test_json_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = LifecycleConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
    }
}
