// config.rs — Settings handed over by the add-on at init time.
//
// The add-on serializes its preferences to JSON and passes the string
// through `sk_core_init`. Every field is optional; a missing field keeps its
// default, and unknown fields are ignored so older cores accept newer
// add-ons.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::path::PathBuf;

/// Operator idname of the overlay's modal operator.
pub const DEFAULT_OWN_IDNAME: &str = "wm.sk_screencast_keys";

fn default_own_idname() -> String {
    DEFAULT_OWN_IDNAME.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_own_idname")]
    pub own_idname: String,
    /// Move our modal handlers in front of everyone else's.
    #[serde(default)]
    pub get_event_aggressively: bool,
    /// Save on the host's behalf while the overlay runs.
    #[serde(default)]
    pub auto_save: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            own_idname: default_own_idname(),
            get_event_aggressively: false,
            auto_save: false,
            debug: false,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(s)?)
    }

    /// Parse a NUL-terminated string coming from the host. A null pointer
    /// means "all defaults".
    ///
    /// # Safety
    /// `raw`, when non-null, must point to a NUL-terminated string.
    pub unsafe fn from_c_str(raw: *const std::os::raw::c_char) -> Result<Self, ConfigError> {
        if raw.is_null() {
            return Ok(Self::default());
        }
        Self::from_json(CStr::from_ptr(raw).to_str()?)
    }
}
