// error.rs — Errors that are allowed to leave the core.
//
// Everything else (null links, unreadable memory, a UI handler in the way)
// is handled where it happens and never surfaces as an error.

use crate::version::HostVersion;
use thiserror::Error;

/// Failures while selecting or checking the layout set for the running host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no struct layouts registered for host version {0}")]
    UnsupportedVersion(HostVersion),

    #[error("layout set '{set}' does not declare struct '{name}'")]
    MissingStruct { set: &'static str, name: &'static str },

    #[error("layout set '{set}' does not declare field '{strukt}.{field}'")]
    MissingField {
        set: &'static str,
        strukt: &'static str,
        field: &'static str,
    },

    #[error("field '{strukt}.{field}' ends at byte {end}, past the struct size {size}")]
    FieldOutOfBounds {
        strukt: &'static str,
        field: &'static str,
        end: usize,
        size: usize,
    },

    #[error("pointer field '{strukt}.{field}' is {width} bytes wide")]
    BadPointerWidth {
        strukt: &'static str,
        field: &'static str,
        width: usize,
    },
}

/// Problems with the configuration handed over by the add-on.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config string is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("config JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}
