// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for model loading
pub type Result<T> = std::result::Result<T, LoadError>;

/// One failed source while initializing the STEP kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelAttempt {
    pub source: String,
    pub reason: String,
}

/// Errors that can occur while loading a model.
///
/// `Clone` because a single in-flight load hands its result to every
/// waiter on the same cache key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to fetch {url}: {reason}")]
    ResourceFetch { url: String, reason: String },

    #[error("Failed to parse {format}: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Not a WASM binary (bad magic bytes): {url}")]
    InvalidWasm { url: String },

    #[error("STEP kernel unavailable, {} source(s) failed", .attempts.len())]
    KernelInit { attempts: Vec<KernelAttempt> },

    #[error("No {0} configured")]
    MissingCollaborator(&'static str),

    #[error("Geometry error: {0}")]
    Geometry(String),
}

impl LoadError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::ResourceFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(format: &'static str, reason: impl ToString) -> Self {
        LoadError::Parse {
            format,
            reason: reason.to_string(),
        }
    }

    /// Fetch or payload failures, as opposed to contract violations and
    /// missing capabilities
    pub fn is_fetch_or_parse(&self) -> bool {
        matches!(
            self,
            LoadError::ResourceFetch { .. } | LoadError::Parse { .. } | LoadError::InvalidWasm { .. }
        )
    }
}

impl From<pcb_scene_geometry::Error> for LoadError {
    fn from(e: pcb_scene_geometry::Error) -> Self {
        LoadError::Geometry(e.to_string())
    }
}
