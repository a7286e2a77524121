// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WASM kernel binary sources
//!
//! In a browser runtime the STEP kernel is instantiated from a WASM binary
//! that may live in several places. Sources are tried strictly in order and
//! the first valid binary wins.

use crate::error::{KernelAttempt, LoadError, Result};
use crate::url::resolve_model_url;
use std::future::Future;

/// Every WASM module starts with `\0asm`
pub const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Install path of the kernel binary inside a project
pub const OCCT_WASM_PATH: &str = "node_modules/occt-import-js/dist/occt-import-js.wasm";

/// Kernel version pinned for CDN fallbacks
pub const OCCT_VERSION: &str = "0.0.23";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// The project's own install, through the package download endpoint
    ProjectRelative,
    /// The default install path under the page origin
    OriginRelative,
    Cdn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmCandidate {
    pub kind: CandidateKind,
    pub url: String,
    /// Forward the caller's auth headers to this source
    pub with_auth: bool,
}

/// Ordered kernel binary sources for a browser runtime
pub fn wasm_candidates(origin: &str, project_base_url: Option<&str>) -> Vec<WasmCandidate> {
    let mut candidates = Vec::with_capacity(4);

    if let Some(base) = project_base_url.filter(|b| !b.trim().is_empty()) {
        match resolve_model_url(OCCT_WASM_PATH, Some(base)) {
            Ok(url) => candidates.push(WasmCandidate {
                kind: CandidateKind::ProjectRelative,
                url,
                with_auth: true,
            }),
            Err(e) => tracing::debug!(error = %e, "Skipping project-relative kernel source"),
        }
    }

    candidates.push(WasmCandidate {
        kind: CandidateKind::OriginRelative,
        url: format!("{}/{}", origin.trim_end_matches('/'), OCCT_WASM_PATH),
        with_auth: false,
    });

    for cdn in [
        format!("https://cdn.jsdelivr.net/npm/occt-import-js@{}/dist/occt-import-js.wasm", OCCT_VERSION),
        format!("https://unpkg.com/occt-import-js@{}/dist/occt-import-js.wasm", OCCT_VERSION),
    ] {
        candidates.push(WasmCandidate {
            kind: CandidateKind::Cdn,
            url: cdn,
            with_auth: false,
        });
    }

    candidates
}

/// Reject anything that is not a WASM module
pub fn validate_wasm(url: &str, bytes: &[u8]) -> Result<()> {
    if bytes.starts_with(WASM_MAGIC) {
        Ok(())
    } else {
        Err(LoadError::InvalidWasm { url: url.to_string() })
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded { url: String },
    Failed { url: String, error: LoadError },
}

/// Try candidates in order until one succeeds.
///
/// Returns the value with the outcome of every candidate tried, or
/// `KernelInit` listing every failure once all candidates are exhausted.
pub async fn first_success<T, F, Fut>(
    candidates: &[WasmCandidate],
    mut attempt: F,
) -> Result<(T, Vec<AttemptOutcome>)>
where
    F: FnMut(WasmCandidate) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut outcomes = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => {
                tracing::debug!(url = %candidate.url, kind = ?candidate.kind, "Kernel source succeeded");
                outcomes.push(AttemptOutcome::Succeeded {
                    url: candidate.url.clone(),
                });
                return Ok((value, outcomes));
            }
            Err(error) => {
                tracing::warn!(url = %candidate.url, error = %error, "Kernel source failed, trying next");
                outcomes.push(AttemptOutcome::Failed {
                    url: candidate.url.clone(),
                    error,
                });
            }
        }
    }

    let attempts = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            AttemptOutcome::Failed { url, error } => Some(KernelAttempt {
                source: url,
                reason: error.to_string(),
            }),
            AttemptOutcome::Succeeded { .. } => None,
        })
        .collect();
    Err(LoadError::KernelInit { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_candidate_order() {
        let candidates = wasm_candidates("https://app.example.com/", Some("https://api.example.com"));
        let kinds: Vec<_> = candidates.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CandidateKind::ProjectRelative,
                CandidateKind::OriginRelative,
                CandidateKind::Cdn,
                CandidateKind::Cdn
            ]
        );
        assert!(candidates[0].with_auth);
        assert!(candidates[1..].iter().all(|c| !c.with_auth));
        assert_eq!(
            candidates[1].url,
            "https://app.example.com/node_modules/occt-import-js/dist/occt-import-js.wasm"
        );
        assert!(candidates[2].url.starts_with("https://cdn.jsdelivr.net/"));
        assert!(candidates[3].url.starts_with("https://unpkg.com/"));
    }

    #[test]
    fn test_no_project_source_without_base() {
        let candidates = wasm_candidates("https://app.example.com", None);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].kind, CandidateKind::OriginRelative);
    }

    #[test]
    fn test_magic_bytes() {
        assert!(validate_wasm("u", b"\0asm\x01\0\0\0").is_ok());
        assert!(matches!(
            validate_wasm("u", b"<!doctype html>"),
            Err(LoadError::InvalidWasm { .. })
        ));
    }

    #[tokio::test]
    async fn test_first_success_stops_at_first_valid_source() {
        let candidates = wasm_candidates("https://app.example.com", None);
        let tried = Mutex::new(Vec::new());

        let (value, outcomes) = first_success(&candidates, |c| {
            tried.lock().unwrap().push(c.kind);
            async move {
                match c.kind {
                    CandidateKind::Cdn => Ok(c.url),
                    _ => Err(LoadError::fetch(c.url, "status 404")),
                }
            }
        })
        .await
        .unwrap();

        assert!(value.contains("jsdelivr"));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(*tried.lock().unwrap(), vec![CandidateKind::OriginRelative, CandidateKind::Cdn]);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_kernel_init() {
        let candidates = wasm_candidates("https://app.example.com", Some("https://api.example.com"));
        let result: Result<((), _)> =
            first_success(&candidates, |c| async move { Err(LoadError::InvalidWasm { url: c.url }) }).await;

        match result {
            Err(LoadError::KernelInit { attempts }) => {
                assert_eq!(attempts.len(), 4);
                assert!(attempts[0].source.contains("package_files/download"));
                assert!(attempts[3].source.contains("unpkg"));
            }
            other => panic!("expected KernelInit, got {:?}", other),
        }
    }
}
