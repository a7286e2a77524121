// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP kernel instances
//!
//! Kernels are expensive to start, so one instance is kept per project base
//! and auth signature. Concurrent first requests share one initialization.

use crate::cache::SingleFlightCache;
use crate::error::{KernelAttempt, LoadError, Result};
use crate::fetch::{auth_signature, AuthHeaders, Fetcher};
use crate::formats::step::{KernelRuntime, StepKernel, StepKernelFactory};
use crate::wasm::{first_success, validate_wasm, wasm_candidates, AttemptOutcome};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelCacheKey {
    pub project_base_url: String,
    pub auth_signature: String,
}

pub struct StepKernels {
    factory: Option<Arc<dyn StepKernelFactory>>,
    runtime: KernelRuntime,
    fetcher: Arc<dyn Fetcher>,
    instances: SingleFlightCache<KernelCacheKey, Arc<dyn StepKernel>>,
}

impl StepKernels {
    pub fn new(
        factory: Option<Arc<dyn StepKernelFactory>>,
        runtime: KernelRuntime,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            factory,
            runtime,
            fetcher,
            instances: SingleFlightCache::new("step-kernel"),
        }
    }

    pub fn runtime(&self) -> &KernelRuntime {
        &self.runtime
    }

    /// Shared kernel for a project base and header set, initializing it on first use
    pub async fn get(&self, project_base_url: Option<&str>, headers: &AuthHeaders) -> Result<Arc<dyn StepKernel>> {
        let factory = self
            .factory
            .clone()
            .ok_or(LoadError::MissingCollaborator("STEP kernel factory"))?;

        let key = KernelCacheKey {
            project_base_url: project_base_url.unwrap_or_default().to_string(),
            auth_signature: auth_signature(headers),
        };
        let runtime = self.runtime.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let headers = headers.clone();
        let project_base_url = project_base_url.map(str::to_string);

        self.instances
            .get_or_load(key, move || async move {
                match runtime {
                    KernelRuntime::Native => factory.instantiate(None).await.map_err(|e| LoadError::KernelInit {
                        attempts: vec![KernelAttempt {
                            source: "native".to_string(),
                            reason: e.to_string(),
                        }],
                    }),
                    KernelRuntime::Browser { origin } => {
                        let candidates = wasm_candidates(&origin, project_base_url.as_deref());
                        let (kernel, outcomes) = first_success(&candidates, |candidate| {
                            let fetcher = Arc::clone(&fetcher);
                            let factory = Arc::clone(&factory);
                            let headers = if candidate.with_auth {
                                headers.clone()
                            } else {
                                AuthHeaders::new()
                            };
                            async move {
                                let binary = fetcher.fetch(&candidate.url, &headers).await?;
                                validate_wasm(&candidate.url, &binary)?;
                                factory.instantiate(Some(binary)).await
                            }
                        })
                        .await?;

                        let skipped = outcomes
                            .iter()
                            .filter(|o| matches!(o, AttemptOutcome::Failed { .. }))
                            .count();
                        tracing::info!(origin = %origin, skipped, "STEP kernel initialized");
                        Ok(kernel)
                    }
                }
            })
            .await
    }

    pub fn clear(&self) {
        self.instances.clear();
    }
}
