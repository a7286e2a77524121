// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached model loading
//!
//! [`ModelLoaders`] resolves a locator, fetches it, parses it with the
//! format's parser and maps it into canonical scene space. Every format
//! keeps its own single-flight cache keyed by resolved URL and transform,
//! so a model referenced by many components is fetched and parsed once.

use crate::cache::SingleFlightCache;
use crate::error::{LoadError, Result};
use crate::fetch::{AuthHeaders, Fetcher, HttpFetcher};
use crate::formats::step::step_result_to_mesh;
use crate::formats::{
    parse_gltf, parse_obj, parse_stl, FootprintGenerator, KernelRuntime, StepImportParams, StepKernelFactory,
};
use crate::kernel::StepKernels;
use crate::url::resolve_model_url;
use pcb_scene_core::{GeometrySource, SourceKind};
use pcb_scene_geometry::{CoordinateTransformConfig, Mesh, TransformPreset};
use std::future::Future;
use std::sync::Arc;

/// Transform applied when the caller does not supply one
pub fn default_transform(kind: SourceKind) -> Option<CoordinateTransformConfig> {
    match kind {
        SourceKind::Stl | SourceKind::Step => Some(TransformPreset::ZUpToYUp.config()),
        SourceKind::Obj => Some(TransformPreset::ObjZUpToYUp.config()),
        SourceKind::Footprinter => Some(TransformPreset::Footprinter.config()),
        // Scene interchange formats are already Y-up
        SourceKind::Glb | SourceKind::Gltf => None,
    }
}

fn transform_signature(transform: Option<&CoordinateTransformConfig>) -> String {
    transform.map_or_else(|| "identity".to_string(), CoordinateTransformConfig::cache_signature)
}

fn into_scene_space(mesh: Mesh, transform: Option<&CoordinateTransformConfig>) -> Arc<Mesh> {
    Arc::new(match transform {
        Some(t) => t.apply(&mesh),
        None => mesh,
    })
}

/// A unit-scaled copy of a cached mesh; the cached mesh is shared as-is at scale 1
pub fn scaled_copy(mesh: &Arc<Mesh>, factor: Option<f64>) -> Arc<Mesh> {
    match factor.filter(|f| f.is_finite() && *f > 0.0 && (*f - 1.0).abs() > f64::EPSILON) {
        Some(f) => Arc::new(mesh.scaled(f)),
        None => Arc::clone(mesh),
    }
}

/// Cache key of one loaded model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshCacheKey {
    /// Resolved URL, or the descriptor for generated footprints
    pub locator: String,
    pub transform: String,
}

impl MeshCacheKey {
    pub fn new(locator: impl Into<String>, transform: Option<&CoordinateTransformConfig>) -> Self {
        Self {
            locator: locator.into(),
            transform: transform_signature(transform),
        }
    }
}

/// One model request
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    /// URL, path, package reference or footprint descriptor
    pub locator: String,
    /// Overrides the format's default transform
    pub transform: Option<CoordinateTransformConfig>,
    pub project_base_url: Option<String>,
    pub auth_headers: AuthHeaders,
}

impl LoadRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ..Default::default()
        }
    }

    pub fn for_source(source: &GeometrySource) -> Self {
        Self::new(source.locator())
    }

    pub fn with_transform(mut self, transform: Option<CoordinateTransformConfig>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_project_base_url(mut self, base: Option<String>) -> Self {
        self.project_base_url = base;
        self
    }

    pub fn with_auth_headers(mut self, headers: AuthHeaders) -> Self {
        self.auth_headers = headers;
        self
    }

    fn effective_transform(&self, kind: SourceKind) -> Option<CoordinateTransformConfig> {
        self.transform.or_else(|| default_transform(kind))
    }
}

type MeshCache = SingleFlightCache<MeshCacheKey, Arc<Mesh>>;

/// Per-format loaders sharing one fetcher
pub struct ModelLoaders {
    fetcher: Arc<dyn Fetcher>,
    footprints: Option<Arc<dyn FootprintGenerator>>,
    step_kernels: Arc<StepKernels>,
    stl: MeshCache,
    obj: MeshCache,
    glb: MeshCache,
    gltf: MeshCache,
    step: MeshCache,
    footprint: MeshCache,
}

impl Default for ModelLoaders {
    fn default() -> Self {
        Self::new(Arc::new(HttpFetcher::new()))
    }
}

impl ModelLoaders {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            step_kernels: Arc::new(StepKernels::new(None, KernelRuntime::Native, Arc::clone(&fetcher))),
            fetcher,
            footprints: None,
            stl: SingleFlightCache::new("stl"),
            obj: SingleFlightCache::new("obj"),
            glb: SingleFlightCache::new("glb"),
            gltf: SingleFlightCache::new("gltf"),
            step: SingleFlightCache::new("step"),
            footprint: SingleFlightCache::new("footprint"),
        }
    }

    pub fn with_footprint_generator(mut self, generator: Arc<dyn FootprintGenerator>) -> Self {
        self.footprints = Some(generator);
        self
    }

    pub fn with_step_kernel(mut self, factory: Arc<dyn StepKernelFactory>, runtime: KernelRuntime) -> Self {
        self.step_kernels = Arc::new(StepKernels::new(Some(factory), runtime, Arc::clone(&self.fetcher)));
        self
    }

    /// Load any source kind
    pub async fn load(&self, kind: SourceKind, request: &LoadRequest) -> Result<Arc<Mesh>> {
        match kind {
            SourceKind::Stl => self.load_stl(request).await,
            SourceKind::Obj => self.load_obj(request).await,
            SourceKind::Glb => self.load_glb(request).await,
            SourceKind::Gltf => self.load_gltf(request).await,
            SourceKind::Step => self.load_step(request).await,
            SourceKind::Footprinter => self.load_footprint(request).await,
        }
    }

    pub async fn load_stl(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        self.load_fetched(&self.stl, SourceKind::Stl, request, |bytes, _| async move { parse_stl(&bytes) })
            .await
    }

    pub async fn load_obj(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        self.load_fetched(&self.obj, SourceKind::Obj, request, |bytes, _| async move { parse_obj(&bytes) })
            .await
    }

    pub async fn load_glb(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        self.load_scene_document(&self.glb, SourceKind::Glb, request).await
    }

    pub async fn load_gltf(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        self.load_scene_document(&self.gltf, SourceKind::Gltf, request).await
    }

    async fn load_scene_document(&self, cache: &MeshCache, kind: SourceKind, request: &LoadRequest) -> Result<Arc<Mesh>> {
        let fetcher = Arc::clone(&self.fetcher);
        let headers = request.auth_headers.clone();
        self.load_fetched(cache, kind, request, move |bytes, url| async move {
            parse_gltf(&bytes, &url, fetcher.as_ref(), &headers).await
        })
        .await
    }

    /// STEP through the shared kernel, initialized on the first cache miss
    pub async fn load_step(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        let kernels = Arc::clone(&self.step_kernels);
        let project_base_url = request.project_base_url.clone();
        let headers = request.auth_headers.clone();
        self.load_fetched(&self.step, SourceKind::Step, request, move |bytes, _| async move {
            let kernel = kernels.get(project_base_url.as_deref(), &headers).await?;
            let result = kernel.read_step(&bytes, &StepImportParams::millimeters())?;
            step_result_to_mesh(&result)
        })
        .await
    }

    /// Generated footprint geometry, keyed by descriptor
    pub async fn load_footprint(&self, request: &LoadRequest) -> Result<Arc<Mesh>> {
        let generator = self
            .footprints
            .clone()
            .ok_or(LoadError::MissingCollaborator("footprint generator"))?;
        let transform = request.effective_transform(SourceKind::Footprinter);
        let descriptor = request.locator.clone();
        let key = MeshCacheKey::new(descriptor.as_str(), transform.as_ref());

        self.footprint
            .get_or_load(key, move || async move {
                let mesh = generator.generate(&descriptor).await?;
                tracing::debug!(descriptor = %descriptor, triangles = mesh.triangle_count(), "Generated footprint");
                Ok(into_scene_space(mesh, transform.as_ref()))
            })
            .await
    }

    async fn load_fetched<P, Fut>(
        &self,
        cache: &MeshCache,
        kind: SourceKind,
        request: &LoadRequest,
        parse: P,
    ) -> Result<Arc<Mesh>>
    where
        P: FnOnce(Vec<u8>, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Mesh>> + Send + 'static,
    {
        let url = resolve_model_url(&request.locator, request.project_base_url.as_deref())?;
        let transform = request.effective_transform(kind);
        let key = MeshCacheKey::new(url.as_str(), transform.as_ref());
        let fetcher = Arc::clone(&self.fetcher);
        let headers = request.auth_headers.clone();

        cache
            .get_or_load(key, move || async move {
                let bytes = fetcher.fetch(&url, &headers).await?;
                tracing::debug!(url = %url, format = kind.as_str(), bytes = bytes.len(), "Fetched model");
                let mesh = parse(bytes, url).await?;
                Ok(into_scene_space(mesh, transform.as_ref()))
            })
            .await
    }

    pub fn clear_stl_cache(&self) {
        self.stl.clear();
    }

    pub fn clear_obj_cache(&self) {
        self.obj.clear();
    }

    pub fn clear_glb_cache(&self) {
        self.glb.clear();
    }

    pub fn clear_gltf_cache(&self) {
        self.gltf.clear();
    }

    pub fn clear_step_cache(&self) {
        self.step.clear();
    }

    pub fn clear_footprint_cache(&self) {
        self.footprint.clear();
    }

    /// Drop every initialized STEP kernel
    pub fn clear_step_kernel_cache(&self) {
        self.step_kernels.clear();
    }

    pub fn clear_all(&self) {
        self.clear_stl_cache();
        self.clear_obj_cache();
        self.clear_glb_cache();
        self.clear_gltf_cache();
        self.clear_step_cache();
        self.clear_footprint_cache();
        self.clear_step_kernel_cache();
    }
}
