// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model URL resolution
//!
//! CAD records reference models as full URLs, absolute filesystem paths,
//! paths relative to the project, or files inside an installed package
//! (`node_modules/<package>/<file>`). Everything is resolved to one
//! fetchable URL, which is also the cache identity of the model.

use crate::error::{LoadError, Result};
use url::Url;

const NODE_MODULES: &str = "node_modules/";
const REGISTRY_SCOPE: &str = "@tsci/";

/// A file inside an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub package_name: String,
    /// Path inside the package, without a leading `dist/`
    pub file_path: String,
}

impl PackageReference {
    /// Parse the part of `path` after the last `node_modules/` segment.
    ///
    /// Registry packages published as `@tsci/author.pkg` are addressed as
    /// `@author/pkg` by the package download endpoint.
    pub fn parse(path: &str) -> Option<Self> {
        let normalized = path.replace('\\', "/");
        let start = normalized.rfind(NODE_MODULES)?;
        let rest = &normalized[start + NODE_MODULES.len()..];

        let mut segments = rest.splitn(3, '/');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let (package_name, file_path) = if first.starts_with('@') {
            let name = segments.next().filter(|s| !s.is_empty())?;
            (format!("{}/{}", first, name), segments.next()?.to_string())
        } else {
            let tail: Vec<&str> = segments.collect();
            (first.to_string(), tail.join("/"))
        };

        let file_path = file_path.trim_start_matches('/');
        let file_path = file_path.strip_prefix("dist/").unwrap_or(file_path);
        if file_path.is_empty() {
            return None;
        }

        Some(Self {
            package_name: rewrite_registry_scope(&package_name),
            file_path: file_path.to_string(),
        })
    }

    /// Download URL through the project's package file endpoint
    pub fn download_url(&self, project_base_url: &str) -> String {
        format!(
            "{}/package_files/download?package_name_with_version={}@latest&file_path=dist/{}",
            project_base_url.trim_end_matches('/'),
            self.package_name,
            self.file_path
        )
    }
}

fn rewrite_registry_scope(package_name: &str) -> String {
    match package_name.strip_prefix(REGISTRY_SCOPE) {
        Some(unscoped) => match unscoped.split_once('.') {
            Some((author, name)) if !author.is_empty() && !name.is_empty() => {
                format!("@{}/{}", author, name)
            }
            _ => package_name.to_string(),
        },
        None => package_name.to_string(),
    }
}

/// `true` for `scheme:` prefixes other than a Windows drive letter
fn has_scheme(raw: &str) -> bool {
    Url::parse(raw).map(|u| u.scheme().len() > 1).unwrap_or(false)
}

fn is_windows_absolute(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// `file://` URL for an absolute Unix or Windows path
fn absolute_path_url(raw: &str) -> Result<String> {
    let normalized = raw.replace('\\', "/");
    let text = if is_windows_absolute(&normalized) {
        format!("file:///{}", normalized)
    } else {
        format!("file://{}", normalized)
    };
    Url::parse(&text)
        .map(String::from)
        .map_err(|e| LoadError::fetch(raw, format!("invalid file path: {e}")))
}

fn current_dir_url() -> Result<Url> {
    let dir = std::env::current_dir().map_err(|e| LoadError::fetch(".", e))?;
    Url::from_directory_path(&dir)
        .map_err(|_| LoadError::fetch(dir.display().to_string(), "working directory is not a valid file URL base"))
}

/// Resolve a model reference to a fetchable URL
pub fn resolve_model_url(raw: &str, project_base_url: Option<&str>) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LoadError::fetch(raw, "empty model URL"));
    }

    if has_scheme(raw) {
        return Ok(raw.to_string());
    }

    let project_base_url = project_base_url.map(str::trim).filter(|b| !b.is_empty());

    if let (Some(base), Some(package)) = (project_base_url, PackageReference::parse(raw)) {
        return Ok(package.download_url(base));
    }

    if raw.starts_with('/') || is_windows_absolute(raw) {
        return absolute_path_url(raw);
    }

    let base = match project_base_url {
        Some(base) => {
            let with_slash = if base.ends_with('/') {
                base.to_string()
            } else {
                format!("{}/", base)
            };
            Url::parse(&with_slash).map_err(|e| LoadError::fetch(base, format!("invalid project base URL: {e}")))?
        }
        None => current_dir_url()?,
    };

    base.join(&raw.replace('\\', "/"))
        .map(String::from)
        .map_err(|e| LoadError::fetch(raw, format!("cannot resolve against {base}: {e}")))
}
