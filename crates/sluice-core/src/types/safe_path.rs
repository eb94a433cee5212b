//! Validated archive entry path.

use crate::IngestError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::StagingDir;

/// Maximum number of components accepted in one entry name.
pub const MAX_PATH_DEPTH: usize = 64;

/// An archive entry name that has been proven to stay inside the staging
/// directory.
///
/// `SafePath` can only be constructed through [`SafePath::validate`]. It
/// rejects:
/// - null bytes
/// - absolute paths (including Windows drive prefixes)
/// - parent directory components (`..`)
/// - names that normalize to nothing
/// - names deeper than [`MAX_PATH_DEPTH`]
/// - names whose resolution leaves the staging directory
///
/// Backslashes are treated as separators, so `..\..\evil` is caught too.
///
/// # Examples
///
/// ```no_run
/// use sluice_core::types::{SafePath, StagingDir};
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let staging = StagingDir::create_in(Path::new("/tmp"))?;
///
/// let safe = SafePath::validate("maps/shape1.shp", &staging)?;
/// assert_eq!(safe.file_name(), "shape1.shp");
/// assert_eq!(safe.directory_label().as_deref(), Some("maps"));
///
/// assert!(SafePath::validate("../etc/passwd", &staging).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates an entry name against the staging directory.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::PathTraversal` for any rejected name, or
    /// `IngestError::Io` if the staging directory cannot be inspected.
    pub fn validate(name: &str, staging: &StagingDir) -> Result<Self> {
        let traversal = || IngestError::PathTraversal {
            path: PathBuf::from(name),
        };

        if name.contains('\0') {
            return Err(traversal());
        }

        let unified = name.replace('\\', "/");
        let path = Path::new(&unified);

        let mut normalized = PathBuf::new();
        let mut depth = 0;
        for component in path.components() {
            match component {
                Component::Normal(comp) => {
                    // drive-letter style prefixes on non-Windows hosts
                    if comp.to_string_lossy().contains(':') && depth == 0 {
                        return Err(traversal());
                    }
                    depth += 1;
                    normalized.push(comp);
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(traversal());
                }
            }
        }

        if depth == 0 {
            return Err(traversal());
        }
        if depth > MAX_PATH_DEPTH {
            return Err(traversal());
        }

        let root = staging.path();
        let resolved = root.join(&normalized);

        // The name itself cannot escape after the checks above, but an
        // existing symlinked parent could.
        if let Some(parent) = resolved.parent() {
            match parent.canonicalize() {
                Ok(canonical_parent) => {
                    if !canonical_parent.starts_with(root) {
                        return Err(traversal());
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(IngestError::Io(e)),
            }
        }

        if !resolved.starts_with(root) {
            return Err(traversal());
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used as the logical file label.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Folder part of the entry, `/`-separated, or `None` at the root.
    #[must_use]
    pub fn directory_label(&self) -> Option<String> {
        let parent = self.0.parent()?;
        let parts: Vec<_> = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}
