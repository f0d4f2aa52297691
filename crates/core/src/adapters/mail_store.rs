//! Raw inbound messages held on the local filesystem.

use crate::inbound::{MailLocation, MailStore};
use crate::{ReportError, ReportResult};
use std::path::{Component, Path, PathBuf};

/// Messages addressed as `<root>/<bucket>/<key>`.
#[derive(Clone, Debug)]
pub struct FsMailStore {
    root: PathBuf,
}

impl FsMailStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a location under the root, rejecting escapes.
    pub fn path_for(&self, location: &MailLocation) -> ReportResult<PathBuf> {
        let bucket = relative_segment(&location.bucket)?;
        let key = relative_segment(&location.key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

fn relative_segment(value: &str) -> ReportResult<&Path> {
    let path = Path::new(value);
    if value.trim().is_empty() {
        return Err(ReportError::MailStore("empty mail store key".into()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ReportError::MailStore(format!(
                    "mail store key '{value}' escapes the store"
                )))
            }
        }
    }
    Ok(path)
}

impl MailStore for FsMailStore {
    fn fetch(&self, location: &MailLocation) -> ReportResult<Vec<u8>> {
        let path = self.path_for(location)?;
        std::fs::read(&path)
            .map_err(|e| ReportError::MailStore(format!("failed to read {}: {e}", path.display())))
    }
}
