use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::warn;

use crate::application::source::{SourceDocument, TemplateSource};
use crate::domain::{SourceError, TemplateId};

/// Reads templates from files below a root directory.
///
/// A template id is a relative path. Ids that are absolute or climb out of the
/// root with `..` are reported as not found.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &TemplateId) -> Result<PathBuf, SourceError> {
        let relative = Path::new(id.as_str());
        let contained = !id.as_str().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        if !contained {
            warn!(
                target = "sagoma::source",
                template_id = %id,
                "Rejected template id outside the template root"
            );
            return Err(SourceError::not_found(id));
        }

        Ok(self.root.join(relative))
    }

    async fn modified(&self, id: &TemplateId, path: &Path) -> Result<OffsetDateTime, SourceError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| map_io(id, err))?;
        if !metadata.is_file() {
            return Err(SourceError::not_found(id));
        }
        let modified = metadata.modified().map_err(|err| SourceError::io(id, err))?;
        Ok(OffsetDateTime::from(modified))
    }
}

fn map_io(id: &TemplateId, err: std::io::Error) -> SourceError {
    match err.kind() {
        ErrorKind::NotFound => SourceError::not_found(id),
        _ => SourceError::io(id, err),
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn read_source(&self, id: &TemplateId) -> Result<SourceDocument, SourceError> {
        let path = self.resolve(id)?;
        // Timestamp first: if the file changes before the read, the entry is
        // stamped older than its content and the next render recompiles.
        let last_modified = self.modified(id, &path).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| map_io(id, err))?;
        let text = String::from_utf8(bytes).map_err(|_| SourceError::encoding(id))?;

        Ok(SourceDocument {
            text,
            last_modified,
        })
    }

    async fn last_modified(&self, id: &TemplateId) -> Result<OffsetDateTime, SourceError> {
        let path = self.resolve(id)?;
        self.modified(id, &path).await
    }
}
