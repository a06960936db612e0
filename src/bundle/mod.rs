//! Bundle materialization.
//!
//! In bundle mode every examined revision is exported, written into one
//! run-scoped temporary directory and unpacked next to it. The directory is
//! a `tempfile::TempDir`, so it is removed when the workspace is closed or
//! dropped, whichever way the run ends.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::api::{ExportedBundle, ManagementApi};
use crate::error::Result;
use crate::model::RevisionContext;

const PREFIX: &str = "proxyscan";

/// Run-scoped directory holding exported and unpacked bundles.
#[derive(Debug)]
pub struct BundleWorkspace {
    dir: TempDir,
}

impl BundleWorkspace {
    /// Create the workspace under the system temp directory, or under
    /// `parent` when given.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "bundle workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Export one revision and unpack it; the returned context points at the
    /// unpacked bundle.
    pub async fn materialize(
        &self,
        api: &dyn ManagementApi,
        name: &str,
        revision: u32,
    ) -> Result<RevisionContext> {
        let exported = api.export_bundle(name, revision).await?;
        let bundle_dir = self.unpack(name, revision, &exported)?;
        Ok(RevisionContext::new(name, revision).with_bundle_dir(bundle_dir))
    }

    /// Write the archive into the workspace and extract it to
    /// `proxy-<name>-r<revision>`.
    pub fn unpack(&self, name: &str, revision: u32, bundle: &ExportedBundle) -> Result<PathBuf> {
        let archive_path = self.path().join(safe_component(&bundle.filename));
        std::fs::write(&archive_path, &bundle.bytes)?;

        let dest = self
            .path()
            .join(format!("proxy-{}-r{revision}", safe_component(name)));
        let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
        archive.extract(&dest)?;

        tracing::debug!(
            proxy = %name,
            revision,
            entries = archive.len(),
            "bundle unpacked"
        );
        Ok(dest)
    }

    /// Remove the workspace now, reporting any failure.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Keep a name usable as a single path component inside the workspace.
fn safe_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".into(),
        _ => cleaned,
    }
}
