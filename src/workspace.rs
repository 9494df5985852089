use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info};

use crate::config::SubtitleMode;
use crate::error::{Result, ReelError};
use crate::subtitle::SubtitleTrack;

const WORKSPACE_PREFIX: &str = "reelsmith-";
const SOURCE_DIR: &str = "src";
const PUBLIC_DIR: &str = "public";
const ENTRY_FILE: &str = "index.tsx";
const COMPOSITION_FILE: &str = "Composition.tsx";
const SUBTITLES_FILE: &str = "subtitles.ts";

/// Isolated scratch directory owned by a single render job.
///
/// The directory is removed by [`Workspace::release`]. If the value is dropped
/// without being released (early return, panic), the underlying [`TempDir`]
/// removes it instead, so no job leaves its workspace behind.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named workspace under `root`, or the OS temp dir
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| {
                    ReelError::WorkspaceCreation(format!("{}: {}", root.display(), e))
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| ReelError::WorkspaceCreation(e.to_string()))?;

        info!("Created workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Static assets served to the renderer
    pub fn public_dir(&self) -> PathBuf {
        self.path().join(PUBLIC_DIR)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path().join(SOURCE_DIR)
    }

    /// Output directory for the bundled project
    pub fn bundle_dir(&self) -> PathBuf {
        self.path().join("bundle")
    }

    /// Write the composition project and return its entry point.
    ///
    /// Sources are written as given; mistakes in them surface from the renderer.
    pub async fn materialize(
        &self,
        entry_source: &str,
        composition_source: &str,
        subtitles: &SubtitleTrack,
        mode: SubtitleMode,
    ) -> Result<PathBuf> {
        let source_dir = self.source_dir();
        fs::create_dir_all(&source_dir).await?;
        fs::create_dir_all(self.public_dir()).await?;

        let data_module = subtitles.to_data_module()?;
        let composition = match mode {
            SubtitleMode::Inline => format!("{}\n{}", data_module, composition_source),
            SubtitleMode::SideFile => {
                let subtitles_path = source_dir.join(SUBTITLES_FILE);
                fs::write(&subtitles_path, &data_module).await?;
                debug!("Wrote {} cues to {}", subtitles.len(), subtitles_path.display());
                composition_source.to_string()
            }
        };

        fs::write(source_dir.join(COMPOSITION_FILE), composition).await?;

        let entry_path = source_dir.join(ENTRY_FILE);
        fs::write(&entry_path, entry_source).await?;

        info!("Materialized composition at {}", entry_path.display());
        Ok(entry_path)
    }

    /// Recursively remove the workspace. Consumes the handle, so it runs once.
    pub fn release(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        info!("Cleaned up workspace: {}", path.display());
        Ok(())
    }
}
