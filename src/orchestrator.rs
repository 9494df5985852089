use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::config::{Config, RenderJob};
use crate::error::{Result, ReelError};
use crate::fetch::{AssetFetcher, HttpFetcher};
use crate::renderer::{select_composition, CompositionInfo, RenderOptions, Renderer, RendererFactory};
use crate::template::CompositionTemplate;
use crate::workspace::Workspace;

/// Drives one render from configuration to a finished video file
pub struct RenderOrchestrator {
    config: Config,
    renderer: Box<dyn Renderer>,
    fetcher: Box<dyn AssetFetcher>,
}

impl RenderOrchestrator {
    pub fn new(config: Config, renderer: Box<dyn Renderer>, fetcher: Box<dyn AssetFetcher>) -> Self {
        Self {
            config,
            renderer,
            fetcher,
        }
    }

    /// Build an orchestrator with the default renderer and HTTP fetcher
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.audio.timeout_secs.map(Duration::from_secs))?;
        let renderer = RendererFactory::create(config.render.clone());
        Ok(Self::new(config, renderer, Box::new(fetcher)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the job relative to the current directory
    pub async fn run_render_job(&self) -> Result<PathBuf> {
        let base_dir = std::env::current_dir()?;
        self.run_render_job_in(&base_dir, Local::now()).await
    }

    /// Run the job with an explicit base directory and start time.
    ///
    /// The workspace is released on every path out of here; when both a step
    /// and the release fail, the step's error is returned.
    pub async fn run_render_job_in(&self, base_dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
        let job = self.config.render_job(base_dir, now);
        info!(
            "Starting render of {} ({}x{} @ {} fps, {} frames)",
            job.composition_id, job.width, job.height, job.fps, job.duration_in_frames
        );

        let workspace = Workspace::create(self.config.workspace.root.as_deref())?;
        let result = self.run_steps(&workspace, &job).await;

        match (result, workspace.release()) {
            (Ok(output), Ok(())) => {
                info!("Render complete! Video saved to {}", output.display());
                Ok(output)
            }
            (Ok(_), Err(release_error)) => Err(release_error),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_error)) => {
                warn!("Failed to clean up workspace: {}", release_error);
                Err(e)
            }
        }
    }

    async fn run_steps(&self, workspace: &Workspace, job: &RenderJob) -> Result<PathBuf> {
        let subtitles = self.config.subtitle_track();
        subtitles.log_warnings();
        if subtitles.is_empty() {
            warn!("No subtitle cues configured, rendering without captions");
        }

        let template = CompositionTemplate::load(&self.config.composition).await?;
        let vars = CompositionTemplate::variables(
            &self.config.composition,
            job.duration_in_frames,
            &self.config.audio.file_name,
        );
        let (entry_source, composition_source) = template.expand(&vars)?;
        let entry = workspace
            .materialize(
                &entry_source,
                &composition_source,
                &subtitles,
                self.config.composition.subtitle_mode,
            )
            .await?;

        let public_dir = workspace.public_dir();
        let audio_path = public_dir.join(&self.config.audio.file_name);
        self.fetcher.fetch(&job.audio_source_url, &audio_path).await?;

        let bundle = self
            .renderer
            .bundle(&entry, &workspace.bundle_dir(), &public_dir)
            .await?;

        let composition = self
            .discover_composition(&bundle, &public_dir, &job.composition_id)
            .await?;

        if let Some(parent) = job.output_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let options = RenderOptions::from_job(job, &self.config.render);
        let render = self
            .renderer
            .render(&composition, &bundle, &public_dir, &job.output_path, &options);

        match self.config.render.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), render)
                .await
                .map_err(|_| ReelError::RenderTimeout(secs))??,
            None => render.await?,
        }

        Ok(job.output_path.clone())
    }

    /// Find `composition_id` among the compositions the bundle exposes
    pub async fn discover_composition(
        &self,
        bundle: &Path,
        public_dir: &Path,
        composition_id: &str,
    ) -> Result<CompositionInfo> {
        let compositions = self.renderer.discover_compositions(bundle, public_dir).await?;
        select_composition(&compositions, composition_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockAssetFetcher;
    use crate::renderer::MockRenderer;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Fixture {
        root: assert_fs::TempDir,
        cwd: assert_fs::TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let root = assert_fs::TempDir::new().unwrap();
            let cwd = assert_fs::TempDir::new().unwrap();
            let mut config = Config::default();
            config.audio.url = "https://example.com/narration.mp3".to_string();
            config.workspace.root = Some(root.path().to_path_buf());
            Self { root, cwd, config }
        }

        fn workspaces_left(&self) -> usize {
            std::fs::read_dir(self.root.path()).unwrap().count()
        }

        fn output(&self) -> PathBuf {
            self.cwd.path().join("output.mp4")
        }

        async fn run(&self, renderer: impl Renderer + 'static, fetcher: impl AssetFetcher + 'static) -> Result<PathBuf> {
            let orchestrator = RenderOrchestrator::new(self.config.clone(), Box::new(renderer), Box::new(fetcher));
            let now = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
            orchestrator.run_render_job_in(self.cwd.path(), now).await
        }
    }

    fn working_fetcher() -> MockAssetFetcher {
        let mut fetcher = MockAssetFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, dest| url == "https://example.com/narration.mp3" && dest.ends_with("public/audio.mp3"))
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"ID3").unwrap();
                Ok(3)
            });
        fetcher
    }

    fn expect_bundle_ok(renderer: &mut MockRenderer) {
        renderer
            .expect_bundle()
            .times(1)
            .returning(|entry, out_dir, public_dir| {
                assert!(entry.is_file());
                assert!(public_dir.join("audio.mp3").is_file());
                std::fs::create_dir_all(out_dir).unwrap();
                Ok(out_dir.to_path_buf())
            });
    }

    fn expect_discover(renderer: &mut MockRenderer, ids: &'static [&'static str]) {
        renderer
            .expect_discover_compositions()
            .times(1)
            .returning(move |_, _| Ok(ids.iter().map(|id| CompositionInfo::new(*id)).collect()));
    }

    #[tokio::test]
    async fn test_successful_render_writes_output_and_cleans_up() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        expect_bundle_ok(&mut renderer);
        expect_discover(&mut renderer, &["Intro", "EducationalVideo"]);
        renderer
            .expect_render()
            .withf(|composition, _, _, _, options| {
                composition.id == "EducationalVideo"
                    && options.codec == "h264"
                    && options.pixel_format == "yuv420p"
                    && options.duration_in_frames == 2400
            })
            .times(1)
            .returning(|_, _, _, output, _| {
                std::fs::write(output, b"mp4").unwrap();
                Ok(())
            });

        let output = fixture.run(renderer, working_fetcher()).await.unwrap();

        assert_eq!(output, fixture.output());
        assert_eq!(std::fs::read(&output).unwrap(), b"mp4");
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_fetch_404_stops_before_bundle() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        renderer.expect_bundle().never();
        renderer.expect_discover_compositions().never();
        renderer.expect_render().never();

        let mut fetcher = MockAssetFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url, _| {
            Err(ReelError::AssetFetch {
                url: url.to_string(),
                status: Some(404),
                message: "Not Found".to_string(),
            })
        });

        let err = fixture.run(renderer, fetcher).await.unwrap_err();

        assert_eq!(err.http_status(), Some(404));
        assert_eq!(fixture.workspaces_left(), 0);
        assert!(!fixture.output().exists());
    }

    #[tokio::test]
    async fn test_missing_composition_stops_before_render() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        expect_bundle_ok(&mut renderer);
        expect_discover(&mut renderer, &["Intro", "Outro"]);
        renderer.expect_render().never();

        let err = fixture.run(renderer, working_fetcher()).await.unwrap_err();

        assert!(matches!(err, ReelError::CompositionNotFound { ref id, .. } if id == "EducationalVideo"));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_template_failure_cleans_up() {
        let mut fixture = Fixture::new();
        fixture.config.composition.template = Some(fixture.cwd.path().join("missing.tsx"));

        let mut renderer = MockRenderer::new();
        renderer.expect_bundle().never();
        let mut fetcher = MockAssetFetcher::new();
        fetcher.expect_fetch().never();

        let err = fixture.run(renderer, fetcher).await.unwrap_err();

        assert!(matches!(err, ReelError::Template(_)));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_bundle_failure_cleans_up() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        renderer
            .expect_bundle()
            .times(1)
            .returning(|_, _, _| Err(ReelError::Bundle("syntax error in Composition.tsx".to_string())));
        renderer.expect_discover_compositions().never();
        renderer.expect_render().never();

        let err = fixture.run(renderer, working_fetcher()).await.unwrap_err();

        assert!(matches!(err, ReelError::Bundle(ref m) if m.contains("syntax error")));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_discovery_failure_cleans_up() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        expect_bundle_ok(&mut renderer);
        renderer
            .expect_discover_compositions()
            .times(1)
            .returning(|_, _| Err(ReelError::Bundle("browser crashed".to_string())));
        renderer.expect_render().never();

        let err = fixture.run(renderer, working_fetcher()).await.unwrap_err();

        assert!(matches!(err, ReelError::Bundle(_)));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_render_failure_cleans_up() {
        let fixture = Fixture::new();
        let mut renderer = MockRenderer::new();
        expect_bundle_ok(&mut renderer);
        expect_discover(&mut renderer, &["EducationalVideo"]);
        renderer
            .expect_render()
            .times(1)
            .returning(|_, _, _, _, _| Err(ReelError::Render("encoder exited with 137".to_string())));

        let err = fixture.run(renderer, working_fetcher()).await.unwrap_err();

        assert!(matches!(err, ReelError::Render(_)));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[tokio::test]
    async fn test_workspace_creation_failure() {
        let mut fixture = Fixture::new();
        let file = fixture.root.path().join("occupied");
        std::fs::write(&file, b"").unwrap();
        fixture.config.workspace.root = Some(file);

        let mut fetcher = MockAssetFetcher::new();
        fetcher.expect_fetch().never();

        let err = fixture.run(MockRenderer::new(), fetcher).await.unwrap_err();
        assert!(matches!(err, ReelError::WorkspaceCreation(_)));
    }

    #[tokio::test]
    async fn test_discover_composition_selects_exact_match() {
        let mut renderer = MockRenderer::new();
        expect_discover(&mut renderer, &["Main", "MainLong"]);
        let orchestrator = RenderOrchestrator::new(
            Config::default(),
            Box::new(renderer),
            Box::new(MockAssetFetcher::new()),
        );

        let found = orchestrator
            .discover_composition(Path::new("/bundle"), Path::new("/public"), "MainLong")
            .await
            .unwrap();
        assert_eq!(found.id, "MainLong");
    }

    /// Renderer whose render step never finishes in time
    struct StalledRenderer;

    #[async_trait]
    impl Renderer for StalledRenderer {
        async fn bundle(&self, _entry: &Path, out_dir: &Path, _public_dir: &Path) -> Result<PathBuf> {
            Ok(out_dir.to_path_buf())
        }

        async fn discover_compositions(&self, _bundle: &Path, _public_dir: &Path) -> Result<Vec<CompositionInfo>> {
            Ok(vec![CompositionInfo::new("EducationalVideo")])
        }

        async fn render(
            &self,
            _composition: &CompositionInfo,
            _bundle: &Path,
            _public_dir: &Path,
            _output: &Path,
            _options: &RenderOptions,
        ) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn check_availability(&self) -> Result<String> {
            Ok("stalled".to_string())
        }
    }

    #[tokio::test]
    async fn test_render_timeout_cleans_up() {
        let mut fixture = Fixture::new();
        fixture.config.render.timeout_secs = Some(1);

        let err = fixture.run(StalledRenderer, working_fetcher()).await.unwrap_err();

        assert!(matches!(err, ReelError::RenderTimeout(1)));
        assert_eq!(fixture.workspaces_left(), 0);
    }
}
