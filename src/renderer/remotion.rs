use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::error::{Result, ReelError};
use super::{CompositionInfo, RenderOptions, Renderer, RendererCommand, RendererCommandBuilder};

/// Renderer backed by the Remotion CLI (`npx remotion ...`)
pub struct RemotionCliRenderer {
    config: RenderConfig,
    command_builder: RendererCommandBuilder,
}

impl RemotionCliRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let command_builder = RendererCommandBuilder::new(&config.binary, &config.package);

        Self {
            config,
            command_builder,
        }
    }

    pub fn bundle_command(&self, entry: &Path, out_dir: &Path, public_dir: &Path) -> RendererCommand {
        self.command_builder
            .subcommand("bundle", "Bundling")
            .path(entry)
            .path_option("out-dir", out_dir)
            .path_option("public-dir", public_dir)
            .option("log", &self.config.log_level)
    }

    pub fn compositions_command(&self, bundle: &Path, public_dir: &Path) -> RendererCommand {
        self.command_builder
            .subcommand("compositions", "Composition discovery")
            .path(bundle)
            .path_option("public-dir", public_dir)
            .flag("quiet")
    }

    pub fn render_command(
        &self,
        composition: &CompositionInfo,
        bundle: &Path,
        public_dir: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> RendererCommand {
        let last_frame = options.duration_in_frames.saturating_sub(1);

        self.command_builder
            .subcommand("render", format!("Rendering {}", composition.id))
            .path(bundle)
            .arg(&composition.id)
            .path(output)
            .path_option("public-dir", public_dir)
            .option("codec", &options.codec)
            .option("pixel-format", &options.pixel_format)
            .option("crf", options.crf.to_string())
            .option("concurrency", options.concurrency.to_string())
            .option("width", options.width.to_string())
            .option("height", options.height.to_string())
            .option("frames", format!("0-{}", last_frame))
            .option("log", &options.log_level)
            .flag("overwrite")
            .args(options.browser_flags.iter().cloned())
    }
}

/// Parse `compositions --quiet` output: whitespace-separated identifiers
fn parse_composition_ids(stdout: &str) -> Vec<CompositionInfo> {
    stdout.split_whitespace().map(CompositionInfo::new).collect()
}

#[async_trait]
impl Renderer for RemotionCliRenderer {
    async fn bundle(&self, entry: &Path, out_dir: &Path, public_dir: &Path) -> Result<PathBuf> {
        info!("Bundling project from {}", entry.display());

        self.bundle_command(entry, out_dir, public_dir)
            .execute(ReelError::Bundle)
            .await?;

        if !out_dir.is_dir() {
            return Err(ReelError::Bundle(format!(
                "bundler reported success but {} does not exist",
                out_dir.display()
            )));
        }

        info!("Bundle written to {}", out_dir.display());
        Ok(out_dir.to_path_buf())
    }

    async fn discover_compositions(
        &self,
        bundle: &Path,
        public_dir: &Path,
    ) -> Result<Vec<CompositionInfo>> {
        info!("Getting compositions from {}", bundle.display());

        let stdout = self
            .compositions_command(bundle, public_dir)
            .execute(ReelError::Bundle)
            .await?;

        let compositions = parse_composition_ids(&stdout);
        debug!(
            "Discovered compositions: {:?}",
            compositions.iter().map(|c| c.id.as_str()).collect::<Vec<_>>()
        );
        Ok(compositions)
    }

    async fn render(
        &self,
        composition: &CompositionInfo,
        bundle: &Path,
        public_dir: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> Result<()> {
        info!("Rendering {} to {}. This may take a few minutes.", composition.id, output.display());

        self.render_command(composition, bundle, public_dir, output, options)
            .execute(ReelError::Render)
            .await?;

        if !output.is_file() {
            return Err(ReelError::Render(format!(
                "renderer reported success but {} was not written",
                output.display()
            )));
        }

        info!("Render completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        let stdout = self
            .command_builder
            .version_check()
            .execute(|message| ReelError::Config(format!("Renderer not available: {}", message)))
            .await?;

        let version = stdout.lines().next().unwrap_or("Unknown version").trim().to_string();
        info!("Renderer is available: {}", version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn options() -> RenderOptions {
        RenderOptions {
            codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            crf: 18,
            concurrency: 2,
            width: 1920,
            height: 1080,
            fps: 30,
            duration_in_frames: 2400,
            browser_flags: vec!["--gl=swangle".to_string()],
            log_level: "verbose".to_string(),
        }
    }

    #[test]
    fn test_parse_composition_ids() {
        let ids = parse_composition_ids("Intro  EducationalVideo\nOutro\n");
        assert_eq!(
            ids.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["Intro", "EducationalVideo", "Outro"]
        );
        assert!(parse_composition_ids("  \n").is_empty());
    }

    #[test]
    fn test_render_command_passes_options_through() {
        let renderer = RemotionCliRenderer::new(Config::default().render);
        let cmd = renderer.render_command(
            &CompositionInfo::new("EducationalVideo"),
            Path::new("/ws/bundle"),
            Path::new("/ws/public"),
            Path::new("/out/output.mp4"),
            &options(),
        );

        assert_eq!(cmd.binary_path, "npx");
        assert_eq!(&cmd.args[..5], &["remotion", "render", "/ws/bundle", "EducationalVideo", "/out/output.mp4"]);
        let joined = cmd.args.join(" ");
        assert!(joined.contains("--codec h264"));
        assert!(joined.contains("--pixel-format yuv420p"));
        assert!(joined.contains("--crf 18"));
        assert!(joined.contains("--concurrency 2"));
        assert!(joined.contains("--frames 0-2399"));
        assert!(joined.contains("--log verbose"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("--gl=swangle"));
    }

    #[test]
    fn test_bundle_command() {
        let renderer = RemotionCliRenderer::new(Config::default().render);
        let cmd = renderer.bundle_command(
            Path::new("/ws/src/index.tsx"),
            Path::new("/ws/bundle"),
            Path::new("/ws/public"),
        );
        assert_eq!(
            cmd.args,
            vec![
                "remotion", "bundle", "/ws/src/index.tsx",
                "--out-dir", "/ws/bundle",
                "--public-dir", "/ws/public",
                "--log", "info",
            ]
        );
    }

    /// Stand-in for the Remotion CLI, run as `sh <script> <subcommand> ...`
    #[cfg(unix)]
    fn fake_cli(dir: &Path) -> RemotionCliRenderer {
        let script = dir.join("fake-remotion.sh");
        std::fs::write(
            &script,
            r#"case "$1" in
  bundle) mkdir -p "$4" ;;
  compositions) echo "Intro EducationalVideo" ;;
  render) echo rendered > "$4" ;;
  versions) echo "remotion 4.0.0" ;;
  *) echo "unknown command $1" >&2; exit 2 ;;
esac
"#,
        )
        .unwrap();

        let mut config = Config::default().render;
        config.binary = "sh".to_string();
        config.package = script.to_string_lossy().to_string();
        RemotionCliRenderer::new(config)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_cli_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_cli(dir.path());
        let public = dir.path().join("public");
        let output = dir.path().join("out.mp4");

        let bundle = renderer
            .bundle(&dir.path().join("index.tsx"), &dir.path().join("bundle"), &public)
            .await
            .unwrap();
        assert!(bundle.is_dir());

        let compositions = renderer.discover_compositions(&bundle, &public).await.unwrap();
        assert_eq!(compositions.len(), 2);
        assert_eq!(compositions[1].id, "EducationalVideo");

        renderer
            .render(&compositions[1], &bundle, &public, &output, &options())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap().trim(), "rendered");

        assert_eq!(renderer.check_availability().await.unwrap(), "remotion 4.0.0");
    }

    #[tokio::test]
    async fn test_missing_launcher_is_bundle_error() {
        let mut config = Config::default().render;
        config.binary = "reelsmith-definitely-missing-binary".to_string();
        let renderer = RemotionCliRenderer::new(config);

        let dir = tempfile::tempdir().unwrap();
        let err = renderer
            .bundle(&dir.path().join("index.tsx"), &dir.path().join("bundle"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Bundle(_)));
        assert!(matches!(renderer.check_availability().await, Err(ReelError::Config(_))));
    }
}
