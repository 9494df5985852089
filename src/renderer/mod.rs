// Renderer abstraction
//
// The bundling, composition discovery and encoding work is done by an external
// engine. This module defines the contract the orchestrator relies on:
// - Renderer: bundle / discover_compositions / render
// - Commands: process invocation helpers
// - Remotion: implementation driving the Remotion CLI through npx
//
// To plug in another engine, implement `Renderer` and add it to the factory.

pub mod commands;
pub mod remotion;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use commands::*;
pub use remotion::RemotionCliRenderer;

use crate::config::{RenderConfig, RenderJob};
use crate::error::{Result, ReelError};

/// A composition exposed by a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInfo {
    pub id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub duration_in_frames: Option<u64>,
}

impl CompositionInfo {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            width: None,
            height: None,
            fps: None,
            duration_in_frames: None,
        }
    }
}

/// Settings handed through to the renderer without interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub codec: String,
    pub pixel_format: String,
    pub crf: u32,
    pub concurrency: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_in_frames: u64,
    pub browser_flags: Vec<String>,
    pub log_level: String,
}

impl RenderOptions {
    pub fn from_job(job: &RenderJob, config: &RenderConfig) -> Self {
        Self {
            codec: job.codec.clone(),
            pixel_format: config.pixel_format.clone(),
            crf: config.crf,
            concurrency: config.concurrency,
            width: job.width,
            height: job.height,
            fps: job.fps,
            duration_in_frames: job.duration_in_frames,
            browser_flags: config.browser_flags.clone(),
            log_level: config.log_level.clone(),
        }
    }
}

/// Main trait for the external bundling and rendering engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Compile the project at `entry` into a servable bundle inside `out_dir`
    async fn bundle(&self, entry: &Path, out_dir: &Path, public_dir: &Path) -> Result<PathBuf>;

    /// List the compositions a bundle exposes
    async fn discover_compositions(
        &self,
        bundle: &Path,
        public_dir: &Path,
    ) -> Result<Vec<CompositionInfo>>;

    /// Encode `composition` to `output`
    async fn render(
        &self,
        composition: &CompositionInfo,
        bundle: &Path,
        public_dir: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> Result<()>;

    /// Check if the renderer can be launched
    async fn check_availability(&self) -> Result<String>;
}

/// Pick the composition whose id equals `id`
pub fn select_composition(compositions: &[CompositionInfo], id: &str) -> Result<CompositionInfo> {
    compositions
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or_else(|| ReelError::CompositionNotFound {
            id: id.to_string(),
            available: compositions.iter().map(|c| c.id.clone()).collect(),
        })
}

/// Factory for creating renderer instances
pub struct RendererFactory;

impl RendererFactory {
    /// Create the default renderer implementation (Remotion CLI)
    pub fn create(config: RenderConfig) -> Box<dyn Renderer> {
        Box::new(RemotionCliRenderer::new(config))
    }
}
