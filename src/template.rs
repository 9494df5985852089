// Composition templates
//
// Composition sources are kept as template files with `<%= name %>` placeholders
// rather than being assembled by string concatenation. JSX already uses `{{ }}`
// for inline styles, so the delimiters are ERB-style. The expansion step knows
// nothing about the renderer; it only substitutes values.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::{CompositionConfig, SubtitleMode};
use crate::error::{Result, ReelError};

const DEFAULT_ENTRY_TEMPLATE: &str = include_str!("../templates/index.tsx.tmpl");
const DEFAULT_COMPOSITION_TEMPLATE: &str = include_str!("../templates/Composition.tsx.tmpl");

/// Values available to a template
pub type TemplateVars = BTreeMap<String, String>;

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// Replace every `<%= name %>` placeholder with its value from `vars`
pub fn expand(template: &str, vars: &TemplateVars) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + OPEN.len()..];

        let close = after_open.find(CLOSE).ok_or_else(|| {
            let offset = template.len() - rest.len() + open;
            let line = template[..offset].matches('\n').count() + 1;
            ReelError::Template(format!("unterminated placeholder on line {}", line))
        })?;

        let name = after_open[..close].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| ReelError::Template(format!("unknown placeholder '{}'", name)))?;
        output.push_str(value);

        rest = &after_open[close + CLOSE.len()..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Entry and composition sources for one profile
#[derive(Debug, Clone)]
pub struct CompositionTemplate {
    pub entry: String,
    pub composition: String,
}

impl Default for CompositionTemplate {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY_TEMPLATE.to_string(),
            composition: DEFAULT_COMPOSITION_TEMPLATE.to_string(),
        }
    }
}

impl CompositionTemplate {
    /// Load the configured templates, falling back to the built-in ones
    pub async fn load(config: &CompositionConfig) -> Result<Self> {
        let mut template = Self::default();

        if let Some(path) = &config.template {
            template.composition = read_template(path).await?;
        }
        if let Some(path) = &config.entry_template {
            template.entry = read_template(path).await?;
        }

        Ok(template)
    }

    /// Standard variables for a composition
    pub fn variables(
        config: &CompositionConfig,
        duration_in_frames: u64,
        audio_file: &str,
    ) -> TemplateVars {
        let subtitles_import = match config.subtitle_mode {
            SubtitleMode::SideFile => "import { SUBTITLES } from './subtitles';".to_string(),
            SubtitleMode::Inline => String::new(),
        };

        let mut vars = TemplateVars::new();
        vars.insert("composition_id".to_string(), config.id.clone());
        vars.insert("width".to_string(), config.width.to_string());
        vars.insert("height".to_string(), config.height.to_string());
        vars.insert("fps".to_string(), config.fps.to_string());
        vars.insert("duration_in_frames".to_string(), duration_in_frames.to_string());
        vars.insert("audio_file".to_string(), audio_file.to_string());
        vars.insert("subtitles_import".to_string(), subtitles_import);
        vars
    }

    /// Expand both templates with the given variables
    pub fn expand(&self, vars: &TemplateVars) -> Result<(String, String)> {
        let entry = expand(&self.entry, vars)?;
        let composition = expand(&self.composition, vars)?;
        Ok((entry, composition))
    }
}

async fn read_template(path: &Path) -> Result<String> {
    debug!("Loading template from {}", path.display());
    tokio::fs::read_to_string(path).await.map_err(|e| {
        ReelError::Template(format!("failed to read template {}: {}", path.display(), e))
    })
}
