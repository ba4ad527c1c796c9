//! Plugin configuration.
//!
//! Users supply a sparse [`Options`] object; [`normalize`] merges it over the
//! stock defaults and returns an immutable [`Config`] that is threaded through
//! the pipeline explicitly.
//!
//! ## Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! sizes = "(max-width: 700px) 100vw, 700px"  # `sizes` attribute of every <source>
//! remoteImages = false                       # process http(s) image references
//! altRequired = true                         # skip images without alt text
//!
//! [generator]                  # also accepted as [eleventyImageConfig]
//! widths = ["auto", 600, 1000, 1400]
//! formats = ["auto"]
//! cacheEnabled = false
//!
//! [generator.encoderOptions]
//! quality = 90
//! ```
//!
//! ## Merge Semantics
//!
//! Top-level keys replace the defaults. The `generator` table merges one level
//! deep: keys the user sets win, keys the user omits keep their default.
//!
//! The generator never upscales, so the width list must always request the
//! source's native width. After merging, a list without `"auto"` (or `null`)
//! gets it prepended.

use crate::markup::{DefaultRenderer, PictureRenderer};
use crate::naming::FilenameFormat;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyword for the native (no-upscale) width.
pub const NATIVE_WIDTH: &str = "auto";

/// Format keyword meaning "keep the source format".
pub const AUTO_FORMAT: &str = "auto";

/// A requested derivative width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// The source image's own width.
    Native,
    Pixels(u32),
}

impl Serialize for Width {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Width::Native => serializer.serialize_str(NATIVE_WIDTH),
            Width::Pixels(px) => serializer.serialize_u32(*px),
        }
    }
}

impl<'de> Deserialize<'de> for Width {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Pixels(u32),
            Keyword(String),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(Width::Native),
            Some(Repr::Pixels(px)) => Ok(Width::Pixels(px)),
            Some(Repr::Keyword(k)) if k == NATIVE_WIDTH => Ok(Width::Native),
            Some(Repr::Keyword(k)) => Err(D::Error::custom(format!(
                "unknown width `{k}`, expected a pixel count or \"{NATIVE_WIDTH}\""
            ))),
        }
    }
}

/// Options handed to the derivative generator.
///
/// `formats` and `encoder_options` are passed through untouched; unknown
/// values surface as generation failures, not configuration errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorOptions {
    pub widths: Vec<Width>,
    pub formats: Vec<String>,
    pub encoder_options: serde_json::Map<String, serde_json::Value>,
    pub cache_enabled: bool,
    /// Replaced per image by the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Replaced per image by the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_format: Option<FilenameFormat>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        let mut encoder_options = serde_json::Map::new();
        encoder_options.insert("quality".into(), 90.into());
        Self {
            widths: vec![
                Width::Native,
                Width::Pixels(600),
                Width::Pixels(1000),
                Width::Pixels(1400),
            ],
            formats: vec![AUTO_FORMAT.to_string()],
            encoder_options,
            cache_enabled: false,
            output_dir: None,
            filename_format: None,
        }
    }
}

/// Sparse overrides for [`GeneratorOptions`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorOverrides {
    pub widths: Option<Vec<Width>>,
    pub formats: Option<Vec<String>>,
    pub encoder_options: Option<serde_json::Map<String, serde_json::Value>>,
    pub cache_enabled: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub filename_format: Option<FilenameFormat>,
}

/// User-supplied options. Every field is optional.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Options {
    pub sizes: Option<String>,
    pub remote_images: Option<bool>,
    pub alt_required: Option<bool>,
    #[serde(alias = "eleventyImageConfig")]
    pub generator: Option<GeneratorOverrides>,
    /// Alternative markup renderer. Set in code, never deserialized.
    #[serde(skip)]
    pub custom_markup: Option<Arc<dyn PictureRenderer>>,
}

impl Options {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_markup(mut self, renderer: impl PictureRenderer + 'static) -> Self {
        self.custom_markup = Some(Arc::new(renderer));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("sizes", &self.sizes)
            .field("remote_images", &self.remote_images)
            .field("alt_required", &self.alt_required)
            .field("generator", &self.generator)
            .field("custom_markup", &self.custom_markup.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Normalized configuration. Built once per build, never mutated.
#[derive(Clone)]
pub struct Config {
    /// Passed verbatim to the `sizes` attribute of each `<source>`.
    pub sizes: String,
    pub remote_images: bool,
    pub alt_required: bool,
    pub generator: GeneratorOptions,
    pub markup: Arc<dyn PictureRenderer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sizes: "(max-width: 700px) 100vw, 700px".to_string(),
            remote_images: false,
            alt_required: true,
            generator: GeneratorOptions::default(),
            markup: Arc::new(DefaultRenderer),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sizes", &self.sizes)
            .field("remote_images", &self.remote_images)
            .field("alt_required", &self.alt_required)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

/// Merge `options` over `defaults` and repair the width list.
pub fn normalize(defaults: Config, options: Options) -> Config {
    let mut config = defaults;

    if let Some(sizes) = options.sizes {
        config.sizes = sizes;
    }
    if let Some(remote) = options.remote_images {
        config.remote_images = remote;
    }
    if let Some(alt_required) = options.alt_required {
        config.alt_required = alt_required;
    }
    if let Some(markup) = options.custom_markup {
        config.markup = markup;
    }
    if let Some(overrides) = options.generator {
        config.generator = merge_generator(config.generator, overrides);
    }

    config.generator.widths = ensure_native_width(config.generator.widths);
    config
}

/// One-level merge: set keys replace defaults, unset keys are kept.
pub fn merge_generator(base: GeneratorOptions, overrides: GeneratorOverrides) -> GeneratorOptions {
    GeneratorOptions {
        widths: overrides.widths.unwrap_or(base.widths),
        formats: overrides.formats.unwrap_or(base.formats),
        encoder_options: overrides.encoder_options.unwrap_or(base.encoder_options),
        cache_enabled: overrides.cache_enabled.unwrap_or(base.cache_enabled),
        output_dir: overrides.output_dir.or(base.output_dir),
        filename_format: overrides.filename_format.or(base.filename_format),
    }
}

/// Make sure the native width is requested exactly once.
///
/// A list without it gets it prepended; duplicate markers (e.g. `"auto"` and
/// `null` both supplied) collapse to the first one.
pub fn ensure_native_width(widths: Vec<Width>) -> Vec<Width> {
    if !widths.contains(&Width::Native) {
        let mut repaired = Vec::with_capacity(widths.len() + 1);
        repaired.push(Width::Native);
        repaired.extend(widths);
        return repaired;
    }

    let mut seen_native = false;
    widths
        .into_iter()
        .filter(|w| match w {
            Width::Native if seen_native => false,
            Width::Native => {
                seen_native = true;
                true
            }
            Width::Pixels(_) => true,
        })
        .collect()
}

/// Returns a fully-commented stock options file with every key.
pub fn stock_options_toml() -> &'static str {
    r##"# Responsive image options
# ========================
# All settings are optional. Values shown below are the defaults.

# Value of the `sizes` attribute on every generated <source>.
sizes = "(max-width: 700px) 100vw, 700px"

# Process images referenced by http(s) URL. Off by default: remote sources
# are slower and fail more often.
remoteImages = false

# Skip images without alt text (with a warning). When false, such images
# are processed with an empty alt attribute.
altRequired = true

# ---------------------------------------------------------------------------
# Derivative generation
# ---------------------------------------------------------------------------
[generator]
# Pixel widths to generate. "auto" is the source's own width; it is added
# automatically when missing since images are never upscaled.
widths = ["auto", 600, 1000, 1400]

# Output formats. "auto" keeps the source format.
formats = ["auto"]

# Reuse results for identical sources within one build.
cacheEnabled = false

[generator.encoderOptions]
# Lossy encoding quality (1-100).
quality = 90
"##
}
