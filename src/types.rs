//! Contracts shared between the pipeline, the derivative generator, and the
//! markup renderer.
//!
//! A [`GenerationRequest`] goes into a [`DerivativeGenerator`](crate::imaging::DerivativeGenerator),
//! a [`DerivativeSet`] comes back out. The set is grouped by format (in the
//! order formats were requested) and each group is sorted by ascending width.

use crate::config::{GeneratorOptions, Width};
use crate::naming::FilenameFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Raster format of a generated derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
    Tiff,
    Gif,
}

impl OutputFormat {
    /// Name used in filenames and configuration (`"jpeg"`, `"webp"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
        }
    }

    /// MIME type for the `type` attribute of a `<source>` element.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
        }
    }

    /// Parse a configured format name. `"jpg"` is accepted as an alias.
    ///
    /// Returns `None` for unknown names and for `"auto"`, which is resolved
    /// against the source image by the generator.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "tiff" | "tif" => Some(Self::Tiff),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    /// Where the file was written.
    pub output_path: PathBuf,
    /// Public URL: the request's URL prefix joined with `filename`.
    pub url: String,
    /// MIME type, e.g. `image/webp`.
    pub source_type: String,
    /// Encoded size in bytes.
    pub size: u64,
}

/// All derivatives of one format, ascending by width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatGroup {
    pub format: OutputFormat,
    pub derivatives: Vec<Derivative>,
}

impl FormatGroup {
    /// The widest derivative in the group.
    pub fn largest(&self) -> Option<&Derivative> {
        self.derivatives.iter().max_by_key(|d| d.width)
    }
}

/// Generation result for one source image, grouped by format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeSet {
    groups: Vec<FormatGroup>,
}

impl DerivativeSet {
    /// Group derivatives by format, keeping formats in first-seen order and
    /// sorting each group by ascending width.
    pub fn from_derivatives(derivatives: impl IntoIterator<Item = Derivative>) -> Self {
        let mut groups: Vec<FormatGroup> = Vec::new();
        for derivative in derivatives {
            match groups.iter_mut().find(|g| g.format == derivative.format) {
                Some(group) => group.derivatives.push(derivative),
                None => groups.push(FormatGroup {
                    format: derivative.format,
                    derivatives: vec![derivative],
                }),
            }
        }
        for group in &mut groups {
            group.derivatives.sort_by_key(|d| d.width);
        }
        groups.retain(|g| !g.derivatives.is_empty());
        Self { groups }
    }

    /// True when the generator produced no files at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[FormatGroup] {
        &self.groups
    }

    pub fn get(&self, format: OutputFormat) -> Option<&FormatGroup> {
        self.groups.iter().find(|g| g.format == format)
    }

    /// Every derivative, format by format.
    pub fn iter(&self) -> impl Iterator<Item = &Derivative> {
        self.groups.iter().flat_map(|g| g.derivatives.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.derivatives.len()).sum()
    }
}

/// Everything the generator needs for one image reference.
///
/// Placement (`output_dir`, `url_prefix`, `filename_format`) is decided per
/// node by the pipeline and always wins over the configured generator options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Local filesystem path or remote URL.
    pub source: String,
    pub is_remote: bool,
    pub output_dir: PathBuf,
    /// Public URL directory the generated files are served from.
    pub url_prefix: String,
    pub filename_format: FilenameFormat,
    pub widths: Vec<Width>,
    pub formats: Vec<String>,
    pub encoder_options: serde_json::Map<String, serde_json::Value>,
    pub cache_enabled: bool,
}

/// Per-node placement layered over [`GeneratorOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub output_dir: PathBuf,
    pub url_prefix: String,
    pub filename_format: FilenameFormat,
    /// Replaces the configured format list when set.
    pub formats: Option<Vec<String>>,
}

impl GenerationRequest {
    pub fn new(
        source: impl Into<String>,
        is_remote: bool,
        options: &GeneratorOptions,
        placement: Placement,
    ) -> Self {
        Self {
            source: source.into(),
            is_remote,
            output_dir: placement.output_dir,
            url_prefix: placement.url_prefix,
            filename_format: placement.filename_format,
            widths: options.widths.clone(),
            formats: placement.formats.unwrap_or_else(|| options.formats.clone()),
            encoder_options: options.encoder_options.clone(),
            cache_enabled: options.cache_enabled,
        }
    }
}
