//! Markup rendering for generated derivatives.
//!
//! Rendering happens in two steps:
//!
//! 1. [`markup_values`] picks the base image and builds one srcset per format.
//!    This part is fixed.
//! 2. A [`PictureRenderer`] turns those values into a markup string. The
//!    [`DefaultRenderer`] emits a `<picture>` element; callers can plug in
//!    their own renderer (any matching closure works) without touching the
//!    pipeline.
//!
//! ## Base Image
//!
//! The `<img>` fallback uses the widest JPEG when JPEG was generated,
//! otherwise the widest derivative of the first format present (remote images
//! are generated in their source format only).

use crate::naming::join_url;
use crate::types::{DerivativeSet, OutputFormat};
use maud::{Markup, html};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format preferred for the base `<img>` element.
pub const PRIMARY_FORMAT: OutputFormat = OutputFormat::Jpeg;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("markup renderer failed: {0}")]
    Renderer(String),
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Renderer(message.into())
    }
}

/// Everything the renderer knows about one image reference.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Public URL directory of the derivatives.
    pub image_dir: &'a str,
    pub metadata: &'a DerivativeSet,
    pub alt: &'a str,
    pub sizes: &'a str,
    pub is_remote: bool,
    /// The Markdown document the reference came from.
    pub md_file_path: &'a Path,
}

/// One `<source>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    /// MIME type.
    pub source_type: String,
    /// `url 600w, url 1000w, ...` in ascending width order.
    pub srcset: String,
    pub sizes: String,
}

/// Values handed to a [`PictureRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupValues {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
    /// Format of the base image.
    pub format: OutputFormat,
    pub sources: Vec<SourceSet>,
    pub is_remote: bool,
    pub md_file_path: PathBuf,
}

impl MarkupValues {
    /// The `<source>` elements alone, for renderers that only change the
    /// surrounding markup.
    pub fn sources_html(&self) -> String {
        render_sources(&self.sources).into_string()
    }
}

/// Turns [`MarkupValues`] into a markup string.
pub trait PictureRenderer: Send + Sync {
    fn render(&self, values: &MarkupValues) -> Result<String, RenderError>;
}

impl<F> PictureRenderer for F
where
    F: Fn(&MarkupValues) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, values: &MarkupValues) -> Result<String, RenderError> {
        self(values)
    }
}

/// Renders a `<picture>` with one `<source>` per format and a lazy `<img>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer;

impl PictureRenderer for DefaultRenderer {
    fn render(&self, values: &MarkupValues) -> Result<String, RenderError> {
        let markup = html! {
            picture {
                (render_sources(&values.sources))
                img src=(values.src)
                    width=(values.width)
                    height=(values.height)
                    alt=(values.alt)
                    loading="lazy"
                    decoding="async";
            }
        };
        Ok(markup.into_string())
    }
}

fn render_sources(sources: &[SourceSet]) -> Markup {
    html! {
        @for source in sources {
            source type=(source.source_type) srcset=(source.srcset) sizes=(source.sizes);
        }
    }
}

/// Compute the values for one image. `None` when nothing was generated.
pub fn markup_values(input: &RenderInput<'_>) -> Option<MarkupValues> {
    let base_group = input
        .metadata
        .get(PRIMARY_FORMAT)
        .or_else(|| input.metadata.groups().first())?;
    let base = base_group.largest()?;

    let sources = input
        .metadata
        .groups()
        .iter()
        .filter_map(|group| {
            let first = group.derivatives.first()?;
            let srcset = group
                .derivatives
                .iter()
                .map(|d| format!("{} {}w", join_url(input.image_dir, &d.filename), d.width))
                .collect::<Vec<_>>()
                .join(", ");
            Some(SourceSet {
                source_type: first.source_type.clone(),
                srcset,
                sizes: input.sizes.to_string(),
            })
        })
        .collect();

    Some(MarkupValues {
        src: join_url(input.image_dir, &base.filename),
        width: base.width,
        height: base.height,
        alt: input.alt.to_string(),
        format: base_group.format,
        sources,
        is_remote: input.is_remote,
        md_file_path: input.md_file_path.to_path_buf(),
    })
}

/// Render one image with `renderer`.
///
/// Returns `Ok(None)` for an empty derivative set and for a renderer that
/// produced an empty string.
pub fn render(
    input: &RenderInput<'_>,
    renderer: &dyn PictureRenderer,
) -> Result<Option<String>, RenderError> {
    let Some(values) = markup_values(input) else {
        return Ok(None);
    };
    let markup = renderer.render(&values)?;
    Ok((!markup.trim().is_empty()).then_some(markup))
}
