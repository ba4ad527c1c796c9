//! Integration adapter for a static-site build.
//!
//! The host calls [`Integration::setup`] once per build with the command it is
//! running. Only production builds get an [`ImagePipeline`]; dev servers and
//! previews keep their images untouched. Each Markdown document then goes
//! through [`render_document`].
//!
//! ```no_run
//! use remark_images::config::Options;
//! use remark_images::integration::{BuildCommand, Integration, render_document};
//! use remark_images::pipeline::SitePaths;
//! use std::path::Path;
//!
//! let options = Options::from_toml_str("remoteImages = true").unwrap();
//! let paths = SitePaths::new("public", "dist");
//! if let Some(pipeline) = Integration::new(options).setup(BuildCommand::Build, paths) {
//!     let doc = render_document(&pipeline, "![a cat](/cat.png)", Path::new("src/posts/cats.md"));
//!     println!("{}", doc.html);
//! }
//! ```

use crate::config::{Config, Options, normalize};
use crate::imaging::{DerivativeGenerator, ImageGenerator};
use crate::markdown;
use crate::pipeline::{ImagePipeline, SitePaths, TransformReport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Name the transform registers under in the host.
pub const INTEGRATION_NAME: &str = "remark-images";

/// What the host build system is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCommand {
    Dev,
    Build,
    Preview,
}

impl BuildCommand {
    /// Images are only transformed in production builds.
    pub fn is_production(self) -> bool {
        self == BuildCommand::Build
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildCommand::Dev => "dev",
            BuildCommand::Build => "build",
            BuildCommand::Preview => "preview",
        })
    }
}

/// Holds the user's options until the host says what it is building.
#[derive(Debug, Clone, Default)]
pub struct Integration {
    options: Options,
}

impl Integration {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn name(&self) -> &'static str {
        INTEGRATION_NAME
    }

    /// The normalized configuration these options produce.
    pub fn config(&self) -> Config {
        normalize(Config::default(), self.options.clone())
    }

    /// Build the pipeline with the bundled [`ImageGenerator`].
    ///
    /// Returns `None` unless `command` is a production build.
    pub fn setup(
        &self,
        command: BuildCommand,
        paths: SitePaths,
    ) -> Option<ImagePipeline<ImageGenerator>> {
        self.setup_with(command, paths, ImageGenerator::new())
    }

    /// Same as [`setup`](Self::setup) with a caller-supplied generator.
    pub fn setup_with<G: DerivativeGenerator>(
        &self,
        command: BuildCommand,
        paths: SitePaths,
        generator: G,
    ) -> Option<ImagePipeline<G>> {
        if !command.is_production() {
            tracing::debug!(%command, "image transform disabled outside production builds");
            return None;
        }
        let config = self.config();
        tracing::debug!(
            public_dir = %paths.public_dir.display(),
            out_dir = %paths.out_dir.display(),
            ?config,
            "image transform enabled"
        );
        Some(ImagePipeline::new(config, paths, generator))
    }
}

/// Result of rendering one Markdown document.
#[derive(Debug)]
pub struct RenderedDocument {
    pub html: String,
    pub report: TransformReport,
}

/// Parse `source`, transform its images, and render it to HTML.
pub fn render_document<G: DerivativeGenerator>(
    pipeline: &ImagePipeline<G>,
    source: &str,
    document_path: &Path,
) -> RenderedDocument {
    let mut tree = markdown::parse(source);
    let report = pipeline.transform(&mut tree, document_path);
    RenderedDocument {
        html: markdown::to_html(&tree),
        report,
    }
}
