//! Node transform pipeline.
//!
//! Turns Markdown image references into responsive `<picture>` markup, one
//! document at a time.
//!
//! ## Phases
//!
//! ```text
//! 1. Collect   tree (read-only)  →  candidates      (pre-order, eligibility decided)
//! 2. Process   candidates        →  outcomes        (rayon, one request per distinct URL)
//! 3. Apply     outcomes          →  tree mutations  (positional, by NodePath)
//! ```
//!
//! The tree is never mutated while it is being walked. Outcomes are put back
//! in candidate order, so the result does not depend on which worker finishes
//! first. Nodes sharing a URL are handled by one worker, which generates the
//! derivatives once.
//!
//! ## Eligibility
//!
//! Checked in order for every image node:
//!
//! 1. Remote URL while `remoteImages` is off: skipped silently.
//! 2. Missing (or empty) alt text while `altRequired` is on: skipped with a
//!    warning. With `altRequired` off the node gets `alt = ""` and proceeds.
//!
//! ## Failure Isolation
//!
//! Every node ends in exactly one [`NodeOutcome`]. Generation errors, renderer
//! errors and unusable paths become [`NodeOutcome::Failed`]; the node keeps its
//! original content and the rest of the document is still processed.
//! [`ImagePipeline::transform`] itself never fails.

use crate::config::{AUTO_FORMAT, Config};
use crate::document::{Node, NodePath};
use crate::imaging::{DerivativeGenerator, GenerateError, is_remote_url};
use crate::markup::{self, RenderError, RenderInput};
use crate::naming::{FilenameFormat, url_dirname};
use crate::types::{DerivativeSet, GenerationRequest, Placement};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Subdirectory of the output root that receives derivatives of remote images.
pub const REMOTE_OUTPUT_DIR: &str = "arei-optimg";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Invalid image path: {0:?}")]
    InvalidPath(String),
}

/// Build-time locations supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    /// Root that local image URLs resolve against.
    pub public_dir: PathBuf,
    /// Build output root.
    pub out_dir: PathBuf,
}

impl SitePaths {
    pub fn new(public_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
            out_dir: out_dir.into(),
        }
    }
}

/// Why a node was left alone without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RemoteDisabled,
    MissingAlt,
    /// The generator produced no files.
    NoDerivatives,
    /// The renderer returned an empty string.
    EmptyMarkup,
}

#[derive(Debug)]
pub enum NodeOutcome {
    Rendered(String),
    Skipped(SkipReason),
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct NodeReport {
    pub url: String,
    pub path: NodePath,
    pub outcome: NodeOutcome,
}

/// Per-node results of one [`ImagePipeline::transform`] call, in document order.
#[derive(Debug, Default)]
pub struct TransformReport {
    pub entries: Vec<NodeReport>,
}

impl TransformReport {
    pub fn rendered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, NodeOutcome::Rendered(_)))
            .count()
    }

    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, NodeOutcome::Skipped(r) if r == reason))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            NodeOutcome::Failed(err) => Some((e.url.as_str(), err)),
            _ => None,
        })
    }

    /// Emit one log line per node.
    pub fn log(&self, document_path: &Path) {
        let document = document_name(document_path);
        for entry in &self.entries {
            let image = entry.url.as_str();
            match &entry.outcome {
                NodeOutcome::Rendered(_) => {
                    tracing::info!(image, document, "optimized image");
                }
                NodeOutcome::Skipped(SkipReason::MissingAlt) => {
                    tracing::warn!(image, document, "skipped image: missing alt text");
                }
                NodeOutcome::Skipped(reason) => {
                    tracing::debug!(image, document, ?reason, "skipped image");
                }
                NodeOutcome::Failed(error) => {
                    tracing::error!(image, document, %error, "failed to optimize image");
                }
            }
        }
    }
}

fn document_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}

/// A generator request together with what it produced.
type Generated = (GenerationRequest, DerivativeSet);

/// An image node after the eligibility check.
struct Candidate {
    path: NodePath,
    url: String,
    /// Alt text to render with, or the reason the node is skipped.
    alt: Result<String, SkipReason>,
    /// Alt was missing and must be written back as `""`.
    fill_alt: bool,
}

/// Transforms the image nodes of documents.
///
/// Holds the immutable [`Config`] for the whole build; one instance serves
/// any number of documents.
pub struct ImagePipeline<G> {
    config: Config,
    paths: SitePaths,
    generator: G,
}

impl<G: DerivativeGenerator> ImagePipeline<G> {
    pub fn new(config: Config, paths: SitePaths, generator: G) -> Self {
        Self {
            config,
            paths,
            generator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Transform every eligible image node of `tree` in place.
    ///
    /// `document_path` identifies the Markdown file in log lines and is handed
    /// to the renderer.
    pub fn transform(&self, tree: &mut Node, document_path: &Path) -> TransformReport {
        let candidates = self.collect_candidates(tree);

        let mut outcomes: Vec<(usize, NodeOutcome)> = group_by_url(&candidates)
            .par_iter()
            .flat_map_iter(|group| self.process_group(&candidates, group, document_path))
            .collect();
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = TransformReport::default();
        for (candidate, (_, outcome)) in candidates.into_iter().zip(outcomes) {
            apply(tree, &candidate, &outcome);
            report.entries.push(NodeReport {
                url: candidate.url,
                path: candidate.path,
                outcome,
            });
        }

        report.log(document_path);
        report
    }

    fn collect_candidates(&self, tree: &Node) -> Vec<Candidate> {
        tree.collect_images()
            .into_iter()
            .map(|(path, image)| {
                let mut fill_alt = false;
                let alt = if !self.config.remote_images && is_remote_url(&image.url) {
                    Err(SkipReason::RemoteDisabled)
                } else {
                    match image.alt_text() {
                        Some(alt) => Ok(alt.to_string()),
                        None if self.config.alt_required => Err(SkipReason::MissingAlt),
                        None => {
                            fill_alt = true;
                            Ok(String::new())
                        }
                    }
                };
                Candidate {
                    path,
                    url: image.url.clone(),
                    alt,
                    fill_alt,
                }
            })
            .collect()
    }

    /// Process the candidates sharing one URL, in document order.
    ///
    /// The first successful generation is reused for the rest of the group, so
    /// a repeated image is encoded once and its files are never rewritten
    /// concurrently. A failed generation is retried by the next node.
    fn process_group(
        &self,
        candidates: &[Candidate],
        group: &[usize],
        document_path: &Path,
    ) -> Vec<(usize, NodeOutcome)> {
        let mut generated = None;
        group
            .iter()
            .map(|&index| {
                let candidate = &candidates[index];
                let outcome = match &candidate.alt {
                    Ok(alt) => self.process(&candidate.url, alt, document_path, &mut generated),
                    Err(reason) => NodeOutcome::Skipped(*reason),
                };
                (index, outcome)
            })
            .collect()
    }

    fn process(
        &self,
        url: &str,
        alt: &str,
        document_path: &Path,
        generated: &mut Option<Generated>,
    ) -> NodeOutcome {
        let done = match generated.take() {
            Some(done) => done,
            None => match self.generate(url) {
                Ok(done) => done,
                Err(error) => return NodeOutcome::Failed(error),
            },
        };
        let outcome = self
            .render_node(&done, alt, document_path)
            .unwrap_or_else(NodeOutcome::Failed);
        *generated = Some(done);
        outcome
    }

    fn generate(&self, url: &str) -> Result<Generated, PipelineError> {
        let request = self.generation_request(url)?;
        let derivatives = self.generator.generate(&request)?;
        Ok((request, derivatives))
    }

    fn render_node(
        &self,
        (request, derivatives): &Generated,
        alt: &str,
        document_path: &Path,
    ) -> Result<NodeOutcome, PipelineError> {
        if derivatives.is_empty() {
            return Ok(NodeOutcome::Skipped(SkipReason::NoDerivatives));
        }

        let input = RenderInput {
            image_dir: &request.url_prefix,
            metadata: derivatives,
            alt,
            sizes: &self.config.sizes,
            is_remote: request.is_remote,
            md_file_path: document_path,
        };
        Ok(match markup::render(&input, self.config.markup.as_ref())? {
            Some(html) => NodeOutcome::Rendered(html),
            None => NodeOutcome::Skipped(SkipReason::EmptyMarkup),
        })
    }

    /// Build the generator request for an image URL.
    ///
    /// Local images mirror their public path under the output root and keep
    /// their file stem; remote images go to [`REMOTE_OUTPUT_DIR`] under a
    /// hashed name, in their source format only. This placement always wins
    /// over `outputDir`/`filenameFormat` from the generator options.
    pub fn generation_request(&self, url: &str) -> Result<GenerationRequest, PipelineError> {
        let options = &self.config.generator;

        if is_remote_url(url) {
            let placement = Placement {
                output_dir: self.paths.out_dir.join(REMOTE_OUTPUT_DIR),
                url_prefix: format!("/{REMOTE_OUTPUT_DIR}/"),
                filename_format: FilenameFormat::remote(),
                formats: Some(vec![AUTO_FORMAT.to_string()]),
            };
            return Ok(GenerationRequest::new(url, true, options, placement));
        }

        let relative = url.trim_start_matches('/');
        let has_file_name = Path::new(relative).file_name().is_some();
        if relative.is_empty() || relative.ends_with('/') || !has_file_name {
            return Err(PipelineError::InvalidPath(url.to_string()));
        }

        let source = self.paths.public_dir.join(relative);
        let output_dir = self
            .paths
            .out_dir
            .join(relative)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.out_dir.clone());

        let placement = Placement {
            output_dir,
            url_prefix: url_dirname(url).to_string(),
            filename_format: FilenameFormat::local(),
            formats: None,
        };
        Ok(GenerationRequest::new(
            source.to_string_lossy(),
            false,
            options,
            placement,
        ))
    }
}

/// Candidate indices grouped by URL, groups ordered by first appearance.
fn group_by_url(candidates: &[Candidate]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_url: HashMap<&str, usize> = HashMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let group = *by_url.entry(candidate.url.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(index);
    }
    groups
}

/// Write one outcome back into the tree.
fn apply(tree: &mut Node, candidate: &Candidate, outcome: &NodeOutcome) {
    let Some(node) = tree.node_at_mut(&candidate.path) else {
        return;
    };
    if let NodeOutcome::Rendered(html) = outcome {
        *node = Node::Html {
            value: html.clone(),
        };
    } else if candidate.fill_alt
        && let Node::Image(image) = node
    {
        image.alt = Some(String::new());
    }
}
