//! Shared test utilities.
//!
//! Provides a recording [`MockGenerator`], document tree builders, an
//! [`EventCapture`] for log assertions, and synthetic image writers for tests
//! that need real files on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let generator = MockGenerator::new().failing_on("broken.png");
//! let mut tree = paragraph_of(vec![
//!     Node::image("cat.png", Some("a cat")),
//!     Node::image("broken.png", Some("oops")),
//! ]);
//!
//! let pipeline = ImagePipeline::new(Config::default(), site_paths(), &generator);
//! let report = pipeline.transform(&mut tree, Path::new("post.md"));
//! assert_eq!(generator.sources(), vec!["/public/broken.png", "/public/cat.png"]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{ImageEncoder, RgbImage, RgbaImage};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

use crate::document::{ImageNode, Node};
use crate::imaging::{DerivativeGenerator, GenerateError, plan_derivatives};
use crate::pipeline::SitePaths;
use crate::types::{DerivativeSet, GenerationRequest, OutputFormat};

// =========================================================================
// Mock generator
// =========================================================================

/// Generator that records requests and fabricates descriptors without
/// touching the filesystem.
///
/// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
pub struct MockGenerator {
    /// Pretend every source has these dimensions.
    pub dimensions: (u32, u32),
    pub requests: Mutex<Vec<GenerationRequest>>,
    fail_on: Vec<String>,
    empty_on: Vec<String>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            dimensions: (2000, 1000),
            requests: Mutex::new(Vec::new()),
            fail_on: Vec::new(),
            empty_on: Vec::new(),
        }
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request whose source ends with `suffix`.
    pub fn failing_on(mut self, suffix: &str) -> Self {
        self.fail_on.push(suffix.to_string());
        self
    }

    /// Return an empty set for every source ending with `suffix`.
    pub fn empty_on(mut self, suffix: &str) -> Self {
        self.empty_on.push(suffix.to_string());
        self
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Sources of every recorded request, sorted so that assertions do not
    /// depend on rayon scheduling.
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .get_requests()
            .into_iter()
            .map(|r| r.source)
            .collect();
        sources.sort();
        sources
    }

    /// The single recorded request for `source`. Panics if absent.
    pub fn request_for(&self, source: &str) -> GenerationRequest {
        self.get_requests()
            .into_iter()
            .find(|r| r.source == source)
            .unwrap_or_else(|| {
                panic!(
                    "no request for '{source}'. Recorded: {:?}",
                    self.sources()
                )
            })
    }
}

impl DerivativeGenerator for MockGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<DerivativeSet, GenerateError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_on.iter().any(|s| request.source.ends_with(s.as_str())) {
            return Err(GenerateError::ProcessingFailed(format!(
                "mock failure for {}",
                request.source
            )));
        }
        if self.empty_on.iter().any(|s| request.source.ends_with(s.as_str())) {
            return Ok(DerivativeSet::default());
        }

        let source_format = Path::new(&request.source)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_name)
            .unwrap_or(OutputFormat::Jpeg);
        let plan = plan_derivatives(request, self.dimensions, source_format)?;
        Ok(DerivativeSet::from_derivatives(
            plan.into_iter().map(|p| p.into_derivative(1024)),
        ))
    }
}

// =========================================================================
// Tree builders
// =========================================================================

/// A root holding one paragraph with the given inline children.
pub fn paragraph_of(children: Vec<Node>) -> Node {
    Node::root(vec![Node::Paragraph { children }])
}

/// Asset roots used by pipeline tests.
pub fn site_paths() -> SitePaths {
    SitePaths::new("/public", "/dist")
}

/// The image node at `path`. Panics if the node is not an image.
pub fn image_at<'a>(tree: &'a Node, path: &[usize]) -> &'a ImageNode {
    match tree.node_at(path) {
        Some(Node::Image(image)) => image,
        other => panic!("expected image at {path:?}, found {other:?}"),
    }
}

/// The raw markup at `path`. Panics if the node was not rewritten.
pub fn html_at<'a>(tree: &'a Node, path: &[usize]) -> &'a str {
    match tree.node_at(path) {
        Some(Node::Html { value }) => value,
        other => panic!("expected html at {path:?}, found {other:?}"),
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a small valid JPEG file with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG file with an alpha channel.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, 64, (y % 256) as u8, 200])
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::png::PngEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
}

/// Create a looping GIF with `frames` solid-colour frames.
pub fn write_test_gif(path: &Path, width: u32, height: u32, frames: u32) {
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let writer = std::io::BufWriter::new(std::fs::File::create(path).unwrap());
    let mut encoder = GifEncoder::new_with_speed(writer, 30);
    encoder.set_repeat(Repeat::Infinite).unwrap();
    encoder
        .encode_frames((0..frames).map(|i| {
            let shade = (i * 60 % 256) as u8;
            let pixel = image::Rgba([shade, 0, 255 - shade, 255]);
            let buffer = RgbaImage::from_pixel(width, height, pixel);
            Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1))
        }))
        .unwrap();
}

// =========================================================================
// Log capture
// =========================================================================

/// One `tracing` event with its fields rendered to strings.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records every event emitted inside [`run`](Self::run).
#[derive(Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    /// Run `f` with this capture as the thread's default subscriber.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldRecorder::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
        });
    }
}

#[derive(Default)]
struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}
