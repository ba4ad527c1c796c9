//! Pure Rust derivative generator.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Fetch (remote) | `ureq` agent, body read into memory |
//! | Sniff + decode (JPEG, PNG, TIFF, WebP, GIF) | `image::guess_format` + `image::load_from_memory_with_format` |
//! | Decode animated GIF | `image::codecs::gif::GifDecoder` frames (full-canvas, composited) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless only) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed + quality) |
//! | Encode → TIFF | `image::codecs::tiff::TiffEncoder` |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (every frame resized, loops forever) |
//! | Result cache | [`GenerationCache`](crate::cache::GenerationCache), opt-in per request |

use super::backend::{DerivativeGenerator, GenerateError};
use super::operations::{PlannedDerivative, plan_derivatives};
use super::params::EncodeParams;
use crate::cache::{CacheStats, GenerationCache, cache_key, hash_bytes, hash_request_params};
use crate::types::{DerivativeSet, GenerationRequest, OutputFormat};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use ureq::Agent;

/// Upper bound on a downloaded source image.
const MAX_REMOTE_BYTES: u64 = 64 * 1024 * 1024;

/// Colour quantization speed for GIF output (1 = best, 30 = fastest).
const GIF_SPEED: i32 = 10;

/// Pure Rust generator using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct ImageGenerator {
    agent: Agent,
    cache: GenerationCache,
}

impl ImageGenerator {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            cache: GenerationCache::new(),
        }
    }

    /// Hits and misses of requests that had caching enabled.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn read_source(&self, request: &GenerationRequest) -> Result<Vec<u8>, GenerateError> {
        if request.is_remote {
            self.fetch(&request.source)
        } else {
            Ok(fs::read(&request.source)?)
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, GenerateError> {
        let fetch_error = |message: String| GenerateError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self.agent.get(url).call().map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let mut body = response.into_body();
        body.with_config()
            .limit(MAX_REMOTE_BYTES)
            .read_to_vec()
            .map_err(|e| fetch_error(e.to_string()))
    }

    fn encode_all(
        &self,
        request: &GenerationRequest,
        bytes: &[u8],
    ) -> Result<DerivativeSet, GenerateError> {
        let (img, source_format) = decode(&request.source, bytes)?;
        let params = EncodeParams::from_options(&request.encoder_options)?;
        let plan = plan_derivatives(request, (img.width(), img.height()), source_format)?;

        // Animation survives only GIF to GIF; other targets get the first frame
        let animation = if source_format == OutputFormat::Gif
            && plan.iter().any(|p| p.format == OutputFormat::Gif)
        {
            decode_gif_frames(&request.source, bytes)?
        } else {
            Vec::new()
        };

        fs::create_dir_all(&request.output_dir)?;

        let mut derivatives = Vec::with_capacity(plan.len());
        for planned in plan {
            if planned.format == OutputFormat::Gif && animation.len() > 1 {
                save_animated_gif(&animation, &planned)?;
                let size = fs::metadata(&planned.output_path)?.len();
                derivatives.push(planned.into_derivative(size));
                continue;
            }

            let resized;
            let frame = if planned.width == img.width() && planned.height == img.height() {
                &img
            } else {
                resized = img.resize_exact(planned.width, planned.height, FilterType::Lanczos3);
                &resized
            };
            save(frame, &planned, params)?;
            let size = fs::metadata(&planned.output_path)?.len();
            derivatives.push(planned.into_derivative(size));
        }

        Ok(DerivativeSet::from_derivatives(derivatives))
    }
}

impl Default for ImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivativeGenerator for ImageGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<DerivativeSet, GenerateError> {
        let bytes = self.read_source(request)?;

        if !request.cache_enabled {
            return self.encode_all(request, &bytes);
        }

        let key = cache_key(&hash_bytes(&bytes), &hash_request_params(request));
        if let Some(set) = self.cache.lookup(&key) {
            tracing::debug!(source = %request.source, "derivatives reused from cache");
            return Ok(set);
        }
        let set = self.encode_all(request, &bytes)?;
        self.cache.insert(key, set.clone());
        Ok(set)
    }
}

/// Sniff the container from its magic bytes and decode it.
fn decode(source: &str, bytes: &[u8]) -> Result<(DynamicImage, OutputFormat), GenerateError> {
    let decode_error = |message: String| GenerateError::Decode {
        source_name: source.to_string(),
        message,
    };

    let format = image::guess_format(bytes).map_err(|e| decode_error(e.to_string()))?;
    let output_format = match format {
        ImageFormat::Jpeg => OutputFormat::Jpeg,
        ImageFormat::Png => OutputFormat::Png,
        ImageFormat::WebP => OutputFormat::Webp,
        ImageFormat::Avif => OutputFormat::Avif,
        ImageFormat::Tiff => OutputFormat::Tiff,
        ImageFormat::Gif => OutputFormat::Gif,
        other => return Err(GenerateError::UnsupportedFormat(format!("{other:?}"))),
    };

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| decode_error(e.to_string()))?;
    Ok((img, output_format))
}

/// Decode every frame of a GIF, composited to the full canvas.
fn decode_gif_frames(source: &str, bytes: &[u8]) -> Result<Vec<Frame>, GenerateError> {
    let decode_error = |e: image::ImageError| GenerateError::Decode {
        source_name: source.to_string(),
        message: e.to_string(),
    };
    GifDecoder::new(Cursor::new(bytes))
        .and_then(|decoder| decoder.into_frames().collect_frames())
        .map_err(decode_error)
}

/// Resize every frame and write them as one looping GIF.
fn save_animated_gif(frames: &[Frame], planned: &PlannedDerivative) -> Result<(), GenerateError> {
    let resized = frames.iter().map(|frame| {
        let buffer = if frame.buffer().dimensions() == (planned.width, planned.height) {
            frame.buffer().clone()
        } else {
            image::imageops::resize(
                frame.buffer(),
                planned.width,
                planned.height,
                FilterType::Lanczos3,
            )
        };
        Frame::from_parts(buffer, 0, 0, frame.delay())
    });

    let writer = BufWriter::new(File::create(&planned.output_path)?);
    let mut encoder = GifEncoder::new_with_speed(writer, GIF_SPEED);
    encoder
        .set_repeat(Repeat::Infinite)
        .and_then(|()| encoder.encode_frames(resized))
        .map_err(|e| GenerateError::Encode {
            path: planned.output_path.clone(),
            message: e.to_string(),
        })
}

/// Encode one frame to the planned output path.
fn save(
    img: &DynamicImage,
    planned: &PlannedDerivative,
    params: EncodeParams,
) -> Result<(), GenerateError> {
    use image::codecs::{
        avif::AvifEncoder, jpeg::JpegEncoder, png::PngEncoder, tiff::TiffEncoder,
        webp::WebPEncoder,
    };

    let create = || -> Result<BufWriter<File>, GenerateError> {
        Ok(BufWriter::new(File::create(&planned.output_path)?))
    };
    let quality = params.quality.value() as u8;

    let result = match planned.format {
        // JPEG has no alpha channel
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(create()?, quality)),
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(create()?)),
        OutputFormat::Webp => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(create()?)),
        OutputFormat::Avif => DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(
            AvifEncoder::new_with_speed_quality(create()?, params.avif_speed, quality),
        ),
        OutputFormat::Tiff => img.write_with_encoder(TiffEncoder::new(create()?)),
        OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(GifEncoder::new_with_speed(create()?, GIF_SPEED)),
    };

    result.map_err(|e| GenerateError::Encode {
        path: planned.output_path.clone(),
        message: e.to_string(),
    })
}
