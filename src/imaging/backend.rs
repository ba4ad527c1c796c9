//! Derivative generator trait and shared error type.
//!
//! The [`DerivativeGenerator`] trait is the single seam between the pipeline
//! and pixel work. The production implementation is
//! [`ImageGenerator`](super::rust_backend::ImageGenerator); tests substitute a
//! recording mock so pipeline logic runs without encoding anything.

use crate::types::{DerivativeSet, GenerationRequest};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("Failed to decode {source_name}: {message}")]
    Decode {
        source_name: String,
        message: String,
    },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("Invalid encoder option `{key}`: {message}")]
    InvalidOption { key: String, message: String },
    #[error("Generation failed: {0}")]
    ProcessingFailed(String),
}

/// Produces derivative files for one source image.
///
/// Implementations must be `Sync`: the pipeline fans requests out across
/// rayon workers.
pub trait DerivativeGenerator: Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<DerivativeSet, GenerateError>;
}

impl<G: DerivativeGenerator + ?Sized> DerivativeGenerator for &G {
    fn generate(&self, request: &GenerationRequest) -> Result<DerivativeSet, GenerateError> {
        (**self).generate(request)
    }
}

/// True when `url` points at a network location (`http://` or `https://`).
pub fn is_remote_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    !rest.is_empty()
        && (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
}
