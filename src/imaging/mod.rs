//! Derivative generation in pure Rust, no system image libraries.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Fetch remote source** | `ureq` agent |
//! | **Sniff + decode** | `image::guess_format`, `image::load_from_memory_with_format` |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Encode** | JPEG, PNG, WebP (lossless), AVIF (rav1e), TIFF |
//!
//! The module is split into:
//! - **Backend**: [`DerivativeGenerator`] trait, the seam the pipeline calls
//! - **Calculations**: pure width/height math (unit testable)
//! - **Parameters**: encoder settings parsed from the opaque options map
//! - **Operations**: planning which files to write for a request
//! - **Rust backend**: [`ImageGenerator`], the production generator

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{DerivativeGenerator, GenerateError, is_remote_url};
pub use calculations::{TargetSize, resolve_widths};
pub use operations::{PlannedDerivative, plan_derivatives};
pub use params::{EncodeParams, Quality};
pub use rust_backend::ImageGenerator;
