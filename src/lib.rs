//! # Remark Images
//!
//! A build-time Markdown transform that replaces image references with
//! responsive `<picture>` markup. Every image in a document is resized to a set
//! of widths, optionally converted to other formats, and rewritten into a
//! `<picture>` element with one `<source>` per format and a lazy-loading
//! `<img>` fallback.
//!
//! # Architecture: Collect, Generate, Rewrite
//!
//! ```text
//! 1. Collect   document tree  →  candidates     (read-only walk, eligibility rules)
//! 2. Generate  candidates     →  derivatives    (resize + encode, one request per image)
//! 3. Rewrite   derivatives    →  tree           (markup rendered, image node replaced)
//! ```
//!
//! The pipeline never fails a document. Each image ends up rendered, skipped or
//! failed on its own, and the outcome is reported in a
//! [`TransformReport`](pipeline::TransformReport) that also drives the log
//! output.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | User options, defaults, normalization (the native width is always present) |
//! | [`document`] | mdast-shaped document tree and positional node access |
//! | [`pipeline`] | The transform: eligibility, request construction, failure isolation |
//! | [`imaging`] | Derivative generation: the generator trait and the pure-Rust `image` backend |
//! | [`markup`] | `<picture>` rendering and the pluggable renderer trait |
//! | [`types`] | Request and descriptor contracts shared by generator and renderer |
//! | [`naming`] | Filename templates, source ids and URL path helpers |
//! | [`cache`] | Content-addressed in-memory cache for repeated sources |
//! | [`markdown`] | pulldown-cmark adapter: Markdown → tree → HTML |
//! | [`integration`] | Build-system entry point, gated to production builds |
//!
//! # Design Decisions
//!
//! ## Never Upscale
//!
//! The width list always contains the native marker (`"auto"`). Configured
//! widths larger than the source are dropped, and the source width is always
//! generated, so even a small image gets a full-quality derivative. See
//! [`config::ensure_native_width`].
//!
//! ## Local vs Remote Placement
//!
//! Local images mirror their public path under the output root and keep their
//! file stem (`/images/cat.png` → `dist/images/cat-600.jpeg`). Remote images
//! are written to `arei-optimg/` under a hashed name and are never converted
//! to other formats. Placement is decided per image and cannot be overridden
//! from the options.
//!
//! ## Deterministic Filenames
//!
//! Filenames are a pure function of source, width and format. Rebuilding
//! overwrites the same files instead of accumulating new ones.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) and
//! `rav1e` (AVIF encoding), both pure Rust. No system image libraries are
//! needed.
//!
//! ## Maud for Markup
//!
//! The default `<picture>` markup is produced by [Maud](https://maud.lambda.xyz/),
//! so alt text and URLs are escaped without any manual string handling. Custom
//! renderers implement [`markup::PictureRenderer`] (plain closures qualify).

pub mod cache;
pub mod config;
pub mod document;
pub mod imaging;
pub mod integration;
pub mod markdown;
pub mod markup;
pub mod naming;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
