//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::config::Width;

/// A width to generate and the height that preserves the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// Resolve requested widths against the source dimensions.
///
/// - [`Width::Native`] becomes the source width.
/// - Widths larger than the source are dropped; images are never upscaled.
/// - Zero widths are ignored and duplicates collapse.
/// - If nothing survives, the source width is used.
///
/// The result is sorted by ascending width.
///
/// # Examples
/// ```
/// # use remark_images::config::Width;
/// # use remark_images::imaging::{TargetSize, resolve_widths};
/// let requested = [Width::Native, Width::Pixels(600), Width::Pixels(1400)];
/// let sizes = resolve_widths((1200, 800), &requested);
/// assert_eq!(sizes, vec![
///     TargetSize { width: 600, height: 400 },
///     TargetSize { width: 1200, height: 800 },
/// ]);
/// ```
pub fn resolve_widths(original: (u32, u32), requested: &[Width]) -> Vec<TargetSize> {
    let orig_w = original.0;

    let mut widths: Vec<u32> = requested
        .iter()
        .filter_map(|width| match *width {
            Width::Native => Some(orig_w),
            Width::Pixels(px) if px > 0 && px <= orig_w => Some(px),
            Width::Pixels(_) => None,
        })
        .collect();

    // Only reachable when the request had no native marker
    if widths.is_empty() {
        widths.push(orig_w);
    }

    widths.sort_unstable();
    widths.dedup();

    widths
        .into_iter()
        .map(|width| TargetSize {
            width,
            height: scaled_height(original, width),
        })
        .collect()
}

/// Height for `width` keeping the source aspect ratio, never below 1px.
pub fn scaled_height(original: (u32, u32), width: u32) -> u32 {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || width == orig_w {
        return orig_h;
    }
    let height = (orig_h as f64 * width as f64 / orig_w as f64).round() as u32;
    height.max(1)
}
