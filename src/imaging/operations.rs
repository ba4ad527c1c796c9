//! Derivative planning.
//!
//! Decides which files a request produces (formats × widths, their names,
//! paths and public URLs) without touching any pixels. The backend then
//! executes the plan.

use super::backend::GenerateError;
use super::calculations::resolve_widths;
use crate::config::AUTO_FORMAT;
use crate::naming::{FilenameFields, join_url, source_id, source_stem};
use crate::types::{Derivative, GenerationRequest, OutputFormat};
use std::path::PathBuf;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// One file the backend is about to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDerivative {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub filename: String,
    pub output_path: PathBuf,
    pub url: String,
}

impl PlannedDerivative {
    pub fn into_derivative(self, size: u64) -> Derivative {
        Derivative {
            format: self.format,
            width: self.width,
            height: self.height,
            filename: self.filename,
            output_path: self.output_path,
            url: self.url,
            source_type: self.format.mime_type().to_string(),
            size,
        }
    }
}

/// Resolve configured format names against the source format.
///
/// `"auto"` means the source format. Order is kept, duplicates collapse, and
/// an empty list behaves like `["auto"]`.
pub fn resolve_formats(requested: &[String], source: OutputFormat) -> Result<Vec<OutputFormat>> {
    let mut formats = Vec::new();
    for name in requested {
        let format = if name.eq_ignore_ascii_case(AUTO_FORMAT) {
            source
        } else {
            OutputFormat::from_name(name)
                .ok_or_else(|| GenerateError::UnsupportedFormat(name.clone()))?
        };
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        formats.push(source);
    }
    Ok(formats)
}

/// Plan every derivative for `request`, format by format.
pub fn plan_derivatives(
    request: &GenerationRequest,
    original: (u32, u32),
    source_format: OutputFormat,
) -> Result<Vec<PlannedDerivative>> {
    let formats = resolve_formats(&request.formats, source_format)?;
    let sizes = resolve_widths(original, &request.widths);
    let id = source_id(&request.source);
    let name = source_stem(&request.source);

    let mut plan = Vec::with_capacity(formats.len() * sizes.len());
    for format in formats {
        for size in &sizes {
            let filename = request.filename_format.render(&FilenameFields {
                id: &id,
                name,
                width: size.width,
                format: format.as_str(),
            });
            plan.push(PlannedDerivative {
                format,
                width: size.width,
                height: size.height,
                output_path: request.output_dir.join(&filename),
                url: join_url(&request.url_prefix, &filename),
                filename,
            });
        }
    }
    Ok(plan)
}
