//! Filename policy for generated derivatives.
//!
//! Every generated file is named from a template so that the same source,
//! width, and format always produce the same filename. Re-running a build
//! overwrites files instead of accumulating duplicates.
//!
//! ## Templates
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{id}` | first 10 hex chars of the SHA-256 of the source path or URL |
//! | `{name}` | file stem of the source (`photos/cat.png` → `cat`) |
//! | `{width}` | pixel width of the derivative |
//! | `{format}` | output format name (`jpeg`, `webp`, ...) |
//!
//! Local images use `{name}-{width}.{format}` so derivatives sit next to
//! their mirrored source path. Remote images share one output directory, so
//! they use `{id}-{width}.{format}` to stay collision-free.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const ID_LENGTH: usize = 10;

/// A filename template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilenameFormat(String);

/// Values substituted into a [`FilenameFormat`].
#[derive(Debug, Clone, Copy)]
pub struct FilenameFields<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub width: u32,
    pub format: &'a str,
}

impl FilenameFormat {
    pub const LOCAL: &'static str = "{name}-{width}.{format}";
    pub const REMOTE: &'static str = "{id}-{width}.{format}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn local() -> Self {
        Self::new(Self::LOCAL)
    }

    pub fn remote() -> Self {
        Self::new(Self::REMOTE)
    }

    pub fn template(&self) -> &str {
        &self.0
    }

    pub fn render(&self, fields: &FilenameFields<'_>) -> String {
        self.0
            .replace("{id}", fields.id)
            .replace("{name}", fields.name)
            .replace("{width}", &fields.width.to_string())
            .replace("{format}", fields.format)
    }
}

/// Short content-independent id for a source path or URL.
pub fn source_id(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(ID_LENGTH);
    hex
}

/// File stem of a path or URL, ignoring any query string or fragment.
///
/// - `"cat.png"` → `"cat"`
/// - `"/images/2024/dog.final.jpg"` → `"dog.final"`
/// - `"https://x.com/a.jpg?w=10"` → `"a"`
pub fn source_stem(source: &str) -> &str {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

/// Directory part of a URL path, mirroring POSIX `dirname`.
///
/// - `"cat.png"` → `"."`
/// - `"/cat.png"` → `"/"`
/// - `"/images/cat.png"` → `"/images"`
pub fn url_dirname(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
    }
}

/// Join a public URL directory and a filename.
///
/// An empty or `.` directory yields the bare filename, which keeps relative
/// image references relative.
pub fn join_url(dir: &str, filename: &str) -> String {
    match dir {
        "" | "." | "./" => filename.to_string(),
        _ => format!("{}/{}", dir.trim_end_matches('/'), filename),
    }
}
