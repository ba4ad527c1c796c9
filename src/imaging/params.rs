//! Encoder parameters.
//!
//! The configured `encoderOptions` map is opaque to the rest of the crate.
//! [`EncodeParams::from_options`] reads the keys this backend understands and
//! ignores the rest.
//!
//! | Key | Meaning | Default |
//! |---|---|---|
//! | `quality` | Lossy quality (JPEG, AVIF), clamped to 1–100 | 90 |
//! | `speed` | AVIF encoder speed, clamped to 1–10 | 6 |

use super::backend::GenerateError;
use serde_json::{Map, Value};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Settings applied to every encoder call of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodeParams {
    pub quality: Quality,
    pub avif_speed: u8,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            avif_speed: 6,
        }
    }
}

impl EncodeParams {
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, GenerateError> {
        let mut params = Self::default();
        if let Some(value) = options.get("quality") {
            params.quality = Quality::new(read_u32("quality", value)?);
        }
        if let Some(value) = options.get("speed") {
            params.avif_speed = read_u32("speed", value)?.clamp(1, 10) as u8;
        }
        Ok(params)
    }
}

fn read_u32(key: &str, value: &Value) -> Result<u32, GenerateError> {
    value
        .as_u64()
        .map(|n| n.min(u32::MAX as u64) as u32)
        .ok_or_else(|| GenerateError::InvalidOption {
            key: key.to_string(),
            message: format!("expected a non-negative integer, got {value}"),
        })
}
