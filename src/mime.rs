//! Structured Content Types
//!
//! The configured list of content types whose payloads become generated models, each with a
//! quality weight (`application/json;q=1`). Lookups ignore case, parameters and vendor
//! suffixes, so `Application/VND.github+JSON; charset=utf-8` matches `application/json`.

use regex::Regex;

use crate::error::{PreflightError, Result};

/// One configured content type
#[derive(Debug, Clone, PartialEq)]
pub struct MimeEntry {
    /// Normalized `type/subtype`
    pub content_type: String,
    /// In `0.0..=1.0`
    pub quality: f32,
}

#[derive(Debug, Clone)]
pub struct StructuredMimeTypes {
    entries: Vec<MimeEntry>,
    vendor_suffix: Regex,
}

impl StructuredMimeTypes {
    /// Parse `type/subtype[;q=weight]` entries
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let vendor_suffix = Regex::new(r"[^/]+\+")
            .map_err(|e| PreflightError::InvalidConfig(e.to_string()))?;
        let mut parsed = Self {
            entries: Vec::with_capacity(entries.len()),
            vendor_suffix,
        };

        for raw in entries {
            let raw = raw.as_ref();
            let mut parts = raw.split(';');
            let media = parts.next().unwrap_or_default().trim();
            if media.split('/').filter(|s| !s.trim().is_empty()).count() != 2 {
                return Err(invalid(raw, "expected type/subtype"));
            }

            let mut quality = 1.0_f32;
            for parameter in parts {
                let Some((key, value)) = parameter.split_once('=') else {
                    continue;
                };
                if !key.trim().eq_ignore_ascii_case("q") {
                    continue;
                }
                quality = value
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| invalid(raw, &e.to_string()))?;
                if !(0.0..=1.0).contains(&quality) {
                    return Err(invalid(raw, "quality must be between 0 and 1"));
                }
            }

            let content_type = parsed.normalize(media);
            parsed.entries.push(MimeEntry {
                content_type,
                quality,
            });
        }

        Ok(parsed)
    }

    /// Lowercase, drop parameters, fold vendor suffixes (`vnd.x+json` -> `json`)
    pub fn normalize(&self, content_type: &str) -> String {
        let media = content_type.split(';').next().unwrap_or_default();
        let media = media.trim().to_lowercase();
        self.vendor_suffix.replace(&media, "").into_owned()
    }

    pub fn is_structured(&self, content_type: &str) -> bool {
        self.quality(content_type).is_some()
    }

    /// Weight of the matching configured entry
    pub fn quality(&self, content_type: &str) -> Option<f32> {
        let normalized = self.normalize(content_type);
        self.entries
            .iter()
            .find(|entry| entry.content_type == normalized)
            .map(|entry| entry.quality)
    }

    pub fn entries(&self) -> &[MimeEntry] {
        &self.entries
    }
}

fn invalid(entry: &str, reason: &str) -> PreflightError {
    PreflightError::InvalidMimeType {
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}
