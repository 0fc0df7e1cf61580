//! Cache key computation.
//!
//! A [`CacheDigest`] covers every input that changes the rendered bytes:
//!
//! ```text
//! sha256( renderer NUL prefix+args... [ RS converter-prefix+converter-args... ] "\n\n" trimmed-source )
//! ```
//!
//! Arguments are joined with NUL (which cannot appear in an OS argument) and
//! the converter section is introduced by an ASCII record separator, so no two
//! distinct argument lists can hash the same text. The source comes last and
//! is trimmed, which makes surrounding whitespace insignificant.
//!
//! Computing a digest is pure: it never touches the filesystem or spawns a
//! process. The executable path is not part of the key; configured prefix
//! arguments are.

use crate::models::RenderSpec;
use crate::renderer::{ExecutableResolver, Tool, converter_arguments, renderer_arguments};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

const ARG_SEPARATOR: char = '\0';
const SECTION_SEPARATOR: char = '\u{1e}';

/// Hex-encoded SHA-256 digest naming one rendered SVG.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheDigest(String);

impl CacheDigest {
    /// Compute the digest of `spec` as it would be rendered through `resolver`.
    #[must_use]
    pub fn compute(spec: &RenderSpec, resolver: &ExecutableResolver) -> Self {
        let renderer = spec.renderer();

        let mut key = String::from(renderer.name());
        push_arguments(&mut key, resolver.prefix(Tool::Renderer(renderer)));
        push_arguments(&mut key, &renderer_arguments(renderer, spec.options()));

        if renderer.is_tex() {
            key.push(SECTION_SEPARATOR);
            push_arguments(&mut key, resolver.prefix(Tool::Dvisvgm));
            push_arguments(&mut key, &converter_arguments());
        }

        key.push_str("\n\n");
        key.push_str(spec.code());

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an existing digest string (e.g. a cache file stem).
    ///
    /// Returns `None` unless `value` is 64 lowercase hex characters.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_arguments(key: &mut String, args: &[String]) {
    for arg in args {
        key.push(ARG_SEPARATOR);
        key.push_str(arg);
    }
}

impl fmt::Display for CacheDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
