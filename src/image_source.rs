//! Image references: classification, data-URI decoding and remote fetches.
//!
//! Remote fetching is the only I/O the engine performs. It sits behind the
//! [`ImageFetcher`] trait so callers can swap in their own resolver; the
//! default [`HttpFetcher`] is a blocking `ureq` agent with a hard timeout and
//! a body size cap.

use std::io::Read;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on a fetched image body (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// What kind of reference an image `src` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    Empty,
    DataUri(&'a str),
    Remote(&'a str),
    /// Storage paths, `file://` URLs and anything else this engine does not
    /// resolve itself.
    Unsupported(&'a str),
}

pub fn classify(src: &str) -> ImageRef<'_> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        ImageRef::Empty
    } else if trimmed.starts_with("data:") {
        ImageRef::DataUri(trimmed)
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        ImageRef::Remote(trimmed)
    } else {
        ImageRef::Unsupported(trimmed)
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
///
/// Returns `Err` if `src` is not a data URI or does not use base64 encoding.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    if !src.starts_with("data:") {
        let preview: String = src.chars().take(80).collect();
        return Err(format!(
            "Image src must be a base64 data URI \
             (e.g. `data:image/png;base64,...`). Got: {preview:?}"
        ));
    }
    let rest = &src["data:".len()..];
    let comma_pos = rest.find(',').ok_or_else(|| {
        "Invalid data URI: missing `,` separator between header and data".to_string()
    })?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("Only base64-encoded data URIs are supported. \
             The header must contain `;base64` (e.g. `data:image/png;base64,...`)."
            .to_string());
    }
    let b64_data: String = rest[comma_pos + 1..]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    BASE64_STD
        .decode(b64_data)
        .map_err(|e| format!("Base64 decode error: {e}"))
}

/// Resolves remote image URLs to bytes.
///
/// Implementations must bound their own latency; the engine calls `fetch`
/// synchronously from the composing thread.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Blocking HTTP fetcher with a per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("label-forge/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, max_bytes }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| format!("Failed to read response: {e}"))?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(format!("Image larger than {} bytes", self.max_bytes));
        }
        Ok(bytes)
    }
}

/// Fetcher for offline use: every remote reference fails.
pub struct NoFetch;

impl ImageFetcher for NoFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        Err(format!("remote fetching disabled ({url})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    #[test]
    fn classifies_references() {
        assert_eq!(classify("  "), ImageRef::Empty);
        assert!(matches!(classify(PIXEL_PNG), ImageRef::DataUri(_)));
        assert!(matches!(classify("https://cdn.example.com/a.png"), ImageRef::Remote(_)));
        assert!(matches!(classify("uploads/user-1/logo.png"), ImageRef::Unsupported(_)));
        assert!(matches!(classify("file:///etc/passwd"), ImageRef::Unsupported(_)));
    }

    #[test]
    fn decodes_data_uri() {
        let bytes = parse_data_uri(PIXEL_PNG).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_non_base64_data_uri() {
        assert!(parse_data_uri("data:text/plain,hello").is_err());
        assert!(parse_data_uri("data:image/png;base64").is_err());
        assert!(parse_data_uri("logo.png").is_err());
    }

    #[test]
    fn unreachable_host_fails_fast() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500), 1024);
        // Port 9 (discard) on loopback is closed on CI machines.
        assert!(fetcher.fetch("http://127.0.0.1:9/logo.png").is_err());
    }

    #[test]
    fn no_fetch_always_fails() {
        assert!(NoFetch.fetch("https://example.com/a.png").is_err());
    }
}
