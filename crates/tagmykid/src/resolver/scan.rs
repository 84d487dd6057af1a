//! Turning text read off a QR code into a tag payload.
//!
//! The camera side is someone else's problem: whatever decodes the image
//! hands us a string, and this module decides whether it is one of our
//! links.

use tracing::debug;
use url::Url;

/// Fragment prefix that marks a found-tag link.
pub const FOUND_ROUTE: &str = "/found/";

/// What a scanned string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// One of our links; carries the still-escaped payload.
    Payload(String),
    /// A URL, but not a found-tag link.
    NotOurCode,
    /// Not a URL at all.
    NotAUrl,
}

impl ScanOutcome {
    /// Message to show when the scan did not yield a payload.
    #[must_use]
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Payload(_) => None,
            Self::NotOurCode => {
                Some("This is not a valid TagMyKid QR code. Please try a different code.")
            }
            Self::NotAUrl => Some("The scanned QR code is not a valid URL."),
        }
    }
}

/// Classify decoded QR text.
#[must_use]
pub fn extract_payload(text: &str) -> ScanOutcome {
    let Ok(url) = Url::parse(text.trim()) else {
        debug!("Scanned text is not a URL");
        return ScanOutcome::NotAUrl;
    };

    match url
        .fragment()
        .and_then(|fragment| fragment.strip_prefix(FOUND_ROUTE))
    {
        Some(payload) if !payload.is_empty() => ScanOutcome::Payload(payload.to_string()),
        _ => {
            debug!(url = %url, "Scanned URL is not a found-tag link");
            ScanOutcome::NotOurCode
        }
    }
}
