//! Deep links and printable QR codes for tags.

use std::fmt;

use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use tracing::debug;
use url::Url;

use crate::codec::{self, encode_uri_component};
use crate::error::{Error, Result};
use crate::model::Tag;
use crate::resolver::scan::FOUND_ROUTE;

/// A link that opens the finder page for one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    url: Url,
}

impl DeepLink {
    /// Build the link for `tag` under `base_url`.
    ///
    /// Any fragment already on `base_url` is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if `base_url` is not an absolute
    /// URL, or an error if the tag cannot be encoded.
    pub fn for_tag(base_url: &str, tag: &Tag) -> Result<Self> {
        let mut url = Url::parse(base_url).map_err(|e| Error::ConfigValidation {
            message: format!("links.base_url {base_url:?} is not a valid URL: {e}"),
        })?;
        let payload = codec::encode(tag)?;
        url.set_fragment(Some(&format!("{FOUND_ROUTE}{payload}")));

        debug!(code = %tag.code, "Built deep link");
        Ok(Self { url })
    }

    /// The link as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The payload carried in the fragment.
    #[must_use]
    pub fn payload(&self) -> &str {
        self.url
            .fragment()
            .and_then(|fragment| fragment.strip_prefix(FOUND_ROUTE))
            .unwrap_or_default()
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL of an image from a hosted QR code service encoding `link`.
#[must_use]
pub fn qr_service_url(service: &str, size: u32, link: &str) -> String {
    let separator = if service.contains('?') { '&' } else { '?' };
    format!(
        "{service}{separator}size={size}x{size}&data={}",
        encode_uri_component(link)
    )
}

/// Local rendering formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QrFormat {
    /// SVG document, suitable for printing.
    #[default]
    Svg,
    /// Block characters for a terminal.
    Text,
}

/// Render `link` as a QR code without any network service.
///
/// # Errors
///
/// Returns [`Error::QrRender`] if the link does not fit in a QR code.
pub fn render_qr(link: &str, format: QrFormat) -> Result<String> {
    let qr = QrCode::with_error_correction_level(link.as_bytes(), EcLevel::M)
        .map_err(|e| Error::QrRender(e.to_string()))?;

    let rendered = match format {
        QrFormat::Svg => qr
            .render::<svg::Color<'_>>()
            .min_dimensions(250, 250)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build(),
        QrFormat::Text => qr
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tag() -> Tag {
        Tag {
            name: "Thandi Dlamini".to_string(),
            grade: "5".to_string(),
            class_name: "B".to_string(),
            parent_phone: "0827654321".to_string(),
            school: "Greenside High School".to_string(),
            code: "Q7X2PL".to_string(),
        }
    }

    #[test]
    fn test_deep_link_shape() {
        let tag = sample_tag();
        let link = DeepLink::for_tag("https://tagmykid.app/", &tag).unwrap();

        let payload = codec::encode(&tag).unwrap();
        assert_eq!(
            link.to_string(),
            format!("https://tagmykid.app/#/found/{payload}")
        );
        assert_eq!(link.payload(), payload);
    }

    #[test]
    fn test_deep_link_keeps_path_and_replaces_fragment() {
        let link = DeepLink::for_tag("https://example.org/kids/index.html#/home", &sample_tag())
            .unwrap();
        assert!(link
            .as_str()
            .starts_with("https://example.org/kids/index.html#/found/"));
    }

    #[test]
    fn test_deep_link_scans_back_to_payload() {
        let link = DeepLink::for_tag("https://tagmykid.app", &sample_tag()).unwrap();
        assert_eq!(
            crate::resolver::scan::extract_payload(link.as_str()),
            crate::resolver::scan::ScanOutcome::Payload(link.payload().to_string())
        );
    }

    #[test]
    fn test_deep_link_rejects_relative_base() {
        let err = DeepLink::for_tag("tagmykid.app", &sample_tag()).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_qr_service_url() {
        let url = qr_service_url(
            "https://api.qrserver.com/v1/create-qr-code/",
            250,
            "https://tagmykid.app/#/found/abc%3D",
        );
        assert_eq!(
            url,
            "https://api.qrserver.com/v1/create-qr-code/?size=250x250\
             &data=https%3A%2F%2Ftagmykid.app%2F%23%2Ffound%2Fabc%253D"
        );
    }

    #[test]
    fn test_qr_service_url_with_existing_query() {
        let url = qr_service_url("https://qr.example/render?theme=dark", 100, "x");
        assert_eq!(url, "https://qr.example/render?theme=dark&size=100x100&data=x");
    }

    #[test]
    fn test_render_qr_svg() {
        let svg = render_qr("https://tagmykid.app/#/found/abc", QrFormat::Svg).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[test]
    fn test_render_qr_text() {
        let text = render_qr("https://tagmykid.app/#/found/abc", QrFormat::Text).unwrap();
        assert!(text.lines().count() > 10);
    }

    #[test]
    fn test_render_qr_too_long() {
        let link = "x".repeat(8000);
        assert!(matches!(
            render_qr(&link, QrFormat::Text),
            Err(Error::QrRender(_))
        ));
    }
}
