//! Content delivery policy.
//!
//! Builds the body, content type, disposition and hardening headers for a
//! decrypted file. Downloads are always sent as opaque attachments; inline
//! views carry the full header bundle, with variants for PDFs and images.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fileshare_core::{Action, FileMetadata};

pub const OCTET_STREAM: &str = "application/octet-stream";

const CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, private, max-age=0";

const PERMISSIONS_POLICY: &str = "clipboard-write=(), clipboard-read=(), screen-wake-lock=(), \
                                  download=(), fullscreen=(), keyboard=()";

/// How the client should present the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    /// The disposition used for a content-releasing action.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::ViewContent => Some(Disposition::Inline),
            Action::Download => Some(Disposition::Attachment),
            Action::ViewMetadata | Action::Edit => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Decrypted content ready for a transport.
#[derive(Debug, Clone)]
pub struct ContentResponse {
    pub body: Bytes,
    pub content_type: String,
    pub disposition: Disposition,
    /// Header-safe file name.
    pub filename: String,
    /// Every header to send, `Content-Type` and `Content-Disposition` included.
    pub headers: Vec<(&'static str, String)>,
}

impl ContentResponse {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Build the response for `file` with the given plaintext.
pub fn build(file: &FileMetadata, body: Bytes, disposition: Disposition) -> ContentResponse {
    let filename = sanitize_filename(&file.name);
    let content_type = match disposition {
        Disposition::Attachment => OCTET_STREAM.to_string(),
        Disposition::Inline => file.mime_type.clone(),
    };

    let mut headers = vec![
        ("Content-Type", content_type.clone()),
        (
            "Content-Disposition",
            format!("{}; filename=\"{}\"", disposition.as_str(), filename),
        ),
        ("X-Content-Type-Options", "nosniff".to_string()),
        ("Cache-Control", CACHE_CONTROL.to_string()),
        ("Pragma", "no-cache".to_string()),
        ("Expires", "0".to_string()),
    ];

    if disposition == Disposition::Inline {
        headers.extend(inline_headers(&file.mime_type));
    }

    ContentResponse {
        body,
        content_type,
        disposition,
        filename,
        headers,
    }
}

fn inline_headers(mime_type: &str) -> Vec<(&'static str, String)> {
    let kind = InlineKind::of(mime_type);

    let mut headers = vec![
        ("X-Frame-Options", "SAMEORIGIN".to_string()),
        ("Content-Security-Policy", kind.content_security_policy()),
        ("Permissions-Policy", PERMISSIONS_POLICY.to_string()),
        ("Cross-Origin-Resource-Policy", "same-origin".to_string()),
        ("Cross-Origin-Embedder-Policy", "require-corp".to_string()),
        ("Cross-Origin-Opener-Policy", "same-origin".to_string()),
    ];

    if kind != InlineKind::Other {
        headers.push(("Accept-Ranges", "none".to_string()));
    }

    headers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineKind {
    Pdf,
    Image,
    Other,
}

impl InlineKind {
    fn of(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/pdf" {
            InlineKind::Pdf
        } else if essence.starts_with("image/") {
            InlineKind::Image
        } else {
            InlineKind::Other
        }
    }

    fn content_security_policy(self) -> String {
        let object_src = match self {
            InlineKind::Pdf => "object-src 'self'",
            InlineKind::Image | InlineKind::Other => "object-src 'none'",
        };

        let mut directives = vec!["default-src 'self'"];
        if self == InlineKind::Image {
            directives.push("img-src 'self' data:");
        }
        directives.extend([
            object_src,
            "base-uri 'self'",
            "frame-ancestors 'self'",
            "form-action 'none'",
            "script-src 'none'",
            "style-src 'self' 'unsafe-inline'",
        ]);
        directives.join("; ")
    }
}

/// Make a file name safe to embed in a quoted header parameter.
///
/// Quotes, backslashes and control characters become `_`. An empty result
/// becomes `"download"`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_core::{FileId, UserId};

    fn meta(name: &str, mime_type: &str) -> FileMetadata {
        FileMetadata {
            id: FileId::from_bytes([1; 16]),
            owner: UserId::from("alice"),
            name: name.into(),
            mime_type: mime_type.into(),
            size: 3,
            uploaded_at: 0,
        }
    }

    #[test]
    fn test_download_is_opaque_attachment() {
        let resp = build(&meta("r.pdf", "application/pdf"), Bytes::from_static(b"abc"), Disposition::Attachment);

        assert_eq!(resp.content_type, OCTET_STREAM);
        assert_eq!(resp.header("content-disposition"), Some("attachment; filename=\"r.pdf\""));
        assert_eq!(resp.header("X-Content-Type-Options"), Some("nosniff"));
        assert!(resp.header("Content-Security-Policy").is_none());
    }

    #[test]
    fn test_inline_carries_full_bundle() {
        let resp = build(&meta("notes.txt", "text/plain"), Bytes::new(), Disposition::Inline);

        assert_eq!(resp.content_type, "text/plain");
        assert_eq!(resp.header("Content-Disposition"), Some("inline; filename=\"notes.txt\""));
        assert_eq!(resp.header("Cache-Control"), Some(CACHE_CONTROL));
        assert_eq!(resp.header("X-Frame-Options"), Some("SAMEORIGIN"));
        assert_eq!(resp.header("Cross-Origin-Opener-Policy"), Some("same-origin"));
        let csp = resp.header("Content-Security-Policy").unwrap();
        assert!(csp.contains("frame-ancestors 'self'"));
        assert!(csp.contains("object-src 'none'"));
        assert!(resp.header("Permissions-Policy").unwrap().contains("download=()"));
        assert!(resp.header("Accept-Ranges").is_none());
    }

    #[test]
    fn test_pdf_and_image_variants() {
        let pdf = build(&meta("a.pdf", "application/pdf"), Bytes::new(), Disposition::Inline);
        let csp = pdf.header("Content-Security-Policy").unwrap();
        assert!(csp.contains("object-src 'self'"));
        assert!(!csp.contains("object-src 'none'"));
        assert_eq!(pdf.header("Accept-Ranges"), Some("none"));

        let png = build(&meta("a.png", "image/png"), Bytes::new(), Disposition::Inline);
        assert!(png
            .header("Content-Security-Policy")
            .unwrap()
            .contains("img-src 'self' data:"));
        assert_eq!(png.header("Accept-Ranges"), Some("none"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("plain.txt"), "plain.txt");
        assert_eq!(sanitize_filename("a\"b\\c\r\n.txt"), "a_b_c__.txt");
        assert_eq!(sanitize_filename("  "), "download");
    }

    #[test]
    fn test_disposition_for_action() {
        assert_eq!(Disposition::for_action(Action::ViewContent), Some(Disposition::Inline));
        assert_eq!(Disposition::for_action(Action::Download), Some(Disposition::Attachment));
        assert_eq!(Disposition::for_action(Action::Edit), None);
    }
}
