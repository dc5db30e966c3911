//! Decides whether a main-frame load is a page or a file to download.
//!
//! The surface renders documents, images and media itself. Anything else
//! (PDFs, archives, e-books, office files…) is handed to the interceptor.
//! Only the URL is known when the load starts, so the decision uses the
//! path extension for http(s) and the declared media type for `data:`.

use url::Url;

/// Types the surface displays in place.
fn is_viewable(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    let top = mime.split('/').next().unwrap_or_default();
    matches!(top, "text" | "image" | "audio" | "video")
        || matches!(
            mime.as_str(),
            "application/xhtml+xml"
                | "application/xml"
                | "application/json"
                | "application/javascript"
                | "application/ecmascript"
                | "application/wasm"
        )
}

/// Media type declared by a `data:` URL (`text/plain` when omitted).
pub fn data_url_mime(url: &Url) -> Option<String> {
    if url.scheme() != "data" {
        return None;
    }
    let header = url.path().split(',').next()?;
    let mime = header.split(';').next().unwrap_or_default().trim();
    Some(if mime.is_empty() {
        "text/plain".to_string()
    } else {
        mime.to_ascii_lowercase()
    })
}

/// MIME type implied by the URL path extension, if any.
pub fn mime_from_path(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let dot = last.rfind('.').filter(|&d| d > 0)?;
    mime_guess::from_ext(&last[dot + 1..])
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Download verdict plus the MIME type it was based on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadKind {
    Page,
    Download { mime_type: Option<String> },
}

/// Classifies a main-frame load.
pub fn classify(url: &Url) -> LoadKind {
    match url.scheme() {
        "blob" => LoadKind::Download { mime_type: None },
        "data" => match data_url_mime(url) {
            Some(mime) if !is_viewable(&mime) => LoadKind::Download {
                mime_type: Some(mime),
            },
            _ => LoadKind::Page,
        },
        "http" | "https" => match mime_from_path(url) {
            Some(mime) if !is_viewable(&mime) => LoadKind::Download {
                mime_type: Some(mime),
            },
            _ => LoadKind::Page,
        },
        _ => LoadKind::Page,
    }
}
