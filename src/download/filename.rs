//! File name guessing for intercepted downloads.
//!
//! Order of precedence: the `Content-Disposition` file name, then the last
//! URL path segment, then `downloadfile`. The extension is then reconciled
//! with the declared MIME type.

use percent_encoding::percent_decode_str;
use url::Url;

const FALLBACK_NAME: &str = "downloadfile";
const OCTET_STREAM: &str = "application/octet-stream";

/// Extensions preferred over whatever `mime_guess` lists first.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("application/json", "json"),
    ("application/octet-stream", "bin"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("image/jpeg", "jpg"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/plain", "txt"),
];

/// Guesses the file name a download should be saved under.
pub fn guess_file_name(
    url: &Url,
    content_disposition: Option<&str>,
    mime_type: Option<&str>,
) -> String {
    let name = content_disposition
        .and_then(file_name_from_disposition)
        .or_else(|| file_name_from_url(url))
        .map(|name| last_component(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    let mime = mime_type.and_then(normalize_mime);
    reconcile_extension(name, mime.as_deref())
}

/// Extracts `filename*=` (preferred) or `filename=` from a
/// `Content-Disposition` value.
pub fn file_name_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // RFC 5987: charset'language'percent-encoded
                let encoded = raw.splitn(3, '\'').nth(2).unwrap_or(raw);
                let decoded = percent_decode_str(encoded.trim_matches('"'))
                    .decode_utf8_lossy()
                    .into_owned();
                extended = Some(decoded);
            }
            "filename" => {
                plain = Some(raw.trim_matches('"').to_string());
            }
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.trim().is_empty())
}

/// Last non-empty path segment of a hierarchical URL, percent-decoded.
fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

fn last_component(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `"Text/HTML; charset=utf-8"` → `"text/html"`.
fn normalize_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
    (!essence.is_empty()).then_some(essence)
}

/// Preferred extension (without the dot) for a MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    if let Some((_, ext)) = PREFERRED_EXTENSIONS.iter().find(|(m, _)| *m == mime) {
        return Some(*ext);
    }

    let candidates = mime_guess::get_mime_extensions_str(mime)?;
    candidates
        .iter()
        .find(|ext| mime_for_extension(ext).as_deref() == Some(mime))
        .or_else(|| candidates.first())
        .copied()
}

fn mime_for_extension(ext: &str) -> Option<String> {
    mime_guess::from_ext(ext)
        .first()
        .map(|m| m.essence_str().to_string())
}

fn reconcile_extension(name: String, mime: Option<&str>) -> String {
    match name.rfind('.').filter(|&dot| dot > 0) {
        None => {
            let ext = match mime {
                Some(m) => match extension_for_mime(m) {
                    Some(ext) => ext,
                    None if m == "text/html" => "html",
                    None if m.starts_with("text/") => "txt",
                    None => "bin",
                },
                None => "bin",
            };
            format!("{name}.{ext}")
        }
        Some(dot) => {
            let Some(mime) = mime.filter(|m| *m != OCTET_STREAM) else {
                return name;
            };
            let current = &name[dot + 1..];
            match mime_for_extension(current) {
                Some(from_ext) if from_ext != mime => match extension_for_mime(mime) {
                    Some(ext) => format!("{}.{ext}", &name[..dot]),
                    None => name,
                },
                _ => name,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(url: &str, disposition: Option<&str>, mime: Option<&str>) -> String {
        guess_file_name(&Url::parse(url).unwrap(), disposition, mime)
    }

    #[test]
    fn test_plain_url_with_matching_mime() {
        assert_eq!(
            guess("https://example.com/a.pdf", None, Some("application/pdf")),
            "a.pdf"
        );
    }

    #[test]
    fn test_missing_extension_taken_from_mime() {
        assert_eq!(
            guess("https://example.com/files/report", None, Some("application/pdf")),
            "report.pdf"
        );
        assert_eq!(
            guess("https://example.com/notes", None, Some("text/plain; charset=utf-8")),
            "notes.txt"
        );
    }

    #[test]
    fn test_unknown_types_fall_back() {
        assert_eq!(
            guess("https://example.com/blob", None, Some("text/x-made-up-kind")),
            "blob.txt"
        );
        assert_eq!(
            guess("https://example.com/blob", None, Some("application/x-made-up-kind")),
            "blob.bin"
        );
        assert_eq!(guess("https://example.com/blob", None, None), "blob.bin");
    }

    #[test]
    fn test_empty_path_uses_fallback_name() {
        assert_eq!(guess("https://example.com/", None, None), "downloadfile.bin");
        assert_eq!(
            guess("https://example.com/", None, Some("text/html")),
            "downloadfile.html"
        );
    }

    #[test]
    fn test_query_and_trailing_slash_ignored() {
        assert_eq!(
            guess("https://example.com/dir/book.epub/?v=2#top", None, None),
            "book.epub"
        );
    }

    #[test]
    fn test_percent_decoded_path() {
        assert_eq!(
            guess("https://example.com/my%20book.epub", None, None),
            "my book.epub"
        );
    }

    #[test]
    fn test_disposition_wins_over_url() {
        assert_eq!(
            guess(
                "https://example.com/download?id=7",
                Some("attachment; filename=\"Annual Report.pdf\""),
                Some("application/pdf"),
            ),
            "Annual Report.pdf"
        );
    }

    #[test]
    fn test_extended_disposition_is_decoded() {
        assert_eq!(
            guess(
                "https://example.com/x",
                Some("attachment; filename=fallback.txt; filename*=UTF-8''na%C3%AFve.txt"),
                Some("text/plain"),
            ),
            "naïve.txt"
        );
    }

    #[test]
    fn test_disposition_directories_stripped() {
        assert_eq!(
            guess(
                "https://example.com/x",
                Some("attachment; filename=\"../../evil.sh\""),
                None,
            ),
            "evil.sh"
        );
    }

    #[test]
    fn test_mismatched_extension_replaced() {
        assert_eq!(
            guess("https://example.com/export/data.json", None, Some("text/csv")),
            "data.csv"
        );
    }

    #[test]
    fn test_octet_stream_keeps_extension() {
        assert_eq!(
            guess(
                "https://example.com/archive.tar.gz",
                None,
                Some("application/octet-stream")
            ),
            "archive.tar.gz"
        );
    }

    #[test]
    fn test_disposition_without_filename() {
        assert_eq!(file_name_from_disposition("attachment"), None);
        assert_eq!(file_name_from_disposition("attachment; filename=\"\""), None);
        assert_eq!(
            file_name_from_disposition("inline; FILENAME=plain.txt"),
            Some("plain.txt".to_string())
        );
    }
}
