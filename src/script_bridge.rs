//! Script-to-host bridge: page script pushes files to the downloads folder.
//!
//! The download interceptor refuses `blob:` and `data:` URLs because the
//! queue cannot fetch them. Pages that already hold the bytes call
//! `window.Android.pushFile(name, base64, mime)` instead.
//!
//! ## Transport
//!
//! ```text
//! page script ── pushFile() ──► fetch("https://trialreader.bridge/push-file?token=…&…")
//!                                     │
//!                     load_web_resource() intercepts + cancels
//!                                     ▼
//!                     ScriptBridge::on_page_script_call()
//!                       └─ decode base64 → write → notice
//! ```
//!
//! The endpoint is `https` so pages served over TLS can reach it without a
//! mixed-content block; the request is cancelled before any connection is
//! made. Each session has a random token that only the injected shim
//! knows, so a plain `<img src>` or a third-party frame cannot write files.
//!
//! The shim defining the page-side function is injected once the document
//! head is parsed and again when the load completes (see [`shim_script`]).

use std::path::PathBuf;
use std::rc::Rc;

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::notice::{Notice, Notifier};
use crate::storage::{self, StorageError};

/// Reserved origin for bridge calls. Never resolved on the network.
pub const BRIDGE_HOST: &str = "trialreader.bridge";
const BRIDGE_SCHEME: &str = "https";
const PUSH_FILE_PATH: &str = "/push-file";
const DEFAULT_NAMESPACE: &str = "Android";
const DEFAULT_MIME: &str = "application/octet-stream";

/// Standard alphabet; padding optional like most page-side encoders.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("missing `{0}` parameter")]
    MissingParameter(&'static str),
    #[error("bridge call without a valid session token")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BridgeError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Storage(StorageError::PermissionDenied(_)))
    }
}

/// A file pushed by page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedFile {
    pub file_name: String,
    pub payload: String,
    pub mime_type: String,
}

/// Calls page script can make into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCall {
    PushFile(PushedFile),
}

/// Random token for one run of the reader.
pub fn session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `true` for requests addressed to the bridge origin.
pub fn is_bridge_url(url: &Url) -> bool {
    url.scheme() == BRIDGE_SCHEME && url.host_str() == Some(BRIDGE_HOST)
}

/// Decodes a bridge request URL into a call. Requests that do not carry
/// `token` are refused.
pub fn parse_bridge_request(url: &Url, token: &str) -> Result<ScriptCall, BridgeError> {
    let authorized = url
        .query_pairs()
        .any(|(key, value)| key == "token" && value == token);
    if !authorized || token.is_empty() {
        return Err(BridgeError::Unauthorized);
    }

    if url.path() != PUSH_FILE_PATH {
        warn!(path = url.path(), "Unknown bridge call");
    }

    let mut file_name = None;
    let mut payload = None;
    let mut mime_type = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "name" => file_name = Some(value.into_owned()),
            "data" => payload = Some(value.into_owned()),
            "mime" => mime_type = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(ScriptCall::PushFile(PushedFile {
        file_name: file_name.ok_or(BridgeError::MissingParameter("name"))?,
        payload: payload.ok_or(BridgeError::MissingParameter("data"))?,
        mime_type: mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string()),
    }))
}

/// Decodes a base64 payload. ASCII whitespace is ignored and a leading
/// `data:<type>;base64,` prefix is accepted.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, BridgeError> {
    let body = match payload.trim_start().strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, body)| body),
        None => payload,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(PAYLOAD_ENGINE.decode(compact)?)
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Page-side shim exposing `pushFile` (and the `startDownload` alias) on
/// `window.<namespace>`. The token stays inside the shim's closure.
pub fn shim_script(namespace: &str, token: &str) -> String {
    let namespace = if is_js_identifier(namespace) {
        namespace
    } else {
        warn!(namespace, "Invalid bridge namespace, using default");
        DEFAULT_NAMESPACE
    };
    // An empty token never authorizes a call.
    let token = if token.chars().all(|c| c.is_ascii_alphanumeric()) {
        token
    } else {
        warn!("Invalid bridge token, bridge calls will be refused");
        ""
    };

    format!(
        r#"(function () {{
  var host = window.{namespace} || {{}};
  if (host.__trialreaderBridge) {{ return; }}
  var endpoint = "{BRIDGE_SCHEME}://{BRIDGE_HOST}{PUSH_FILE_PATH}";
  var token = "{token}";
  function pushFile(fileName, base64Data, mimeType) {{
    var query = "token=" + token
      + "&name=" + encodeURIComponent(String(fileName))
      + "&mime=" + encodeURIComponent(String(mimeType || ""))
      + "&data=" + encodeURIComponent(String(base64Data));
    try {{ fetch(endpoint + "?" + query).catch(function () {{}}); }} catch (e) {{}}
  }}
  host.pushFile = pushFile;
  host.startDownload = pushFile;
  host.__trialreaderBridge = true;
  window.{namespace} = host;
}})();"#
    )
}

/// Host side of the bridge.
pub struct ScriptBridge {
    destination_dir: PathBuf,
    notifier: Rc<dyn Notifier>,
}

impl ScriptBridge {
    pub fn new(destination_dir: PathBuf, notifier: Rc<dyn Notifier>) -> Self {
        Self {
            destination_dir,
            notifier,
        }
    }

    pub fn on_page_script_call(&self, call: ScriptCall) {
        match call {
            ScriptCall::PushFile(file) => {
                // Already logged and shown as a notice.
                if let Err(e) = self.push_file(&file.file_name, &file.payload, &file.mime_type) {
                    debug!(error = %e, "pushFile call failed");
                }
            }
        }
    }

    /// Decodes `payload` and writes it to the downloads directory.
    /// Outcomes are reported as notices; the result is for callers that
    /// want the path.
    pub fn push_file(
        &self,
        file_name: &str,
        payload: &str,
        mime_type: &str,
    ) -> Result<PathBuf, BridgeError> {
        let result = decode_payload(payload).and_then(|bytes| {
            storage::write_file(&self.destination_dir, file_name, &bytes).map_err(BridgeError::from)
        });

        match &result {
            Ok(path) => {
                info!(path = %path.display(), mime_type, "File pushed by page");
                let shown = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.to_string());
                self.notifier
                    .notify(Notice::short(format!("File saved: {shown}")));
            }
            Err(e) => {
                error!(
                    file_name,
                    mime_type,
                    permission_denied = e.is_permission_denied(),
                    error = %e,
                    "Pushed file not saved"
                );
                self.notifier
                    .notify(Notice::long(format!("Download failed: {e}")));
            }
        }
        result
    }
}
