//! Couche d'intégration entre Servo et le lecteur.
//!
//! Ce module contient trois éléments clés :
//!
//! 1. **[`Waker`] / [`AppEvent`]** : le pont `Send + Sync` entre les threads
//!    d'arrière-plan (Servo, sélecteur de fichiers, file de téléchargement)
//!    et le thread principal Winit.
//!
//! 2. **[`WebViewDelegate`] pour [`AppState`]** : callbacks Servo traduits
//!    en appels [`HostHandlers`] (téléchargements, pont script, sélecteur).
//!
//! 3. **[`FileChooserCallback`] pour [`FilePicker`]** : le callback en attente
//!    côté page, résolu par le [`crate::file_picker::FilePickerBridge`].

use std::path::PathBuf;

use servo::{
    EmbedderControl, FilePicker, LoadStatus, WebResourceLoad, WebResourceResponse, WebView,
    WebViewDelegate,
};
use tracing::{debug, warn};
use url::Url;
use winit::event_loop::{EventLoop, EventLoopProxy};

use crate::browser::AppState;
use crate::download::DownloadRequest;
use crate::download::detect::{self, LoadKind};
use crate::download::queue::DownloadEvent;
use crate::file_picker::{self, ChooserOutcome, ChooserRequest, FileChooserCallback};
use crate::host::HostHandlers;
use crate::script_bridge;

// ─────────────────────────────────────────────────────────────────────────────
// Waker : pont threads d'arrière-plan → Winit
// ─────────────────────────────────────────────────────────────────────────────

/// Événements envoyés à travers le `EventLoopProxy` de Winit.
#[derive(Debug)]
pub enum AppEvent {
    /// Un thread Servo a du travail pour le thread principal :
    /// `user_event()` appelle `servo.spin_event_loop()`.
    Wake,
    /// Le sélecteur de fichiers natif a rendu la main.
    ChooserResult(ChooserOutcome),
    /// Un téléchargement en file s'est terminé.
    Download(DownloadEvent),
}

/// Pont thread-safe vers la boucle d'événements Winit.
///
/// `Waker` est `Clone + Send + Sync` car `EventLoopProxy` l'est, ce qui est
/// requis par `EventLoopWaker: 'static + Send + Sync`. Le même proxy sert au
/// sélecteur de fichiers et à la file de téléchargement via [`Waker::send`].
#[derive(Clone)]
pub struct Waker(EventLoopProxy<AppEvent>);

impl Waker {
    pub fn new(event_loop: &EventLoop<AppEvent>) -> Self {
        Self(event_loop.create_proxy())
    }

    /// Poste un événement ; perdu si la boucle est déjà fermée.
    pub fn send(&self, event: AppEvent) {
        if let Err(error) = self.0.send_event(event) {
            debug!(?error, "Boucle d'événements fermée, événement ignoré");
        }
    }
}

impl embedder_traits::EventLoopWaker for Waker {
    fn clone_box(&self) -> Box<dyn embedder_traits::EventLoopWaker> {
        Box::new(Self(self.0.clone()))
    }

    fn wake(&self) {
        if let Err(error) = self.0.send_event(AppEvent::Wake) {
            warn!(?error, "Échec du réveil de la boucle d'événements Winit");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback du sélecteur de fichiers
// ─────────────────────────────────────────────────────────────────────────────

impl FileChooserCallback for FilePicker {
    fn resolve(mut self, selection: Option<Vec<PathBuf>>) {
        match selection {
            Some(paths) => {
                self.select(&paths);
                self.submit();
            }
            None => self.dismiss(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WebViewDelegate : callbacks Servo → lecteur
// ─────────────────────────────────────────────────────────────────────────────

/// Chaque méthode est enveloppée dans `catch_unwind` : une panique ne doit
/// pas traverser la frontière avec Servo.
impl WebViewDelegate for AppState {
    fn notify_new_frame_ready(&self, _webview: WebView) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.window.request_redraw();
        }));
    }

    fn notify_page_title_changed(&self, _webview: WebView, title: Option<String>) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.notifier.set_page_title(title);
        }));
    }

    fn notify_url_changed(&self, _webview: WebView, url: Url) {
        debug!(%url, "Navigation");
    }

    /// Injecte le shim `pushFile` dès que l'en-tête est analysé, puis de
    /// nouveau en fin de chargement (le shim ignore une seconde injection).
    fn notify_load_status_changed(&self, webview: WebView, status: LoadStatus) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            if !injects_bridge_shim(status) {
                return;
            }
            webview.evaluate_javascript(&self.bridge_shim, |result| {
                if let Err(error) = result {
                    warn!(?error, "Injection du pont script échouée");
                }
            });
        }));
    }

    /// Appelé pour chaque requête émise par Servo.
    ///
    /// - origine du pont script → requête annulée, appel dispatché ;
    /// - navigation principale vers un fichier → annulée, téléchargement ;
    /// - le reste passe sans modification.
    fn load_web_resource(&self, _webview: WebView, load: WebResourceLoad) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let request = load.request();
            let url = request.url.clone();
            let is_for_main_frame = request.is_for_main_frame;

            if script_bridge::is_bridge_url(&url) {
                load.intercept(WebResourceResponse::new(url.clone())).cancel();
                match script_bridge::parse_bridge_request(&url, &self.bridge_token) {
                    Ok(call) => self.handlers.on_page_script_call(call),
                    Err(e) => warn!(path = url.path(), error = %e, "Appel du pont script refusé"),
                }
                return;
            }

            if !is_for_main_frame {
                return;
            }

            if let LoadKind::Download { mime_type } = detect::classify(&url) {
                load.intercept(WebResourceResponse::new(url.clone())).cancel();
                let download = DownloadRequest {
                    url,
                    user_agent: self.user_agent.clone(),
                    content_disposition: None,
                    mime_type,
                    content_length: None,
                };
                self.handlers.on_download_requested(&download);
            }
        }));
    }

    /// Seul le sélecteur de fichiers est pris en charge ; les autres
    /// contrôles sont abandonnés, ce que Servo traite comme une annulation.
    fn show_embedder_control(&self, _webview: WebView, embedder_control: EmbedderControl) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            match embedder_control {
                EmbedderControl::FilePicker(picker) => {
                    let request = ChooserRequest {
                        extensions: file_picker::extensions_from_patterns(
                            picker.filter_patterns().iter().map(|p| p.0.as_str()),
                        ),
                    };
                    self.handlers.on_file_chooser_requested(picker, request);
                }
                _ => debug!("Contrôle embedder ignoré"),
            }
        }));
    }
}

/// Étapes du chargement où le shim est injecté. Les scripts `<head>` qui
/// s'exécutent avant `HeadParsed` ne voient pas encore le pont.
fn injects_bridge_shim(status: LoadStatus) -> bool {
    matches!(status, LoadStatus::HeadParsed | LoadStatus::Complete)
}
