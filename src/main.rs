//! Point d'entrée de Trial and Error Reading.
//!
//! Usage :
//!   trialreader [URL]
//!
//! Exemples :
//!   cargo run                              → charge `general.start_url`
//!   cargo run -- quwarm.github.io/x/       → ajoute https:// automatiquement

use std::env;
use std::error::Error;

use tracing::warn;
use url::Url;
use winit::event_loop::EventLoop;

use trialreader::browser::App;
use trialreader::config::Config;
use trialreader::servo_glue::AppEvent;
use trialreader::storage;

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Provider crypto TLS (Servo et reqwest) ──────────────────────
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| "rustls crypto provider already installed")?;

    // ── 2. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    #[cfg(debug_assertions)]
    warn!("Running in DEBUG mode — pages will load very slowly. Use `cargo run --release`.");

    // ── 3. Configuration ───────────────────────────────────────────────
    let config = Config::load();

    // ── 4. Lecteur de ressources Servo ─────────────────────────────────
    trialreader::resources::init()?;

    // ── 5. Dossier de téléchargements ──────────────────────────────────
    // Chaque écriture revérifie l'accès ; ici on prévient seulement.
    let downloads_dir = storage::downloads_dir(config.downloads_dir_override());
    if let Err(e) = storage::check_access(&downloads_dir) {
        warn!(error = %e, "Downloads directory is not writable; saving files will fail");
    }

    // ── 6. URL de départ ───────────────────────────────────────────────
    let start_url = start_url(&config)?;

    // ── 7. Boucle d'événements Winit ───────────────────────────────────
    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, start_url, downloads_dir);

    Ok(event_loop.run_app(&mut app)?)
}

/// Premier argument CLI, sinon `general.start_url`. Sans schéma, on
/// ajoute "https://".
fn start_url(config: &Config) -> Result<Url, url::ParseError> {
    let input = env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| config.general.start_url.clone());

    Url::parse(&input).or_else(|_| Url::parse(&format!("https://{input}")))
}
