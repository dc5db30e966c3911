//! Boucle d'événements Winit et cycle de vie du lecteur.
//!
//! ## Pattern "Two-Phase App"
//!
//! Winit 0.30 impose que les fenêtres soient créées dans `resumed()`, et non
//! dans `main()`. Servo a besoin d'un handle de fenêtre pour son
//! `WindowRenderingContext`. D'où un enum à deux états :
//!
//! ```text
//! App::Initial { .. }  →  [resumed() appelé]  →  App::Running(Rc<AppState>)
//! ```
//!
//! ## Flux d'événements
//!
//! ```text
//! Threads Servo ─── wake() ──────────────┐
//! Thread "file-chooser" ─ ChooserResult ─┼─► EventLoopProxy<AppEvent>
//! Thread "download-queue" ─ Download ────┘          │
//!                                                   ▼
//!                                   user_event() (thread principal)
//!                                     ├─ Wake → servo.spin_event_loop()
//!                                     ├─ ChooserResult → FilePickerBridge
//!                                     └─ Download → notice
//! ```
//!
//! La fenêtre entière est la page : pas de chrome, la barre de titre sert
//! de surface de notices.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use euclid::Scale;
use servo::{
    FilePicker, InputEvent, MouseButtonEvent, MouseLeftViewportEvent, MouseMoveEvent,
    RenderingContext, Servo, ServoBuilder, WebView, WebViewBuilder, WheelEvent,
    WindowRenderingContext,
};
use tracing::{error, info, warn};
use url::Url;
use webrender_api::units::DevicePoint;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::ModifiersState;
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use crate::config::Config;
use crate::connectivity::{Connectivity, SystemConnectivity};
use crate::download::queue::HttpDownloadQueue;
use crate::download::{DownloadInterceptor, DownloadPolicy};
use crate::file_picker::RfdLauncher;
use crate::host::ReaderHandlers;
use crate::input::{self, Shortcut};
use crate::notice::{Notice, NoticeBoard, Notifier};
use crate::preferences;
use crate::rendering;
use crate::script_bridge::{self, ScriptBridge};
use crate::servo_glue::{AppEvent, Waker};
use crate::surface::SurfaceSettings;

// ─────────────────────────────────────────────────────────────────────────────
// WindowNotifier : notices dans la barre de titre
// ─────────────────────────────────────────────────────────────────────────────

/// Affiche les notices dans le titre de la fenêtre, devant le titre de la
/// page. L'expiration est pilotée par `about_to_wait()`.
pub struct WindowNotifier {
    window: Rc<Window>,
    board: RefCell<NoticeBoard>,
}

impl WindowNotifier {
    pub fn new(window: Rc<Window>, app_name: &str) -> Self {
        Self {
            window,
            board: RefCell::new(NoticeBoard::new(app_name)),
        }
    }

    pub fn set_page_title(&self, title: Option<String>) {
        self.board.borrow_mut().set_page_title(title);
        self.refresh();
    }

    /// Retire la notice échue et renvoie la prochaine échéance.
    pub fn expire(&self, now: Instant) -> Option<Instant> {
        if self.board.borrow_mut().expire(now) {
            self.refresh();
        }
        self.board.borrow().deadline()
    }

    fn refresh(&self) {
        let title = self.board.borrow().title();
        self.window.set_title(&title);
    }
}

impl Notifier for WindowNotifier {
    fn notify(&self, notice: Notice) {
        info!(duration = ?notice.duration, "{}", notice.message);
        self.board.borrow_mut().show(notice, Instant::now());
        self.refresh();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AppState : état partagé entre Winit et Servo
// ─────────────────────────────────────────────────────────────────────────────

/// État du lecteur, créé lors de `resumed()`.
///
/// Encapsulé dans `Rc` : `WebViewBuilder::delegate` attend un
/// `Rc<dyn WebViewDelegate>` et tout vit sur le thread principal.
pub struct AppState {
    pub window: Rc<Window>,
    pub servo: Servo,
    pub rendering_context: Rc<WindowRenderingContext>,
    /// L'unique surface de lecture.
    pub webview: RefCell<Option<WebView>>,
    /// Position courante du curseur en device pixels.
    pub cursor_position: Cell<DevicePoint>,
    pub modifiers: Cell<ModifiersState>,
    pub notifier: Rc<WindowNotifier>,
    pub handlers: ReaderHandlers<FilePicker>,
    /// Transmis à la file de téléchargement.
    pub user_agent: String,
    /// Jeton de session exigé sur chaque appel du pont script.
    pub bridge_token: String,
    /// Script injecté à chaque chargement.
    pub bridge_shim: String,
    pub surface: SurfaceSettings,
    pub page_zoom: Cell<f32>,
}

impl AppState {
    fn create(
        event_loop: &ActiveEventLoop,
        waker: Waker,
        config: &Config,
        downloads_dir: PathBuf,
    ) -> Result<Rc<Self>, Box<dyn Error>> {
        // ── 1. Fenêtre ─────────────────────────────────────────────────
        let display_handle = event_loop.display_handle()?;
        let window_attributes = Window::default_attributes()
            .with_title(config.general.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width as f64,
                config.window.height as f64,
            ));
        let window = Rc::new(event_loop.create_window(window_attributes)?);
        let window_handle = window.window_handle()?;

        // ── 2. Contexte de rendu ───────────────────────────────────────
        let rendering_context = rendering::create_rendering_context(
            display_handle,
            window_handle,
            window.inner_size(),
        )?;

        // ── 3. Surface : politique de cache selon la connectivité ──────
        let connectivity: Rc<dyn Connectivity> = Rc::new(SystemConnectivity::new());
        let surface = SurfaceSettings::configure(connectivity.as_ref());

        // ── 4. Instance Servo ──────────────────────────────────────────
        let servo = ServoBuilder::default()
            .preferences(preferences::build_servo_preferences(config, &surface))
            .event_loop_waker(Box::new(waker.clone()))
            .build();

        // ── 5. Handlers ────────────────────────────────────────────────
        let notifier = Rc::new(WindowNotifier::new(
            window.clone(),
            &config.general.window_title,
        ));

        let queue_waker = waker.clone();
        let queue = HttpDownloadQueue::start(move |event| {
            queue_waker.send(AppEvent::Download(event));
        })?;
        let downloads = DownloadInterceptor::new(
            connectivity,
            Box::new(queue),
            notifier.clone(),
            DownloadPolicy {
                destination_dir: downloads_dir.clone(),
                notify_on_completion: config.downloads.notify_on_completion,
                allow_metered: config.downloads.allow_metered,
                allow_roaming: config.downloads.allow_roaming,
            },
        );
        let script_bridge = ScriptBridge::new(downloads_dir, notifier.clone());
        let launcher = RfdLauncher::new(move |outcome| {
            waker.send(AppEvent::ChooserResult(outcome));
        });
        let handlers = ReaderHandlers::new(
            Box::new(launcher),
            downloads,
            script_bridge,
            notifier.clone(),
        );

        let bridge_token = script_bridge::session_token();
        let bridge_shim = script_bridge::shim_script(&config.bridge.namespace, &bridge_token);

        Ok(Rc::new(Self {
            window,
            servo,
            rendering_context,
            webview: RefCell::new(None),
            cursor_position: Cell::new(DevicePoint::zero()),
            modifiers: Cell::new(ModifiersState::default()),
            notifier,
            handlers,
            user_agent: preferences::effective_user_agent(config),
            bridge_token,
            bridge_shim,
            surface,
            page_zoom: Cell::new(1.0),
        }))
    }

    fn with_webview(&self, f: impl FnOnce(&WebView)) {
        if let Some(webview) = self.webview.borrow().as_ref() {
            f(webview);
        }
    }

    fn run_shortcut(&self, shortcut: Shortcut) {
        self.with_webview(|webview| match shortcut {
            Shortcut::Reload => webview.reload(),
            Shortcut::Back => {
                webview.go_back(1);
            }
            Shortcut::Forward => {
                webview.go_forward(1);
            }
            Shortcut::ZoomIn | Shortcut::ZoomOut | Shortcut::ZoomReset => {
                let zoom = input::next_page_zoom(self.page_zoom.get(), shortcut);
                self.page_zoom.set(zoom);
                webview.set_page_zoom(zoom);
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App : enum deux phases
// ─────────────────────────────────────────────────────────────────────────────

pub enum App {
    /// Phase pré-initialisation : on attend que Winit appelle `resumed()`.
    Initial {
        waker: Waker,
        config: Config,
        start_url: Url,
        downloads_dir: PathBuf,
    },

    /// Phase opérationnelle : le lecteur est actif.
    Running(Rc<AppState>),
}

impl App {
    pub fn new(
        event_loop: &EventLoop<AppEvent>,
        config: Config,
        start_url: Url,
        downloads_dir: PathBuf,
    ) -> Self {
        Self::Initial {
            waker: Waker::new(event_loop),
            config,
            start_url,
            downloads_dir,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ApplicationHandler : dispatch des événements Winit
// ─────────────────────────────────────────────────────────────────────────────

impl ApplicationHandler<AppEvent> for App {
    /// Appelé une fois par Winit quand l'application peut créer des fenêtres.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Self::Initial {
            waker,
            config,
            start_url,
            downloads_dir,
        } = self
        else {
            return;
        };

        let state = match AppState::create(event_loop, waker.clone(), config, downloads_dir.clone())
        {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Cannot start the reader");
                event_loop.exit();
                return;
            }
        };

        // Une seule surface, chargée une seule fois.
        let webview = WebViewBuilder::new(
            &state.servo,
            state.rendering_context.clone() as Rc<dyn RenderingContext>,
        )
        .url(start_url.clone())
        .hidpi_scale_factor(Scale::new(state.window.scale_factor() as f32))
        .delegate(state.clone())
        .build();
        *state.webview.borrow_mut() = Some(webview);
        info!(url = %start_url, "Reader started");

        *self = Self::Running(state);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        let Self::Running(state) = self else {
            return;
        };
        match event {
            AppEvent::Wake => state.servo.spin_event_loop(),
            AppEvent::ChooserResult(outcome) => state.handlers.on_chooser_result(outcome),
            AppEvent::Download(event) => state.handlers.on_download_event(event),
        }
    }

    /// La webview garde son délégué (`Rc<AppState>`) : on la libère ici pour
    /// que l'état soit détruit et la file de téléchargement arrêtée.
    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Self::Running(state) = self {
            state.webview.borrow_mut().take();
        }
    }

    /// Planifie le réveil suivant à l'échéance de la notice affichée.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Self::Running(state) = self {
            match state.notifier.expire(Instant::now()) {
                Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => event_loop.set_control_flow(ControlFlow::Wait),
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Self::Running(state) = self else {
            return;
        };
        // Toujours faire tourner la boucle Servo en premier.
        state.servo.spin_event_loop();

        match event {
            WindowEvent::CloseRequested => {
                if state.handlers.is_awaiting_chooser() {
                    warn!("Closing with a file chooser still open");
                }
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                state.with_webview(|webview| {
                    webview.paint();
                });
                state.rendering_context.present();
            }

            WindowEvent::Resized(new_size) => {
                state.rendering_context.resize(new_size);
                state.with_webview(|webview| {
                    webview.resize(new_size);
                });
            }

            WindowEvent::ModifiersChanged(new_modifiers) => {
                state.modifiers.set(new_modifiers.state());
            }

            WindowEvent::CursorMoved { position, .. } => {
                let point = DevicePoint::new(position.x as f32, position.y as f32);
                state.cursor_position.set(point);
                state.with_webview(|webview| {
                    webview.notify_input_event(InputEvent::MouseMove(MouseMoveEvent::new(
                        point.into(),
                    )));
                });
            }

            WindowEvent::CursorLeft { .. } => {
                state.with_webview(|webview| {
                    webview.notify_input_event(InputEvent::MouseLeftViewport(
                        MouseLeftViewportEvent::default(),
                    ));
                });
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let zoom_enabled = state.surface.zoom_shortcuts_enabled();
                if let Some(shortcut) =
                    input::zoom_for_wheel(delta, state.modifiers.get(), zoom_enabled)
                {
                    state.run_shortcut(shortcut);
                    return;
                }
                let point = state.cursor_position.get();
                state.with_webview(|webview| {
                    webview.notify_input_event(InputEvent::Wheel(WheelEvent::new(
                        input::wheel_delta_from_winit(delta),
                        point.into(),
                    )));
                });
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let point = state.cursor_position.get();
                state.with_webview(|webview| {
                    webview.notify_input_event(InputEvent::MouseButton(MouseButtonEvent::new(
                        input::mouse_action_from_winit(button_state),
                        input::mouse_button_from_winit(button),
                        point.into(),
                    )));
                });
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let mods = state.modifiers.get();
                let zoom_enabled = state.surface.zoom_shortcuts_enabled();
                if let Some(shortcut) =
                    input::shortcut_for(&event.logical_key, event.state, mods, zoom_enabled)
                {
                    state.run_shortcut(shortcut);
                    return;
                }
                state.with_webview(|webview| {
                    webview.notify_input_event(InputEvent::Keyboard(
                        input::keyboard_event_from_winit(&event, mods),
                    ));
                });
            }

            _ => (),
        }
    }
}
