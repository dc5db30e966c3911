//! # Trial and Error Reading
//!
//! Single-page reader shell built on the Servo engine. The window hosts one
//! browser surface loading the reading site; the host adds what a bare
//! surface lacks: file inputs, downloads and a script-to-host file bridge.
//!
//! ## Module layout
//!
//! - [`browser`] : winit event loop and window lifecycle ("Two-Phase App").
//! - [`servo_glue`] : Servo delegate, event-loop waker and [`servo_glue::AppEvent`].
//! - [`host`] : the [`host::HostHandlers`] the surface calls into.
//! - [`file_picker`] : single-slot file chooser bridge, native dialog via `rfd`.
//! - [`download`] : download detection, file naming, interceptor and HTTP queue.
//! - [`script_bridge`] : `pushFile` shim and base64 → file writes.
//! - [`connectivity`] : network route probe.
//! - [`surface`] : surface capabilities and cache policy.
//! - [`preferences`] : surface settings + config → Servo `Preferences`.
//! - [`notice`] : transient notices shown in the window title.
//! - [`storage`] : downloads directory, access check, safe writes.
//! - [`config`] : TOML configuration.
//! - [`input`] : winit → Servo input translation and shortcuts.
//! - [`rendering`], [`resources`] : GL context and Servo resource reader.

pub mod browser;
pub mod config;
pub mod connectivity;
pub mod download;
pub mod file_picker;
pub mod host;
pub mod input;
pub mod notice;
pub mod preferences;
pub mod rendering;
pub mod resources;
pub mod script_bridge;
pub mod servo_glue;
pub mod storage;
pub mod surface;
