//! Factory pour le contexte de rendu GPU.
//!
//! La fenêtre entière est la surface de lecture : Servo peint directement
//! dans le `WindowRenderingContext`, sans FBO intermédiaire.

use std::rc::Rc;

use servo::WindowRenderingContext;
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::raw_window_handle::{DisplayHandle, WindowHandle};

#[derive(Debug, Error)]
pub enum RenderingError {
    #[error("cannot create the window rendering context: {0}")]
    Create(String),
    #[error("cannot make the GL context current: {0}")]
    MakeCurrent(String),
}

/// Crée un contexte de rendu hardware-acceléré lié à la fenêtre Winit.
///
/// Le contexte est rendu courant (`make_current`) avant d'être retourné,
/// ce qui est requis avant de le passer à `WebViewBuilder`. Sans GPU il n'y
/// a pas de lecteur : l'erreur remonte jusqu'à `main`.
pub fn create_rendering_context(
    display_handle: DisplayHandle<'_>,
    window_handle: WindowHandle<'_>,
    size: PhysicalSize<u32>,
) -> Result<Rc<WindowRenderingContext>, RenderingError> {
    let rendering_context = WindowRenderingContext::new(display_handle, window_handle, size)
        .map_err(|e| RenderingError::Create(format!("{e:?}")))?;

    rendering_context
        .make_current()
        .map_err(|e| RenderingError::MakeCurrent(format!("{e:?}")))?;

    Ok(Rc::new(rendering_context))
}
