//! Winit → Servo input translation.
//!
//! Winit key and code names follow the W3C UI Events tables, as do the
//! `keyboard_types` values Servo re-exports, so named keys and physical
//! codes are matched by name. Reader shortcuts are recognised here before
//! anything reaches the page.

use std::str::FromStr;

use servo::{
    Code, Key, KeyState, KeyboardEvent, Location, Modifiers, MouseButton, MouseButtonAction,
    NamedKey, WheelDelta, WheelMode,
};
use winit::event::{ElementState, KeyEvent, MouseButton as WinitMouseButton, MouseScrollDelta};
use winit::keyboard::{
    Key as WinitKey, KeyCode, KeyLocation as WinitKeyLocation, ModifiersState,
    NamedKey as WinitNamedKey, PhysicalKey,
};

/// Pixels per wheel "line", as servoshell uses.
const LINE_HEIGHT: f64 = 76.0;

const ZOOM_STEP: f32 = 1.1;
const MIN_PAGE_ZOOM: f32 = 0.3;
const MAX_PAGE_ZOOM: f32 = 5.0;

/// Shell-level actions bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Reload,
    Back,
    Forward,
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

/// Recognises F5 / Ctrl+R, Alt+Left and Alt+Right on key press, plus
/// Ctrl+= / Ctrl+- / Ctrl+0 when `zoom_enabled`.
pub fn shortcut_for(
    key: &WinitKey,
    state: ElementState,
    mods: ModifiersState,
    zoom_enabled: bool,
) -> Option<Shortcut> {
    if state != ElementState::Pressed {
        return None;
    }
    match key {
        WinitKey::Named(WinitNamedKey::F5) => Some(Shortcut::Reload),
        WinitKey::Character(c) if mods.control_key() => match c.as_str() {
            "r" | "R" => Some(Shortcut::Reload),
            "=" | "+" if zoom_enabled => Some(Shortcut::ZoomIn),
            "-" if zoom_enabled => Some(Shortcut::ZoomOut),
            "0" if zoom_enabled => Some(Shortcut::ZoomReset),
            _ => None,
        },
        WinitKey::Named(WinitNamedKey::ArrowLeft) if mods.alt_key() => Some(Shortcut::Back),
        WinitKey::Named(WinitNamedKey::ArrowRight) if mods.alt_key() => Some(Shortcut::Forward),
        _ => None,
    }
}

/// Ctrl+wheel zooms instead of scrolling.
pub fn zoom_for_wheel(
    delta: MouseScrollDelta,
    mods: ModifiersState,
    zoom_enabled: bool,
) -> Option<Shortcut> {
    if !zoom_enabled || !mods.control_key() {
        return None;
    }
    let dy = match delta {
        MouseScrollDelta::LineDelta(_, dy) => dy as f64,
        MouseScrollDelta::PixelDelta(delta) => delta.y,
    };
    if dy > 0.0 {
        Some(Shortcut::ZoomIn)
    } else if dy < 0.0 {
        Some(Shortcut::ZoomOut)
    } else {
        None
    }
}

/// Page zoom after a zoom shortcut, clamped to a readable range. Other
/// shortcuts leave it unchanged.
pub fn next_page_zoom(current: f32, shortcut: Shortcut) -> f32 {
    let next = match shortcut {
        Shortcut::ZoomIn => current * ZOOM_STEP,
        Shortcut::ZoomOut => current / ZOOM_STEP,
        Shortcut::ZoomReset => 1.0,
        Shortcut::Reload | Shortcut::Back | Shortcut::Forward => current,
    };
    next.clamp(MIN_PAGE_ZOOM, MAX_PAGE_ZOOM)
}

pub fn keyboard_event_from_winit(key_event: &KeyEvent, mods: ModifiersState) -> KeyboardEvent {
    KeyboardEvent::new_without_event(
        match key_event.state {
            ElementState::Pressed => KeyState::Down,
            ElementState::Released => KeyState::Up,
        },
        key_from_winit(&key_event.logical_key),
        code_from_winit(&key_event.physical_key),
        location_from_winit(key_event.location),
        modifiers_from_winit(mods),
        key_event.repeat,
        false,
    )
}

fn key_from_winit(logical_key: &WinitKey) -> Key {
    match logical_key {
        WinitKey::Character(c) => Key::Character(c.to_string()),
        WinitKey::Named(WinitNamedKey::Space) => Key::Character(" ".to_string()),
        // winit splits the OS key into Super; the DOM calls it Meta.
        WinitKey::Named(WinitNamedKey::Super) => Key::Named(NamedKey::Meta),
        WinitKey::Named(named) => Key::Named(
            NamedKey::from_str(&format!("{named:?}")).unwrap_or(NamedKey::Unidentified),
        ),
        WinitKey::Unidentified(_) | WinitKey::Dead(_) => Key::Named(NamedKey::Unidentified),
    }
}

fn code_from_winit(physical_key: &PhysicalKey) -> Code {
    match physical_key {
        PhysicalKey::Code(KeyCode::SuperLeft) => Code::MetaLeft,
        PhysicalKey::Code(KeyCode::SuperRight) => Code::MetaRight,
        PhysicalKey::Code(code) => {
            Code::from_str(&format!("{code:?}")).unwrap_or(Code::Unidentified)
        }
        PhysicalKey::Unidentified(_) => Code::Unidentified,
    }
}

fn location_from_winit(location: WinitKeyLocation) -> Location {
    match location {
        WinitKeyLocation::Left => Location::Left,
        WinitKeyLocation::Numpad => Location::Numpad,
        WinitKeyLocation::Right => Location::Right,
        WinitKeyLocation::Standard => Location::Standard,
    }
}

fn modifiers_from_winit(mods: ModifiersState) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::CONTROL, mods.control_key());
    modifiers.set(Modifiers::SHIFT, mods.shift_key());
    modifiers.set(Modifiers::ALT, mods.alt_key());
    modifiers.set(Modifiers::META, mods.super_key());
    modifiers
}

pub fn mouse_button_from_winit(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}

pub fn mouse_action_from_winit(state: ElementState) -> MouseButtonAction {
    match state {
        ElementState::Pressed => MouseButtonAction::Down,
        ElementState::Released => MouseButtonAction::Up,
    }
}

pub fn wheel_delta_from_winit(delta: MouseScrollDelta) -> WheelDelta {
    let (x, y, mode) = match delta {
        MouseScrollDelta::LineDelta(dx, dy) => (
            dx as f64 * LINE_HEIGHT,
            dy as f64 * LINE_HEIGHT,
            WheelMode::DeltaLine,
        ),
        MouseScrollDelta::PixelDelta(delta) => (delta.x, delta.y, WheelMode::DeltaPixel),
    };
    WheelDelta { x, y, z: 0.0, mode }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_reload_shortcuts() {
        let none = ModifiersState::empty();
        assert_eq!(
            shortcut_for(&WinitKey::Named(WinitNamedKey::F5), ElementState::Pressed, none, true),
            Some(Shortcut::Reload)
        );
        assert_eq!(
            shortcut_for(
                &WinitKey::Character("R".into()),
                ElementState::Pressed,
                ModifiersState::CONTROL,
                true
            ),
            Some(Shortcut::Reload)
        );
        assert_eq!(
            shortcut_for(&WinitKey::Character("r".into()), ElementState::Pressed, none, true),
            None
        );
    }

    #[test]
    fn test_history_shortcuts_need_alt() {
        let left = WinitKey::Named(WinitNamedKey::ArrowLeft);
        let right = WinitKey::Named(WinitNamedKey::ArrowRight);
        assert_eq!(
            shortcut_for(&left, ElementState::Pressed, ModifiersState::ALT, true),
            Some(Shortcut::Back)
        );
        assert_eq!(
            shortcut_for(&right, ElementState::Pressed, ModifiersState::ALT, true),
            Some(Shortcut::Forward)
        );
        assert_eq!(
            shortcut_for(&left, ElementState::Pressed, ModifiersState::empty(), true),
            None
        );
    }

    #[test]
    fn test_shortcuts_ignore_release() {
        assert_eq!(
            shortcut_for(
                &WinitKey::Named(WinitNamedKey::F5),
                ElementState::Released,
                ModifiersState::empty(),
                true
            ),
            None
        );
    }

    #[test]
    fn test_zoom_keys_follow_surface_setting() {
        let ctrl = ModifiersState::CONTROL;
        let press = |c: &str, zoom| {
            shortcut_for(&WinitKey::Character(c.into()), ElementState::Pressed, ctrl, zoom)
        };
        assert_eq!(press("=", true), Some(Shortcut::ZoomIn));
        assert_eq!(press("+", true), Some(Shortcut::ZoomIn));
        assert_eq!(press("-", true), Some(Shortcut::ZoomOut));
        assert_eq!(press("0", true), Some(Shortcut::ZoomReset));
        assert_eq!(press("=", false), None);
        assert_eq!(press("r", false), Some(Shortcut::Reload));
        assert_eq!(
            shortcut_for(
                &WinitKey::Character("=".into()),
                ElementState::Pressed,
                ModifiersState::empty(),
                true
            ),
            None
        );
    }

    #[test]
    fn test_ctrl_wheel_zooms() {
        let up = MouseScrollDelta::LineDelta(0.0, 1.0);
        let down = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -12.0));
        let ctrl = ModifiersState::CONTROL;
        assert_eq!(zoom_for_wheel(up, ctrl, true), Some(Shortcut::ZoomIn));
        assert_eq!(zoom_for_wheel(down, ctrl, true), Some(Shortcut::ZoomOut));
        assert_eq!(zoom_for_wheel(up, ModifiersState::empty(), true), None);
        assert_eq!(zoom_for_wheel(up, ctrl, false), None);
        assert_eq!(zoom_for_wheel(MouseScrollDelta::LineDelta(2.0, 0.0), ctrl, true), None);
    }

    #[test]
    fn test_page_zoom_steps_and_bounds() {
        let zoomed = next_page_zoom(1.0, Shortcut::ZoomIn);
        assert!((zoomed - 1.1).abs() < 1e-6);
        assert!((next_page_zoom(zoomed, Shortcut::ZoomOut) - 1.0).abs() < 1e-6);
        assert_eq!(next_page_zoom(2.5, Shortcut::ZoomReset), 1.0);
        assert_eq!(next_page_zoom(MAX_PAGE_ZOOM, Shortcut::ZoomIn), MAX_PAGE_ZOOM);
        assert_eq!(next_page_zoom(MIN_PAGE_ZOOM, Shortcut::ZoomOut), MIN_PAGE_ZOOM);
        assert_eq!(next_page_zoom(1.5, Shortcut::Reload), 1.5);
    }

    #[test]
    fn test_named_keys_by_name() {
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::Enter)),
            Key::Named(NamedKey::Enter)
        );
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::ArrowDown)),
            Key::Named(NamedKey::ArrowDown)
        );
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::PageDown)),
            Key::Named(NamedKey::PageDown)
        );
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::F12)),
            Key::Named(NamedKey::F12)
        );
    }

    #[test]
    fn test_space_and_characters() {
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::Space)),
            Key::Character(" ".to_string())
        );
        assert_eq!(
            key_from_winit(&WinitKey::Character("é".into())),
            Key::Character("é".to_string())
        );
    }

    #[test]
    fn test_super_is_meta() {
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::Super)),
            Key::Named(NamedKey::Meta)
        );
        assert_eq!(
            code_from_winit(&PhysicalKey::Code(KeyCode::SuperLeft)),
            Code::MetaLeft
        );
        let mods = modifiers_from_winit(ModifiersState::SUPER | ModifiersState::SHIFT);
        assert!(mods.contains(Modifiers::META | Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::CONTROL));
    }

    #[test]
    fn test_codes_by_name() {
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::KeyA)), Code::KeyA);
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::Digit7)), Code::Digit7);
        assert_eq!(
            code_from_winit(&PhysicalKey::Code(KeyCode::NumpadEnter)),
            Code::NumpadEnter
        );
    }

    #[test]
    fn test_line_wheel_is_scaled() {
        let delta = wheel_delta_from_winit(MouseScrollDelta::LineDelta(0.0, -2.0));
        assert_eq!(delta.y, -152.0);
        assert!(matches!(delta.mode, WheelMode::DeltaLine));

        let delta =
            wheel_delta_from_winit(MouseScrollDelta::PixelDelta(PhysicalPosition::new(3.0, 9.5)));
        assert_eq!((delta.x, delta.y), (3.0, 9.5));
        assert!(matches!(delta.mode, WheelMode::DeltaPixel));
    }
}
