//! Browser surface configuration.
//!
//! The reader shell configures its surface once, at creation. The only
//! input is the connectivity probe, which picks the cache policy: a fresh
//! network fetch when online, the cached copy first when offline.
//!
//! Script execution, DOM storage, wide-viewport fitting, UTF-8 decoding and
//! unblocked network loads are Servo defaults and need no switch. Platform
//! zoom controls do not exist in a chrome-less window; zoom is driven by
//! the reader's own shortcuts.

use tracing::info;

use crate::connectivity::Connectivity;

/// HTTP cache behavior for page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always go to the network.
    NoCache,
    /// Serve from cache when possible, fall back to the network.
    CacheElseNetwork,
}

impl CachePolicy {
    pub fn for_connectivity(connected: bool) -> Self {
        if connected {
            Self::NoCache
        } else {
            Self::CacheElseNetwork
        }
    }
}

/// Capabilities the host switches on the browser surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSettings {
    /// The page may be zoomed at all.
    pub support_zoom: bool,
    /// Zoom gestures and keys act on the surface itself.
    pub builtin_zoom_controls: bool,
    pub cache_policy: CachePolicy,
}

impl SurfaceSettings {
    /// Settings for the reader page, with the cache policy chosen from the
    /// current network state.
    pub fn configure(connectivity: &dyn Connectivity) -> Self {
        let connected = connectivity.is_connected();
        let settings = Self {
            support_zoom: true,
            builtin_zoom_controls: true,
            cache_policy: CachePolicy::for_connectivity(connected),
        };
        info!(
            connected,
            cache_policy = ?settings.cache_policy,
            "Surface configured"
        );
        settings
    }

    /// Whether Ctrl+wheel and the Ctrl+= / - / 0 keys zoom the page.
    pub fn zoom_shortcuts_enabled(&self) -> bool {
        self.support_zoom && self.builtin_zoom_controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::FixedConnectivity;

    #[test]
    fn test_online_bypasses_cache() {
        let settings = SurfaceSettings::configure(&FixedConnectivity(true));
        assert_eq!(settings.cache_policy, CachePolicy::NoCache);
    }

    #[test]
    fn test_offline_prefers_cache() {
        let settings = SurfaceSettings::configure(&FixedConnectivity(false));
        assert_eq!(settings.cache_policy, CachePolicy::CacheElseNetwork);
    }

    #[test]
    fn test_cache_policy_depends_only_on_connectivity() {
        for connected in [true, false] {
            let expected = if connected {
                CachePolicy::NoCache
            } else {
                CachePolicy::CacheElseNetwork
            };
            assert_eq!(CachePolicy::for_connectivity(connected), expected);
        }
    }

    #[test]
    fn test_zoom_enabled_on_surface() {
        let s = SurfaceSettings::configure(&FixedConnectivity(true));
        assert!(s.support_zoom && s.builtin_zoom_controls);
        assert!(s.zoom_shortcuts_enabled());
    }

    #[test]
    fn test_zoom_shortcuts_need_both_switches() {
        let mut s = SurfaceSettings::configure(&FixedConnectivity(false));
        s.builtin_zoom_controls = false;
        assert!(!s.zoom_shortcuts_enabled());
        s.builtin_zoom_controls = true;
        s.support_zoom = false;
        assert!(!s.zoom_shortcuts_enabled());
    }
}
