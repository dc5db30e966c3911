//! Servo engine preferences for the reader surface.
//!
//! Builds a [`servo::Preferences`] struct from the [`Config`] and the
//! [`SurfaceSettings`] chosen at startup:
//! - Thread pools sized to available CPU cores (clamped)
//! - HTTP cache sized from the cache policy (0 = always fetch)
//! - Tracking APIs disabled (geolocation, Bluetooth, WebRTC, notifications)
//! - Generic Chrome user-agent, also forwarded on queued downloads

use tracing::info;

use crate::config::Config;
use crate::surface::{CachePolicy, SurfaceSettings};

/// User agent used when the config leaves it empty.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The user agent the surface sends, and that downloads forward.
pub fn effective_user_agent(config: &Config) -> String {
    let configured = config.servo.user_agent.trim();
    if configured.is_empty() {
        DEFAULT_USER_AGENT.to_string()
    } else {
        configured.to_string()
    }
}

/// HTTP cache size implementing a cache policy.
pub fn cache_size_for(policy: CachePolicy, configured: i64) -> i64 {
    match policy {
        CachePolicy::NoCache => 0,
        CachePolicy::CacheElseNetwork => configured.max(0),
    }
}

/// Builds Servo `Preferences` for the current machine and surface settings.
#[allow(clippy::field_reassign_with_default)]
pub fn build_servo_preferences(config: &Config, settings: &SurfaceSettings) -> servo::Preferences {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(4);

    let mut prefs = servo::Preferences::default();

    // ── Performance Tuning ────────────────────────────────────────────────
    prefs.layout_threads = if config.servo.layout_threads > 0 {
        config.servo.layout_threads.min(16)
    } else {
        cpus.min(8)
    };
    prefs.threadpools_async_runtime_workers_max = (cpus * 2).min(16);
    prefs.threadpools_image_cache_workers_max = cpus.min(8);
    prefs.threadpools_webrender_workers_max = (cpus / 2).clamp(2, 8);
    prefs.threadpools_resource_workers_max = cpus.min(8);
    prefs.gfx_precache_shaders = config.servo.precache_shaders;

    // ── Cache policy ──────────────────────────────────────────────────────
    prefs.network_http_cache_size = cache_size_for(settings.cache_policy, config.servo.cache_size);

    // ── Identity ──────────────────────────────────────────────────────────
    prefs.user_agent = effective_user_agent(config);

    // ── Privacy toggles ───────────────────────────────────────────────────
    prefs.dom_geolocation_enabled = !config.privacy.disable_geolocation;
    prefs.dom_bluetooth_enabled = !config.privacy.disable_bluetooth;
    prefs.dom_notification_enabled = !config.privacy.disable_notifications;
    prefs.dom_webrtc_enabled = !config.privacy.disable_webrtc;

    info!(
        cpus,
        layout_threads = prefs.layout_threads,
        cache_size = prefs.network_http_cache_size,
        cache_policy = ?settings.cache_policy,
        "Servo preferences configured"
    );

    prefs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::FixedConnectivity;

    fn prefs(connected: bool) -> servo::Preferences {
        let settings = SurfaceSettings::configure(&FixedConnectivity(connected));
        build_servo_preferences(&Config::default(), &settings)
    }

    #[test]
    fn test_online_disables_http_cache() {
        assert_eq!(prefs(true).network_http_cache_size, 0);
    }

    #[test]
    fn test_offline_keeps_configured_cache() {
        assert_eq!(prefs(false).network_http_cache_size, 50_000);
    }

    #[test]
    fn test_negative_cache_size_clamped() {
        assert_eq!(cache_size_for(CachePolicy::CacheElseNetwork, -5), 0);
    }

    #[test]
    fn test_layout_threads_bounded() {
        let prefs = prefs(true);
        assert!(prefs.layout_threads >= 1);
        assert!(prefs.layout_threads <= 8);
    }

    #[test]
    fn test_layout_threads_override() {
        let mut config = Config::default();
        config.servo.layout_threads = 3;
        let settings = SurfaceSettings::configure(&FixedConnectivity(true));
        assert_eq!(build_servo_preferences(&config, &settings).layout_threads, 3);
    }

    #[test]
    fn test_tracking_apis_disabled() {
        let prefs = prefs(true);
        assert!(!prefs.dom_geolocation_enabled);
        assert!(!prefs.dom_bluetooth_enabled);
        assert!(!prefs.dom_notification_enabled);
        assert!(!prefs.dom_webrtc_enabled);
    }

    #[test]
    fn test_user_agent_default_and_override() {
        let mut config = Config::default();
        assert_eq!(effective_user_agent(&config), DEFAULT_USER_AGENT);
        config.servo.user_agent = "ReaderBot/1.0".to_string();
        assert_eq!(effective_user_agent(&config), "ReaderBot/1.0");
        let settings = SurfaceSettings::configure(&FixedConnectivity(true));
        assert_eq!(build_servo_preferences(&config, &settings).user_agent, "ReaderBot/1.0");
    }
}
