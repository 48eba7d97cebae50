//! Well-known settings keys.

/// Whether the daemon is enabled at all.
pub const ENABLED: &str = "enabled";

/// Whether matched messages are re-emitted as a local bus signal.
pub const EMIT_SIGNALS: &str = "emit-signals";

/// JSON list of enabled advanced-filter names, in user order.
pub const ENABLED_FILTERS: &str = "enabled-filters";

/// JSON list of enabled processor names for the topic tier.
pub const ENABLED_SERVICES: &str = "enabled-services";

/// JSON object mapping filter name to its free-text setting.
pub const FILTER_SETTINGS: &str = "filter-settings";
