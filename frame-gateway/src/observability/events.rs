//! Canonical structured event names used across `frame-gateway`.

// Interceptor chain.
pub const DISPATCH_DROPPED: &str = "dispatch_dropped";
pub const DISPATCH_FAILED: &str = "dispatch_failed";

// Dispatch core.
pub const PUBLISH_ACCEPTED: &str = "publish_accepted";
pub const PUBLISH_REJECTED: &str = "publish_rejected";
pub const DRIVER_HANDLE_OK: &str = "driver_handle_ok";
pub const DRIVER_HANDLE_FAILED: &str = "driver_handle_failed";

// Input devices.
pub const DEVICE_LISTEN: &str = "device_listen";
pub const DEVICE_DEFAULT_HANDLER: &str = "device_default_handler";
pub const DEVICE_READ_TEMPORARY: &str = "device_read_temporary";
pub const DEVICE_FRAME_RECEIVED: &str = "device_frame_received";
pub const DEVICE_SERVE_STOPPED: &str = "device_serve_stopped";
pub const DEVICE_SERVE_FAILED: &str = "device_serve_failed";

// Gateway lifecycle.
pub const GATEWAY_START: &str = "gateway_start";
pub const GATEWAY_STOP: &str = "gateway_stop";
pub const BUNDLE_INIT_FAILED: &str = "bundle_init_failed";
pub const BUNDLE_START_FAILED: &str = "bundle_start_failed";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
