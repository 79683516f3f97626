/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Storage key holding the current image as JSON `{dataUrl, mimeType}`.
pub const SESSION_IMAGE_KEY: &str = "retouch.session.image";

/// Storage key holding the pending prompt text.
pub const SESSION_PROMPT_KEY: &str = "retouch.session.prompt";

/// Storage key for the persisted colour theme.
pub const PREFS_THEME_KEY: &str = "retouch.prefs.theme";

/// Storage key for the one-time tutorial flag.
pub const PREFS_TUTORIAL_KEY: &str = "retouch.prefs.tutorial_seen";

/// Neutral brightness/contrast value (percent). 100 means "no change".
pub const NEUTRAL_ADJUSTMENT: u32 = 100;

/// Upper bound of the brightness/contrast sliders (percent).
pub const MAX_ADJUSTMENT: u32 = 200;

/// Zoom bounds for the inspection viewport.
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 10.0;

/// Default long-edge limit applied to uploads before they reach the model.
pub const DEFAULT_UPLOAD_MAX_DIMENSION: u32 = 2048;

/// Default JPEG quality for re-encoded uploads.
pub const DEFAULT_UPLOAD_JPEG_QUALITY: u8 = 90;

/// Shown in the suggestion slot whenever a suggestion request fails.
pub const SUGGESTION_FAILURE_MESSAGE: &str = "Couldn't get suggestions right now. Please try again.";

/// Shown in the voice slot when no speech capability is available.
pub const VOICE_UNSUPPORTED_MESSAGE: &str = "Voice input is not supported on this device.";

/// Shown in the main slot when no share target is available.
pub const SHARE_UNSUPPORTED_MESSAGE: &str = "Sharing is not supported on this device.";

/// Default request timeout for the hosted model.
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Default retry count for transient model failures.
pub const DEFAULT_MODEL_MAX_RETRIES: u32 = 2;

/// Base delay for exponential retry backoff.
pub const RETRY_BASE_DELAY_MS: u64 = 500;
