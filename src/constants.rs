//! Default values shared by configuration and the entry points.

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Default config file, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pixgate.toml";

/// Assets older than this many days are removed by the sweeper.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Daily at midnight UTC (seconds field first).
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 0 0 * * *";

/// Objects returned per list call by the local backends.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Cloudflare Workers AI REST base.
pub const DEFAULT_INFERENCE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Text-to-image model invoked for every prompt.
pub const DEFAULT_INFERENCE_MODEL: &str = "@cf/stabilityai/stable-diffusion-xl-base-1.0";

/// Environment variable consulted when `inference.api_token` is unset.
pub const API_TOKEN_ENV: &str = "PIXGATE_API_TOKEN";

/// Content type recorded for every stored asset.
pub const ASSET_CONTENT_TYPE: &str = "image/png";

/// Metadata field holding the creation time in epoch milliseconds.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Prefix under which generated assets are stored.
pub const ASSET_PREFIX: &str = "images/";

/// Length of the random suffix in asset keys.
pub const ASSET_TOKEN_LEN: usize = 6;

pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;
