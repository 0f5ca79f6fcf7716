use std::env;
use std::path::PathBuf;

/// Runtime configuration for the cipher exchange
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory for encrypted blobs awaiting download
    pub storage_root: PathBuf,

    /// Scratch root under which per-request staging workspaces are created
    pub staging_root: PathBuf,

    /// Directory holding the external tool's key material
    pub key_dir: PathBuf,

    /// Optional packaged key bundle, materialized into `key_dir` on demand
    pub key_bundle_dir: Option<PathBuf>,

    /// External transformer command; unset means the passthrough stand-in
    pub transformer_command: Option<String>,

    /// Optional fixed working directory some tool builds require the input
    /// to also be present in
    pub tool_work_dir: Option<PathBuf>,

    /// The single accepted input extension
    pub accepted_extension: String,

    /// Extension presented for encrypted results
    pub output_extension: String,

    /// Token lifetime in hours (default: 24)
    pub token_ttl_hours: i64,

    /// Reaper sweep interval in seconds (default: 3600)
    pub reaper_interval_secs: u64,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// Allowed CORS origins ("*" for any)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: env::temp_dir().join("cipher_uploads"),
            staging_root: env::temp_dir(),
            key_dir: env::temp_dir().join("cipher_keys"),
            key_bundle_dir: None,
            transformer_command: None,
            tool_work_dir: None,
            accepted_extension: ".txt".to_string(),
            output_extension: ".cif".to_string(),
            token_ttl_hours: 24,
            reaper_interval_secs: 3600,
            max_file_size: 256 * 1024 * 1024, // 256 MB
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.storage_root),

            staging_root: env::var("STAGING_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.staging_root),

            key_dir: env::var("KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.key_dir),

            key_bundle_dir: env::var("KEY_BUNDLE_DIR").ok().map(PathBuf::from),

            transformer_command: env::var("TRANSFORMER_COMMAND")
                .ok()
                .filter(|v| !v.is_empty()),

            tool_work_dir: env::var("TOOL_WORK_DIR").ok().map(PathBuf::from),

            accepted_extension: env::var("ACCEPTED_EXTENSION")
                .unwrap_or(default.accepted_extension),

            output_extension: env::var("OUTPUT_EXTENSION").unwrap_or(default.output_extension),

            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.token_ttl_hours),

            reaper_interval_secs: env::var("REAPER_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.reaper_interval_secs),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (passthrough transformer, small limits)
    pub fn development() -> Self {
        Self {
            transformer_command: None,
            max_file_size: 16 * 1024 * 1024, // 16 MB
            ..Self::default()
        }
    }
}
