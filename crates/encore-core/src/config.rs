//! Configuration module
//!
//! Environment-driven configuration with defaults suitable for local
//! development. `main` calls `dotenvy::dotenv()` before `Config::from_env()`.

use std::env;

use crate::constants;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JOB_RETENTION_SECS: u64 = 900;
const DEFAULT_JOB_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Root directory for stored media files.
    pub media_root: String,
    /// Base URL under which `media_root` is served (e.g. "http://localhost:3000/media").
    pub public_base_url: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Ceiling for a single video upload in bytes.
    pub video_max_file_size: usize,
    /// How long terminal compression jobs stay visible to pollers.
    pub job_retention_secs: u64,
    /// Interval between eviction sweeps of the job registry.
    pub job_sweep_interval_secs: u64,
    pub environment: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = Config {
            server_host: env_or("SERVER_HOST", "0.0.0.0"),
            server_port: env_parse("SERVER_PORT", DEFAULT_PORT),
            media_root: env_or("MEDIA_ROOT", "./public/media"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000/media"),
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            ffprobe_path: env_or("FFPROBE_PATH", "ffprobe"),
            video_max_file_size: env_parse("VIDEO_MAX_FILE_SIZE", constants::VIDEO_MAX_FILE_SIZE),
            job_retention_secs: env_parse("JOB_RETENTION_SECS", DEFAULT_JOB_RETENTION_SECS),
            job_sweep_interval_secs: env_parse(
                "JOB_SWEEP_INTERVAL_SECS",
                DEFAULT_JOB_SWEEP_INTERVAL_SECS,
            ),
            environment: env_or("ENVIRONMENT", "development"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.media_root.is_empty() {
            anyhow::bail!("MEDIA_ROOT must not be empty");
        }
        if self.public_base_url.is_empty() {
            anyhow::bail!("PUBLIC_BASE_URL must not be empty");
        }
        if self.video_max_file_size == 0 {
            anyhow::bail!("VIDEO_MAX_FILE_SIZE must be positive");
        }
        if self.job_retention_secs == 0 {
            anyhow::bail!("JOB_RETENTION_SECS must be positive");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
