use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TEMP_DIR_NAME};
use clap::{Arg, ArgMatches, Command};
use intake::janitor::{DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
use intake::limits::{
    DEFAULT_DOCUMENT_MAX_BYTES, DEFAULT_IMAGE_MAX_BYTES, DEFAULT_UPLOAD_TIMEOUT, MB,
};
use intake::UploadLimits;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Scratch directory for in-flight uploads
    pub temp_dir: PathBuf,
    /// Permanent storage directory
    pub data_dir: PathBuf,
    pub sweep_interval: Duration,
    pub temp_max_age: Duration,
    pub upload_timeout: Duration,
    pub document_max_bytes: u64,
    pub image_max_bytes: u64,
    pub mode: RunMode,
}

/// Operating mode, controls how much diagnostic detail error responses carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "production" || v == "prod" => RunMode::Production,
            _ => RunMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == RunMode::Production
    }
}

fn command() -> Command {
    Command::new("server")
        .about("Upload intake server")
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Server host (default: 0.0.0.0, or SERVER_HOST env var)"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .help("Server port (default: 8080, or SERVER_PORT env var)"),
        )
        .arg(
            Arg::new("temp-dir")
                .long("temp-dir")
                .value_name("DIR")
                .help("Scratch directory for in-flight uploads (or UPLOAD_TEMP_DIR env var)"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory for stored uploads (default: uploads, or UPLOAD_DATA_DIR env var)"),
        )
        .arg(
            Arg::new("sweep-interval-secs")
                .long("sweep-interval-secs")
                .value_name("SECS")
                .help("Seconds between scratch sweeps (default: 3600, or TEMP_SWEEP_INTERVAL_SECS env var)"),
        )
        .arg(
            Arg::new("temp-max-age-secs")
                .long("temp-max-age-secs")
                .value_name("SECS")
                .help("Age after which scratch files are swept (default: 3600, or TEMP_MAX_AGE_SECS env var)"),
        )
        .arg(
            Arg::new("upload-timeout-secs")
                .long("upload-timeout-secs")
                .value_name("SECS")
                .help("Wall-clock limit for one upload (default: 300, or UPLOAD_TIMEOUT_SECS env var)"),
        )
        .arg(
            Arg::new("document-max-mb")
                .long("document-max-mb")
                .value_name("MB")
                .help("Maximum document size (default: 10, or DOCUMENT_MAX_MB env var)"),
        )
        .arg(
            Arg::new("image-max-mb")
                .long("image-max-mb")
                .value_name("MB")
                .help("Maximum registration image size (default: 5, or IMAGE_MAX_MB env var)"),
        )
}

/// Command line value, then environment variable, then default
fn lookup(matches: &ArgMatches, arg: &str, env: &str) -> Option<String> {
    matches
        .get_one::<String>(arg)
        .cloned()
        .or_else(|| std::env::var(env).ok())
}

fn parse_value<T: FromStr>(
    matches: &ArgMatches,
    arg: &str,
    env: &str,
    default: T,
) -> Result<T, std::io::Error> {
    let Some(value) = lookup(matches, arg, env) else {
        return Ok(default);
    };
    value.trim().parse().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid value for --{}: {}", arg, value),
        )
    })
}

impl ServerConfig {
    pub fn load() -> Result<Self, std::io::Error> {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, std::io::Error> {
        let host = lookup(matches, "host", "SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_value(matches, "port", "SERVER_PORT", DEFAULT_PORT)?;

        let temp_dir = lookup(matches, "temp-dir", "UPLOAD_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_TEMP_DIR_NAME));
        let data_dir = PathBuf::from(
            lookup(matches, "data-dir", "UPLOAD_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let sweep_interval: u64 = parse_value(
            matches,
            "sweep-interval-secs",
            "TEMP_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;
        if sweep_interval == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Sweep interval must be at least one second",
            ));
        }
        let temp_max_age: u64 = parse_value(
            matches,
            "temp-max-age-secs",
            "TEMP_MAX_AGE_SECS",
            DEFAULT_MAX_AGE.as_secs(),
        )?;
        let upload_timeout: u64 = parse_value(
            matches,
            "upload-timeout-secs",
            "UPLOAD_TIMEOUT_SECS",
            DEFAULT_UPLOAD_TIMEOUT.as_secs(),
        )?;
        let document_max_mb: u64 = parse_value(
            matches,
            "document-max-mb",
            "DOCUMENT_MAX_MB",
            DEFAULT_DOCUMENT_MAX_BYTES / MB,
        )?;
        let image_max_mb: u64 =
            parse_value(matches, "image-max-mb", "IMAGE_MAX_MB", DEFAULT_IMAGE_MAX_BYTES / MB)?;

        Ok(ServerConfig {
            host,
            port,
            temp_dir,
            data_dir,
            sweep_interval: Duration::from_secs(sweep_interval),
            temp_max_age: Duration::from_secs(temp_max_age),
            upload_timeout: Duration::from_secs(upload_timeout),
            document_max_bytes: document_max_mb * MB,
            image_max_bytes: image_max_mb * MB,
            mode: RunMode::from_env_value(std::env::var("APP_ENV").ok().as_deref()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn document_limits(&self) -> UploadLimits {
        UploadLimits::document()
            .with_max_file_size(self.document_max_bytes)
            .with_max_duration(self.upload_timeout)
    }

    pub fn registration_limits(&self) -> UploadLimits {
        UploadLimits::registration()
            .with_max_file_size(self.image_max_bytes)
            .with_max_duration(self.upload_timeout)
    }
}
