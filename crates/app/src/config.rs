use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use quiz_core::prompt::{PromptFeature, parse_features};
use services::app_services::ServiceSettings;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  quiz-server [--bind <addr>] [--batch-size <n>] [--max-generations <n>] [--retention-secs <n>]"
    );
    eprintln!("              [--session-ttl-secs <n>] [--features <list>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --bind {DEFAULT_BIND}");
    eprintln!("  --batch-size 5");
    eprintln!("  --max-generations 4");
    eprintln!("  --retention-secs 300");
    eprintln!("  --session-ttl-secs 3600");
    eprintln!("  --features core,references (also: summary)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GOOGLE_API_KEY (required for question generation)");
    eprintln!("  QUIZ_GEMINI_MODEL, QUIZ_GEMINI_BASE_URL");
    eprintln!("  QUIZ_BIND, QUIZ_BATCH_SIZE, QUIZ_MAX_GENERATIONS, QUIZ_TASK_RETENTION_SECS");
    eprintln!("  QUIZ_SESSION_TTL_SECS, QUIZ_PROMPT_FEATURES");
    eprintln!("  RUST_LOG (default: info)");
}

/// Server settings: environment first, flags override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub settings: ServiceSettings,
}

impl AppConfig {
    /// Parse `args` on top of values read through `env`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags, missing values or values that do
    /// not parse, whether they came from a flag or the environment.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut bind_raw = env("QUIZ_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let mut settings = ServiceSettings::default();
        if let Some(raw) = env("QUIZ_BATCH_SIZE") {
            settings.batch_size = parse_number("--batch-size", raw)?;
        }
        if let Some(raw) = env("QUIZ_MAX_GENERATIONS") {
            settings.max_generations = parse_number("--max-generations", raw)?;
        }
        if let Some(raw) = env("QUIZ_TASK_RETENTION_SECS") {
            settings.retention = Duration::from_secs(parse_number("--retention-secs", raw)?);
        }
        if let Some(raw) = env("QUIZ_SESSION_TTL_SECS") {
            settings.session_ttl = Duration::from_secs(parse_number("--session-ttl-secs", raw)?);
        }
        if let Some(raw) = env("QUIZ_PROMPT_FEATURES") {
            settings.features = parse_feature_list(raw)?;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => bind_raw = require_value(&mut args, "--bind")?,
                "--batch-size" => {
                    let raw = require_value(&mut args, "--batch-size")?;
                    settings.batch_size = parse_number("--batch-size", raw)?;
                }
                "--max-generations" => {
                    let raw = require_value(&mut args, "--max-generations")?;
                    settings.max_generations = parse_number("--max-generations", raw)?;
                }
                "--retention-secs" => {
                    let raw = require_value(&mut args, "--retention-secs")?;
                    settings.retention =
                        Duration::from_secs(parse_number("--retention-secs", raw)?);
                }
                "--session-ttl-secs" => {
                    let raw = require_value(&mut args, "--session-ttl-secs")?;
                    settings.session_ttl =
                        Duration::from_secs(parse_number("--session-ttl-secs", raw)?);
                }
                "--features" => {
                    let raw = require_value(&mut args, "--features")?;
                    settings.features = parse_feature_list(raw)?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let bind = bind_raw
            .trim()
            .parse()
            .map_err(|_| ArgsError::InvalidValue {
                flag: "--bind",
                raw: bind_raw.clone(),
            })?;
        Ok(Self { bind, settings })
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

fn parse_feature_list(raw: String) -> Result<Vec<PromptFeature>, ArgsError> {
    parse_features(&raw).map_err(|_| ArgsError::InvalidValue {
        flag: "--features",
        raw,
    })
}
