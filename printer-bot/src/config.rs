use std::str::FromStr;
use std::time::Duration;

use thermal_printer::{CharacterProfile, CutMode, PrintSettings, UsbConfig};

use crate::error::{AppError, AppResult};

/// Default guild the `/print` command is registered in
pub const DEFAULT_GUILD_ID: u64 = 1404898665302331513;

/// Bot configuration
///
/// # Environment variables
///
/// `.env` in the working directory is loaded first (see [`crate::setup_environment`]).
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | TOKEN | - | Discord bot token (required to run the bot) |
/// | GUILD_IDS | 1404898665302331513 | Comma-separated guild ids |
/// | HTTP_ENABLED | true | Serve the HTTP API |
/// | HTTP_PORT | 8000 | HTTP API port |
/// | PRINTER_VENDOR_ID | 0x1504 | USB vendor id |
/// | PRINTER_PRODUCT_ID | 0x0101 | USB product id |
/// | PRINTER_OUT_EP | 0x02 | Bulk OUT endpoint |
/// | PRINTER_IN_EP | 0x81 | Bulk IN endpoint |
/// | PRINTER_TIMEOUT_MS | 5000 | USB transfer timeout |
/// | PRINTER_CHARSET | CP1252 | Code page |
/// | PRINTER_CUT | full | full / partial / none |
/// | PRINTER_FEED_LINES | 3 | Lines fed before cutting |
/// | PAPER_WIDTH | 48 | Characters per line |
/// | PRINTER_DRY_RUN | false | Print into memory instead of USB |
/// | LOG_LEVEL | info | Log filter |
/// | LOG_JSON | false | JSON log lines |
/// | LOG_DIR | - | Directory for daily rolling log files |
///
/// Switches accept `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: Option<String>,
    pub guild_ids: Vec<u64>,
    pub http_enabled: bool,
    pub http_port: u16,
    pub usb: UsbConfig,
    pub print: PrintSettings,
    pub dry_run: bool,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values count as unset. Any other value that does not parse is a
    /// `Config` error naming the variable.
    pub fn from_lookup<F>(get: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let guild_ids = match get("GUILD_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>()
                        .map_err(|_| AppError::Config(format!("GUILD_IDS: invalid id {:?}", s)))
                })
                .collect::<AppResult<Vec<_>>>()?,
            None => vec![DEFAULT_GUILD_ID],
        };

        let mut usb = UsbConfig::new(
            parse_id(get("PRINTER_VENDOR_ID"), "PRINTER_VENDOR_ID", UsbConfig::DEFAULT_VENDOR_ID)?,
            parse_id(get("PRINTER_PRODUCT_ID"), "PRINTER_PRODUCT_ID", UsbConfig::DEFAULT_PRODUCT_ID)?,
        )
        .with_endpoints(
            parse_id(get("PRINTER_OUT_EP"), "PRINTER_OUT_EP", UsbConfig::DEFAULT_OUT_EP)?,
            parse_id(get("PRINTER_IN_EP"), "PRINTER_IN_EP", UsbConfig::DEFAULT_IN_EP)?,
        );
        if let Some(ms) = parse_value::<u64>(get("PRINTER_TIMEOUT_MS"), "PRINTER_TIMEOUT_MS")? {
            usb = usb.with_timeout(Duration::from_millis(ms));
        }
        usb.validate()?;

        let profile = match get("PRINTER_CHARSET") {
            Some(v) => v.parse::<CharacterProfile>()?,
            None => CharacterProfile::Cp1252,
        };
        let cut = match get("PRINTER_CUT") {
            Some(v) => v.parse::<CutMode>()?,
            None => CutMode::Full,
        };

        let defaults = PrintSettings::default();
        let paper_width = parse_value::<usize>(get("PAPER_WIDTH"), "PAPER_WIDTH")?
            .unwrap_or(defaults.paper_width);
        if paper_width == 0 {
            return Err(AppError::Config("PAPER_WIDTH: must be at least 1".into()));
        }
        let print = PrintSettings {
            profile,
            cut,
            feed_lines: parse_value(get("PRINTER_FEED_LINES"), "PRINTER_FEED_LINES")?
                .unwrap_or(defaults.feed_lines),
            paper_width,
        };

        Ok(Self {
            discord_token: get("TOKEN"),
            guild_ids,
            http_enabled: parse_flag(get("HTTP_ENABLED"), "HTTP_ENABLED")?.unwrap_or(true),
            http_port: parse_value(get("HTTP_PORT"), "HTTP_PORT")?.unwrap_or(8000),
            usb,
            print,
            dry_run: parse_flag(get("PRINTER_DRY_RUN"), "PRINTER_DRY_RUN")?.unwrap_or(false),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_flag(get("LOG_JSON"), "LOG_JSON")?.unwrap_or(false),
            log_dir: get("LOG_DIR"),
        })
    }

    /// Discord token, or a `Config` error when the bot cannot start
    pub fn require_token(&self) -> AppResult<&str> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| AppError::Config("TOKEN is not set".into()))
    }
}

/// Parse a plain value such as a port, width or timeout
fn parse_value<T: FromStr>(raw: Option<String>, key: &str) -> AppResult<Option<T>> {
    raw.map(|raw| {
        let s = raw.trim();
        s.parse::<T>()
            .map_err(|_| AppError::Config(format!("{}: invalid value {:?}", key, s)))
    })
    .transpose()
}

/// Parse a boolean switch: true/false, 1/0, yes/no, on/off
fn parse_flag(raw: Option<String>, key: &str) -> AppResult<Option<bool>> {
    raw.map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!(
            "{}: expected true or false, got {:?}",
            key, other
        ))),
    })
    .transpose()
}

/// Parse a USB id or endpoint written as hex (`0x1504`) or decimal
fn parse_id<T>(raw: Option<String>, key: &str, default: T) -> AppResult<T>
where
    T: TryFrom<u32>,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let s = raw.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| AppError::Config(format!("{}: invalid value {:?}", key, s)))
}
