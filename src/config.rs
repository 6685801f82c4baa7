//! Runtime configuration
//!
//! Everything is read from environment variables. Only the four streaming API
//! credentials are mandatory; every other setting falls back to a default.

use crate::display::Rotation;
use crate::{Result, WedpiError};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const ENV_CONSUMER_KEY: &str = "TWITTER_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "TWITTER_CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
pub const ENV_ACCESS_SECRET: &str = "TWITTER_ACCESS_SECRET";

pub const ENV_HASHTAG: &str = "WEDPI_HASHTAG_TO_TRACK";
pub const ENV_FOLLOW: &str = "WEDPI_USER_TO_TRACK";
pub const ENV_BRIGHTNESS: &str = "WEDPI_DISPLAY_BRIGHTNESS";
pub const ENV_ROTATION: &str = "WEDPI_DISPLAY_ROTATION";
pub const ENV_BACKEND: &str = "WEDPI_DISPLAY_BACKEND";
pub const ENV_I2C_BUS: &str = "WEDPI_I2C_BUS";
pub const ENV_BOOT_SCROLL_DELAY: &str = "WEDPI_BOOT_SCROLL_DELAY_IN_SECS";
pub const ENV_MESSAGE_SCROLL_DELAY: &str = "WEDPI_TWEET_SCROLL_DELAY_IN_SECS";
pub const ENV_CLEAR_COMMAND: &str = "WEDPI_CLEAR_COMMAND";
pub const ENV_DEFAULT_MESSAGES: &str = "WEDPI_DEFAULT_MESSAGES";
pub const ENV_LOG_FILE: &str = "WEDPI_LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "WEDPI_LOG_LEVEL";

/// Statuses filter endpoint of the streaming API
pub const DEFAULT_STREAM_ENDPOINT: &str = "https://stream.twitter.com/1.1/statuses/filter.json";

const DEFAULT_HASHTAG: &str = "#tuffwed";
const DEFAULT_LOG_FILE: &str = "/tmp/wedpi-app.log";

/// OAuth 1.0a credentials for the streaming API
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_secret: access_secret.into(),
        }
    }

    /// Names of the credential variables that are unset or empty
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ENV_CONSUMER_KEY, &self.consumer_key),
            (ENV_CONSUMER_SECRET, &self.consumer_secret),
            (ENV_ACCESS_TOKEN, &self.access_token),
            (ENV_ACCESS_SECRET, &self.access_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// Secrets never reach the log file.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// Which frame sink drives the display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayBackend {
    /// IS31FL3731-based Scroll pHAT HD on the I2C bus
    #[default]
    ScrollPhatHd,
    /// Render frames into the log instead of hardware
    Console,
}

impl FromStr for DisplayBackend {
    type Err = WedpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scrollphathd" | "hardware" | "i2c" => Ok(DisplayBackend::ScrollPhatHd),
            "console" | "headless" => Ok(DisplayBackend::Console),
            other => Err(WedpiError::ConfigError(format!(
                "unknown display backend: {}",
                other
            ))),
        }
    }
}

/// LED matrix settings
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    /// Pixel brightness (0.0 - 1.0)
    pub brightness: f32,

    /// Panel orientation
    pub rotation: Rotation,

    /// Frame sink to use
    pub backend: DisplayBackend,

    /// I2C device node the matrix is attached to
    pub i2c_bus: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            brightness: 0.2,
            rotation: Rotation::UpsideDown,
            backend: DisplayBackend::ScrollPhatHd,
            i2c_bus: PathBuf::from("/dev/i2c-1"),
        }
    }
}

/// Pacing of the display loop
#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// Delay per scroll step of the boot announcement
    pub boot_scroll_delay: Duration,

    /// Delay per scroll step of a message
    pub message_scroll_delay: Duration,

    /// Pause between writing a message and scrolling it
    pub pre_scroll_pause: Duration,

    /// Pause after a message has scrolled off
    pub post_scroll_pause: Duration,

    /// Sleep when the queue is empty
    pub empty_wait: Duration,

    /// Pause after the boot announcement
    pub boot_pause: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            boot_scroll_delay: Duration::from_millis(60),
            message_scroll_delay: Duration::from_millis(20),
            pre_scroll_pause: Duration::from_millis(250),
            post_scroll_pause: Duration::from_millis(250),
            empty_wait: Duration::from_secs(1),
            boot_pause: Duration::from_secs(5),
        }
    }
}

impl TimingConfig {
    /// Timing with every delay set to zero
    pub fn immediate() -> Self {
        Self {
            boot_scroll_delay: Duration::ZERO,
            message_scroll_delay: Duration::ZERO,
            pre_scroll_pause: Duration::ZERO,
            post_scroll_pause: Duration::ZERO,
            empty_wait: Duration::ZERO,
            boot_pause: Duration::ZERO,
        }
    }
}

/// Streaming API settings
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Filter endpoint URL
    pub endpoint: String,

    /// Tag to track
    pub hashtag: String,

    /// User ids to follow
    pub follow: Vec<String>,

    /// Fixed wait before reconnecting after a recoverable failure
    pub reconnect_delay: Duration,

    /// Give up on a connection that sends nothing for this long
    pub stall_timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_STREAM_ENDPOINT.to_string(),
            hashtag: DEFAULT_HASHTAG.to_string(),
            follow: Vec::new(),
            reconnect_delay: Duration::from_secs(5),
            // Keep-alives arrive every 30 seconds
            stall_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Log output settings
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log file; `None` logs to stdout
    pub file: Option<PathBuf>,

    /// Level for this crate's targets
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            level: "debug".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Clone, Debug)]
pub struct WedpiConfig {
    /// Streaming API credentials
    pub credentials: Credentials,

    /// Streaming API settings
    pub stream: StreamConfig,

    /// LED matrix settings
    pub display: DisplayConfig,

    /// Display loop pacing
    pub timing: TimingConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// Whether a `:CLEAR` message resets the queue
    pub clear_command: bool,

    /// Messages the queue is seeded with at boot and on `:CLEAR`
    pub default_messages: Vec<String>,
}

impl Default for WedpiConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            stream: StreamConfig::default(),
            display: DisplayConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
            clear_command: true,
            default_messages: default_messages_for(DEFAULT_HASHTAG),
        }
    }
}

fn default_messages_for(hashtag: &str) -> Vec<String> {
    vec![
        "Welcome to Chemayne & Lewis's wedding".to_string(),
        "Saturday 8th June 2019".to_string(),
        format!("Tweet us using hashtag {}", hashtag),
    ]
}

impl WedpiConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    ///
    /// Unset or empty credentials produce [`WedpiError::MissingCredentials`].
    /// Optional values that fail to parse keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        let credentials = Credentials::new(
            get(ENV_CONSUMER_KEY),
            get(ENV_CONSUMER_SECRET),
            get(ENV_ACCESS_TOKEN),
            get(ENV_ACCESS_SECRET),
        );

        let missing = credentials.missing();
        if !missing.is_empty() {
            return Err(WedpiError::MissingCredentials(missing.join(", ")));
        }

        let mut config = Self {
            credentials,
            ..Self::default()
        };

        if let Some(hashtag) = lookup(ENV_HASHTAG).filter(|h| !h.trim().is_empty()) {
            config.stream.hashtag = hashtag.trim().to_string();
            config.default_messages = default_messages_for(&config.stream.hashtag);
        }

        if let Some(follow) = lookup(ENV_FOLLOW) {
            config.stream.follow = follow
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        let brightness: f32 = parse_or(&lookup, ENV_BRIGHTNESS, config.display.brightness);
        config.display.brightness = clamp_brightness(brightness);

        let degrees: u16 = parse_or(&lookup, ENV_ROTATION, 180);
        match Rotation::from_degrees(degrees) {
            Ok(rotation) => config.display.rotation = rotation,
            Err(e) => warn!("{}, keeping {:?}", e, config.display.rotation),
        }

        config.display.backend = parse_or(&lookup, ENV_BACKEND, config.display.backend);

        if let Some(bus) = lookup(ENV_I2C_BUS).filter(|b| !b.is_empty()) {
            config.display.i2c_bus = PathBuf::from(bus);
        }

        config.timing.boot_scroll_delay =
            parse_secs_or(&lookup, ENV_BOOT_SCROLL_DELAY, config.timing.boot_scroll_delay);
        config.timing.message_scroll_delay = parse_secs_or(
            &lookup,
            ENV_MESSAGE_SCROLL_DELAY,
            config.timing.message_scroll_delay,
        );

        config.clear_command = parse_or(&lookup, ENV_CLEAR_COMMAND, config.clear_command);

        if let Some(messages) = lookup(ENV_DEFAULT_MESSAGES) {
            config.default_messages = messages
                .split('|')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }

        match lookup(ENV_LOG_FILE) {
            Some(path) if path.trim().is_empty() => config.logging.file = None,
            Some(path) => config.logging.file = Some(PathBuf::from(path)),
            None => {}
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.trim().is_empty()) {
            config.logging.level = level.trim().to_ascii_lowercase();
        }

        Ok(config)
    }

    /// Set the credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the tag to track
    pub fn with_hashtag(mut self, hashtag: impl Into<String>) -> Self {
        self.stream.hashtag = hashtag.into();
        self
    }

    /// Set the display loop pacing
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set the messages used to seed and reset the queue
    pub fn with_default_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_messages = messages.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the `:CLEAR` command
    pub fn with_clear_command(mut self, enabled: bool) -> Self {
        self.clear_command = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let missing = self.credentials.missing();
        if !missing.is_empty() {
            return Err(WedpiError::MissingCredentials(missing.join(", ")));
        }

        if self.stream.hashtag.trim().is_empty() && self.stream.follow.is_empty() {
            return Err(WedpiError::ConfigError(
                "nothing to track: set a hashtag or a user id".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.display.brightness) {
            return Err(WedpiError::ConfigError(format!(
                "brightness {} is outside 0.0 - 1.0",
                self.display.brightness
            )));
        }

        Ok(())
    }
}

fn clamp_brightness(brightness: f32) -> f32 {
    if brightness.is_nan() {
        warn!("Brightness is not a number, using 0.2");
        return 0.2;
    }
    if !(0.0..=1.0).contains(&brightness) {
        warn!("Brightness {} clamped to 0.0 - 1.0", brightness);
    }
    brightness.clamp(0.0, 1.0)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Debug,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using {:?}", key, raw, default);
                default
            }
        },
        _ => default,
    }
}

fn parse_secs_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(lookup, key, default.as_secs_f64());
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        warn!("Ignoring invalid {}={}, using {:?}", key, secs, default);
        default
    })
}
