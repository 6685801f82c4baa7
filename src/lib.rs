pub mod config;
pub mod display;
pub mod messages;
pub mod network;
pub mod stream;
pub mod ticker;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum WedpiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Display error: {0}")]
    DisplayError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Network lookup error: {0}")]
    NetworkError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for WedpiError {
    fn from(e: std::io::Error) -> Self {
        WedpiError::IOError(e.to_string())
    }
}

impl WedpiError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Nothing can run without a valid setup
            WedpiError::ConfigError(_) => false,
            WedpiError::MissingCredentials(_) => false,
            // A failed I2C transfer usually clears on the next frame
            WedpiError::DisplayError(_) => true,
            WedpiError::StreamError(_) => true,
            WedpiError::NetworkError(_) => true,
            WedpiError::QueueError(_) => false,
            WedpiError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            WedpiError::ConfigError(_) => {
                "Configuration error. Please check the WEDPI_* environment variables.".to_string()
            }
            WedpiError::MissingCredentials(_) => {
                "You need to configure your Twitter API keys! Set TWITTER_CONSUMER_KEY, \
                 TWITTER_CONSUMER_SECRET, TWITTER_ACCESS_TOKEN and TWITTER_ACCESS_SECRET."
                    .to_string()
            }
            WedpiError::DisplayError(_) => {
                "LED matrix error. Please check the display is attached.".to_string()
            }
            WedpiError::StreamError(_) => {
                "Lost the connection to the streaming API.".to_string()
            }
            WedpiError::NetworkError(_) => {
                "Could not determine the host or wireless network.".to_string()
            }
            WedpiError::QueueError(_) => {
                "Internal message queue error. Please restart the application.".to_string()
            }
            WedpiError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WedpiError>;
