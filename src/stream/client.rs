//! Filter stream client
//!
//! Holds one long-lived POST to the filter endpoint on a dedicated thread
//! with its own tokio runtime. Recoverable failures (transport errors,
//! stalls, server disconnects, non rate-limit HTTP errors) reconnect after
//! a fixed delay; a handler refusing an error code stops the client.

use super::decode::{LineDecoder, StreamMessage, MAX_LINE_BYTES};
use super::oauth::{percent_encode, OAuthSigner};
use super::StreamHandler;
use crate::config::{Credentials, StreamConfig};
use crate::{Result, WedpiError};
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Reconnect,
    Stop,
}

pub struct StreamClient {
    config: StreamConfig,
    signer: OAuthSigner,
}

impl StreamClient {
    pub fn new(config: StreamConfig, credentials: Credentials) -> Self {
        Self {
            config,
            signer: OAuthSigner::new(credentials),
        }
    }

    /// Form parameters of the filter request (unencoded)
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let tag = self.config.hashtag.trim();
        if !tag.is_empty() {
            params.push(("track", tag.to_string()));
        }
        if !self.config.follow.is_empty() {
            params.push(("follow", self.config.follow.join(",")));
        }
        params.push(("stall_warnings", "true".to_string()));
        params
    }

    /// Spawn the stream thread
    pub fn start(self, handler: Arc<dyn StreamHandler>) -> Result<StreamHandle> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .user_agent(concat!("wedpi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WedpiError::StreamError(format!("Failed to create HTTP client: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let thread = std::thread::Builder::new()
            .name("stream".to_string())
            .spawn(move || {
                info!("Stream client starting");

                let runtime = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(self.run(http, handler, shutdown_rx));
                info!("Stream client stopped");
            })?;

        Ok(StreamHandle {
            shutdown_tx,
            thread: Some(thread),
        })
    }

    async fn run(
        &self,
        http: reqwest::Client,
        handler: Arc<dyn StreamHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let session = tokio::select! {
                session = self.connect_once(&http, handler.as_ref()) => session,
                _ = shutdown.changed() => return,
            };

            if session == Session::Stop {
                return;
            }

            info!("Reconnecting in {:?}", self.config.reconnect_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    async fn connect_once(&self, http: &reqwest::Client, handler: &dyn StreamHandler) -> Session {
        let params = self.form_params();
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let authorization = self
            .signer
            .authorization_header("POST", &self.config.endpoint, &params);
        let body = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        debug!("POST {} {}", self.config.endpoint, body);

        let response = match http
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Stream connection failed: {}", e);
                return Session::Reconnect;
            }
        };

        let status = response.status();
        if !status.is_success() {
            return if handler.on_error(status.as_u16()) {
                Session::Reconnect
            } else {
                warn!("Stream handler refused HTTP {}, stopping", status.as_u16());
                Session::Stop
            };
        }

        info!("Connected to stream, tracking {:?}", self.config.hashtag);

        let mut stream = response.bytes_stream();
        let mut decoder = LineDecoder::new();

        loop {
            let chunk = match tokio::time::timeout(self.config.stall_timeout, stream.next()).await {
                Err(_) => {
                    warn!("Nothing received for {:?}, reconnecting", self.config.stall_timeout);
                    return Session::Reconnect;
                }
                Ok(None) => {
                    warn!("Stream closed by the server");
                    return Session::Reconnect;
                }
                Ok(Some(Err(e))) => {
                    warn!("Stream read failed: {}", e);
                    return Session::Reconnect;
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            for line in decoder.push(&chunk) {
                match StreamMessage::parse(&line) {
                    Ok(message) => {
                        if !dispatch(message, handler) {
                            return Session::Reconnect;
                        }
                    }
                    Err(e) => warn!("Skipping line: {}", e),
                }
            }

            if decoder.overflowed() {
                warn!("Stream line exceeded {} bytes, reconnecting", MAX_LINE_BYTES);
                return Session::Reconnect;
            }
        }
    }
}

/// Route one decoded message, returns `false` when the connection should end
pub fn dispatch(message: StreamMessage, handler: &dyn StreamHandler) -> bool {
    match message {
        StreamMessage::Status(post) => handler.on_message(&post),
        StreamMessage::Limit { track } => info!("Rate limited, {} matching posts undelivered", track),
        StreamMessage::Warning { code, message } => warn!("Stall warning {}: {}", code, message),
        StreamMessage::Disconnect { code, reason } => {
            warn!("Server disconnect {}: {}", code, reason);
            return false;
        }
        StreamMessage::KeepAlive => debug!("keep-alive"),
        StreamMessage::Other(value) => debug!("Ignoring stream message: {}", value),
    }
    true
}

/// Control over a running stream thread
///
/// Dropping the handle also stops the client.
pub struct StreamHandle {
    shutdown_tx: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Stop the client and wait for its thread
    pub fn disconnect(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| WedpiError::StreamError("stream thread panicked".to_string()))?;
        }
        Ok(())
    }

    /// Whether the client has stopped on its own
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }
}
