use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("request to {0} timed out")]
    NetworkTimeout(String),

    #[error("no stream data on the status page")]
    NoStreamData,

    #[error("malformed track metadata: {0:?}")]
    MalformedMetadata(String),

    #[error("channel not found: #{0}")]
    ChannelNotFound(String),

    #[error("messaging API error: {0}")]
    MessagingApi(String),

    #[error("{}", describe_http_error(.0))]
    Http(#[from] reqwest::Error),
}

impl BotError {
    /// Folds timeouts into `NetworkTimeout` so callers can match on them.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let target = err
                .url()
                .map(|url| url.as_str().to_string())
                .unwrap_or_else(|| "server".to_string());
            return Self::NetworkTimeout(target);
        }
        Self::Http(err)
    }
}

fn describe_http_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        if let Some(url) = err.url() {
            return format!(
                "could not connect to {}",
                url.host_str().unwrap_or("server")
            );
        }
        return "could not connect to server".to_string();
    }
    if let Some(status) = err.status() {
        return format!("HTTP {}", status);
    }
    if err.is_decode() {
        return "invalid response from server".to_string();
    }
    format!("network error: {}", err)
}
