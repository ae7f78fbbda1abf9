use crate::error::BotError;
use crate::metadata::NOW_PLAYING_TAG;
use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

const STREAMDATA_SELECTOR: &str = ".streamdata";

pub const NO_DATA: &str = "no data read from Icecast server";
pub const URL_ERROR: &str = "HTTP request timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownCause {
    /// Icecast answered but no encoder is feeding it.
    NoData,
    /// The status page itself could not be fetched.
    UrlError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Playing(String),
    Down(DownCause),
}

impl Probe {
    pub fn is_up(&self) -> bool {
        matches!(self, Probe::Playing(_))
    }

    /// The tagged track when up, otherwise the diagnostic for the cause.
    pub fn payload(&self) -> String {
        match self {
            Probe::Playing(track) => track.clone(),
            Probe::Down(cause) => diagnostic(*cause),
        }
    }
}

impl DownCause {
    pub fn reason(&self) -> &'static str {
        match self {
            DownCause::NoData => NO_DATA,
            DownCause::UrlError => URL_ERROR,
        }
    }
}

pub fn diagnostic(cause: DownCause) -> String {
    let mut msg = String::from("ALERT!! STREAM IS DOWN!!\nLikely cause: \n");
    match cause {
        DownCause::NoData => {
            msg.push_str("No data read from Icecast server. \n");
            msg.push_str(
                "The station computer is on and Icecast is running, but the \
                 encoders are not connected to it. This usually happens when \
                 more than one encoder instance was started on the station \
                 computer, so check that first.",
            );
        }
        DownCause::UrlError => {
            msg.push_str("HTTP Request Timeout. \n");
            msg.push_str(
                "The Icecast status page did not answer in time. Possible reasons: \n",
            );
            msg.push_str("1) Icecast was closed on the station computer\n");
            msg.push_str("2) several Icecast instances are running\n");
            msg.push_str("3) the station computer lost internet access\n");
            msg.push_str("4) the station computer is rebooting\n");
            msg.push_str("5) the station computer is off, shut down or crashed.\n\n");
            msg.push_str(
                "Check the encoders as well while diagnosing this, they may be down too.\n",
            );
        }
    }
    msg
}

#[derive(Clone)]
pub struct StreamProbe {
    client: Client,
}

impl StreamProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build stream probe client")?;
        Ok(Self { client })
    }

    pub async fn probe(&self, url: &str) -> Probe {
        match self.current_track(url).await {
            Ok(track) => Probe::Playing(format!("{}{}", NOW_PLAYING_TAG, track)),
            Err(BotError::NoStreamData) => Probe::Down(DownCause::NoData),
            Err(err) => {
                debug!("stream probe failed: {}", err);
                Probe::Down(DownCause::UrlError)
            }
        }
    }

    async fn current_track(&self, url: &str) -> Result<String, BotError> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(BotError::from_request)?
            .error_for_status()?
            .text()
            .await
            .map_err(BotError::from_request)?;
        extract_now_playing(&body).ok_or(BotError::NoStreamData)
    }
}

/// The status page repeats the stream block once per encoder bitrate, so the
/// last `streamdata` cell is taken; all copies carry the same track.
pub fn extract_now_playing(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(STREAMDATA_SELECTOR).ok()?;
    let last = document.select(&selector).last()?;
    Some(last.text().collect::<String>().trim().to_string())
}
