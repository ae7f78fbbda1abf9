use crate::config::DirectoryConfig;
use crate::error::BotError;
use crate::metadata::TrackObservation;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::form_urlencoded;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct DirectoryPublisher {
    base_url: String,
    client: Client,
}

impl DirectoryPublisher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .context("build directory client")?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Best effort: failures are logged and dropped.
    pub async fn publish(&self, directory: &DirectoryConfig, track: &TrackObservation) {
        let url = self.request_url(
            &directory.station_id,
            &directory.partner_id,
            &directory.partner_key,
            &track.title,
            &track.artist,
        );
        info!("publishing now playing to directory: {}", track.raw);
        debug!("directory request: {}", url);
        if let Err(err) = self.send(&url).await {
            warn!("directory publish failed: {}", err);
        }
    }

    async fn send(&self, url: &str) -> Result<(), BotError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(BotError::from_request)?
            .error_for_status()?;
        Ok(())
    }

    fn request_url(
        &self,
        station_id: &str,
        partner_id: &str,
        partner_key: &str,
        title: &str,
        artist: &str,
    ) -> String {
        format!(
            "{}?partnerId={}&partnerKey={}&id={}&title={}&artist={}",
            self.base_url,
            encode(partner_id),
            encode(partner_key),
            encode(station_id),
            encode_plus_joined(title),
            encode_plus_joined(artist),
        )
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Title and artist already carry `+` for spaces; keep those, encode the rest.
fn encode_plus_joined(value: &str) -> String {
    value.split('+').map(encode).collect::<Vec<_>>().join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn directory() -> DirectoryConfig {
        DirectoryConfig {
            base_url: String::new(),
            station_id: "s123".to_string(),
            partner_id: "p456".to_string(),
            partner_key: "k789".to_string(),
        }
    }

    #[test]
    fn query_order_is_fixed() {
        let publisher = DirectoryPublisher::new("http://air.example/Playing.ashx").unwrap();
        let url = publisher.request_url("s123", "p456", "k789", "Beat+Market", "Sun+Machine");
        assert_eq!(
            url,
            "http://air.example/Playing.ashx?partnerId=p456&partnerKey=k789&id=s123&title=Beat+Market&artist=Sun+Machine"
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let publisher = DirectoryPublisher::new("http://air.example/Playing.ashx").unwrap();
        let url = publisher.request_url("s1", "p1", "k1", "Rock+&+Roll", "AC/DC");
        assert!(url.ends_with("&title=Rock+%26+Roll&artist=AC%2FDC"));
    }

    #[tokio::test]
    async fn publish_sends_track_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Playing.ashx"))
            .and(query_param("partnerId", "p456"))
            .and(query_param("partnerKey", "k789"))
            .and(query_param("id", "s123"))
            .and(query_param("title", "Beat Market"))
            .and(query_param("artist", "Sun Machine"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let publisher =
            DirectoryPublisher::new(&format!("{}/Playing.ashx", server.uri())).unwrap();
        let track = metadata::parse("#NowPlaying: Beat Market by Sun Machine").unwrap();
        publisher.publish(&directory(), &track).await;
    }

    #[tokio::test]
    async fn publish_swallows_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let publisher =
            DirectoryPublisher::new(&format!("{}/Playing.ashx", server.uri())).unwrap();
        let track = metadata::parse("Beat Market by Sun Machine").unwrap();
        publisher.publish(&directory(), &track).await;
    }

    #[tokio::test]
    async fn publish_swallows_unreachable_host() {
        let publisher = DirectoryPublisher::new("http://127.0.0.1:1/Playing.ashx").unwrap();
        let track = metadata::parse("Beat Market by Sun Machine").unwrap();
        publisher.publish(&directory(), &track).await;
    }
}
