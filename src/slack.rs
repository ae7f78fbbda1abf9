use crate::error::BotError;
use crate::models::{
    Channel, ChannelInfoResponse, ChannelListResponse, PostMessageRequest, PostMessageResponse,
};
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub const ROBOT_EMOJI: &str = ":robot_face:";
pub const SKULL_EMOJI: &str = ":skull:";
pub const MUSIC_EMOJI: &str = ":musical_note:";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct SlackClient {
    base_url: String,
    token: String,
    client: Client,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build slack client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    pub async fn list_channels(&self) -> Result<Vec<Channel>, BotError> {
        let url = format!("{}/conversations.list", self.base_url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("exclude_archived", "true"), ("limit", "1000")])
            .send()
            .await
            .map_err(BotError::from_request)?
            .error_for_status()?
            .json::<ChannelListResponse>()
            .await?;
        if !response.ok {
            return Err(api_error(response.error));
        }
        Ok(response.channels)
    }

    pub async fn channel_id(&self, name: &str) -> Result<String, BotError> {
        self.list_channels()
            .await?
            .into_iter()
            .find(|channel| channel.name == name)
            .map(|channel| channel.id)
            .ok_or_else(|| BotError::ChannelNotFound(name.to_string()))
    }

    pub async fn channel_info(&self, channel_id: &str) -> Result<Channel, BotError> {
        let url = format!("{}/conversations.info", self.base_url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("channel", channel_id)])
            .send()
            .await
            .map_err(BotError::from_request)?
            .error_for_status()?
            .json::<ChannelInfoResponse>()
            .await?;
        match response.channel {
            Some(channel) if response.ok => Ok(channel),
            _ => Err(api_error(response.error)),
        }
    }

    /// Returns a human-readable confirmation of what was sent.
    pub async fn send(
        &self,
        channel_name: &str,
        message: &str,
        username: &str,
        icon: &str,
    ) -> Result<String, BotError> {
        let channel_id = self.channel_id(channel_name).await?;
        let url = format!("{}/chat.postMessage", self.base_url);
        let request = PostMessageRequest {
            channel: &channel_id,
            text: message,
            username,
            icon_emoji: icon,
        };
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(BotError::from_request)?
            .error_for_status()?
            .json::<PostMessageResponse>()
            .await?;
        if !response.ok {
            return Err(api_error(response.error));
        }

        let channel = match self.channel_info(&channel_id).await {
            Ok(info) => info.name,
            Err(err) => {
                tracing::debug!("channel info lookup failed: {}", err);
                channel_name.to_string()
            }
        };
        Ok(format!(
            "User {}\nsent message: {}\n to channel #{}\n with emoji {}",
            username, message, channel, icon
        ))
    }
}

fn api_error(error: Option<String>) -> BotError {
    BotError::MessagingApi(error.unwrap_or_else(|| "unknown_error".to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) async fn mount_channels(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [
                    { "id": "C001", "name": "general" },
                    { "id": "C002", "name": "boondoggling" },
                    { "id": "C003", "name": "now-playing" },
                    { "id": "C004", "name": "stream-status" }
                ]
            })))
            .mount(server)
            .await;
        for (id, name) in [
            ("C001", "general"),
            ("C002", "boondoggling"),
            ("C003", "now-playing"),
            ("C004", "stream-status"),
        ] {
            Mock::given(method("GET"))
                .and(path("/api/conversations.info"))
                .and(query_param("channel", id))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "ok": true,
                    "channel": { "id": id, "name": name, "purpose": { "value": "" } }
                })))
                .mount(server)
                .await;
        }
    }

    pub(crate) async fn mount_post_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> SlackClient {
        SlackClient::new(&format!("{}/api", server.uri()), "xoxb-test").unwrap()
    }

    #[tokio::test]
    async fn resolves_channel_by_name() {
        let server = MockServer::start().await;
        mount_channels(&server).await;

        let slack = client(&server);
        assert_eq!(slack.channel_id("boondoggling").await.unwrap(), "C002");
        assert!(matches!(
            slack.channel_id("nope").await,
            Err(BotError::ChannelNotFound(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn send_posts_and_confirms() {
        let server = MockServer::start().await;
        mount_channels(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(json!({
                "channel": "C002",
                "text": "hello world",
                "username": "TEQ-BOT",
                "icon_emoji": ":robot_face:"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let confirmation = client(&server)
            .send("boondoggling", "hello world", "TEQ-BOT", ROBOT_EMOJI)
            .await
            .unwrap();
        assert_eq!(
            confirmation,
            "User TEQ-BOT\nsent message: hello world\n to channel #boondoggling\n with emoji :robot_face:"
        );
    }

    #[tokio::test]
    async fn send_surfaces_api_error() {
        let server = MockServer::start().await;
        mount_channels(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "not_in_channel" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .send("general", "hi", "TEQ-BOT", ROBOT_EMOJI)
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::MessagingApi(detail) if detail == "not_in_channel"));
    }

    #[tokio::test]
    async fn bad_token_fails_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations.list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
            )
            .mount(&server)
            .await;

        let err = client(&server).list_channels().await.unwrap_err();
        assert!(matches!(err, BotError::MessagingApi(detail) if detail == "invalid_auth"));
    }

    #[tokio::test]
    async fn channel_info_reads_purpose() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations.info"))
            .and(query_param("channel", "C001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channel": { "id": "C001", "name": "general", "purpose": { "value": "station chatter" } }
            })))
            .mount(&server)
            .await;

        let info = client(&server).channel_info("C001").await.unwrap();
        assert_eq!(info.name, "general");
        assert_eq!(info.purpose.unwrap().value, "station chatter");
    }
}
