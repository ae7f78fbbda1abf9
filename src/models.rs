use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub purpose: Option<ChannelPurpose>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPurpose {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    pub ok: bool,
    #[serde(default)]
    pub channels: Vec<Channel>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelInfoResponse {
    pub ok: bool,
    pub channel: Option<Channel>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    pub username: &'a str,
    pub icon_emoji: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    pub error: Option<String>,
}
