use crate::error::BotError;

pub const NOW_PLAYING_TAG: &str = "#NowPlaying: ";

/// Splits on the bare word, so a title like "Stand by Me" is cut in the
/// wrong place. Fixing that needs a distinct separator on the encoder side.
const SEPARATOR: &str = "by";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackObservation {
    /// Query-ready title, spaces encoded as `+`.
    pub title: String,
    /// Query-ready artist, spaces encoded as `+`.
    pub artist: String,
    pub raw: String,
}

pub fn parse(text: &str) -> Result<TrackObservation, BotError> {
    let (song, artist) = text
        .split_once(SEPARATOR)
        .ok_or_else(|| BotError::MalformedMetadata(text.to_string()))?;

    let song = song.trim();
    let song = song
        .strip_prefix(NOW_PLAYING_TAG.trim_end())
        .unwrap_or(song)
        .trim();
    let artist = artist.trim();
    if song.is_empty() || artist.is_empty() {
        return Err(BotError::MalformedMetadata(text.to_string()));
    }

    Ok(TrackObservation {
        title: song.replace(' ', "+"),
        artist: artist.replace(' ', "+"),
        raw: text.to_string(),
    })
}
