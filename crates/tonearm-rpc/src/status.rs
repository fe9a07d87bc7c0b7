//! Typed view over the `status` reply.

use std::collections::HashMap;
use std::time::Duration;

/// Raw `status` reply: field name to trimmed value
pub type StatusMap = HashMap<String, String>;

/// Player state reported in the `state` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    Play,
    Pause,
    #[default]
    Stop,
}

impl PlayState {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Playback status decoded from a [`StatusMap`].
///
/// Missing or malformed fields decode to `None` or `false`; decoding never
/// fails. The daemon reports `volume: -1` when no mixer is available, which
/// decodes to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatus {
    pub volume: Option<u8>,
    pub repeat: bool,
    pub random: bool,
    pub single: bool,
    pub consume: bool,
    pub state: PlayState,
    /// Position of the current song in the queue
    pub song: Option<u32>,
    pub elapsed: Option<Duration>,
    pub raw: StatusMap,
}

impl PlaybackStatus {
    #[must_use]
    pub fn from_map(map: &StatusMap) -> Self {
        let field = |key: &str| map.get(key).map(String::as_str);
        let flag = |key: &str| field(key) == Some("1");

        Self {
            volume: field("volume").and_then(|v| v.parse::<u8>().ok()),
            repeat: flag("repeat"),
            random: flag("random"),
            single: flag("single"),
            consume: flag("consume"),
            state: field("state").and_then(PlayState::parse).unwrap_or_default(),
            song: field("song").and_then(|v| v.parse().ok()),
            elapsed: field("elapsed")
                .and_then(|v| v.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            raw: map.clone(),
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == PlayState::Pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> StatusMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_map_full() {
        let status = PlaybackStatus::from_map(&map(&[
            ("volume", "80"),
            ("repeat", "1"),
            ("random", "0"),
            ("single", "0"),
            ("consume", "1"),
            ("state", "pause"),
            ("song", "4"),
            ("elapsed", "12.500"),
        ]));

        assert_eq!(status.volume, Some(80));
        assert!(status.repeat);
        assert!(!status.random);
        assert!(!status.single);
        assert!(status.consume);
        assert_eq!(status.state, PlayState::Pause);
        assert!(status.is_paused());
        assert_eq!(status.song, Some(4));
        assert_eq!(status.elapsed, Some(Duration::from_millis(12_500)));
        assert_eq!(status.raw.len(), 8);
    }

    #[test]
    fn test_from_map_empty_uses_defaults() {
        let status = PlaybackStatus::from_map(&StatusMap::new());

        assert_eq!(status.volume, None);
        assert_eq!(status.state, PlayState::Stop);
        assert!(!status.is_paused());
        assert_eq!(status.song, None);
        assert_eq!(status.elapsed, None);
    }

    #[test]
    fn test_from_map_malformed_fields() {
        let status = PlaybackStatus::from_map(&map(&[
            ("volume", "-1"),
            ("state", "rewinding"),
            ("song", "first"),
            ("elapsed", "-3.0"),
        ]));

        assert_eq!(status.volume, None);
        assert_eq!(status.state, PlayState::Stop);
        assert_eq!(status.song, None);
        assert_eq!(status.elapsed, None);
    }
}
