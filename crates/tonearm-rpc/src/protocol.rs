//! MPD line protocol definitions.
//!
//! Every command is a single newline-terminated line. Replies are zero or more
//! data lines followed by a terminator: `OK` on success or `ACK ...` on failure.
//! A freshly opened connection starts with an `OK MPD <version>` greeting.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::error::Error;

/// Default daemon host
pub const DEFAULT_HOST: &str = "localhost";

/// Default daemon port
pub const DEFAULT_PORT: u16 = 6600;

/// Success terminator
pub const SUCCESS: &str = "OK";

/// Error terminator prefix
pub const ACK_PREFIX: &str = "ACK ";

/// Greeting sent once after connecting
pub const GREETING_PREFIX: &str = "OK MPD";

/// Field carrying file paths in `listall` replies
pub const FILE_FIELD: &str = "file";

/// Separator between a field name and its value
pub const FIELD_SEPARATOR: &str = ": ";

/// Classification of a single response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLine<'a> {
    /// `OK` - the response ended successfully
    Ok,
    /// `ACK ...` - the daemon rejected the command
    Ack(AckError),
    /// `OK MPD <version>` - connection greeting
    Greeting(&'a str),
    /// Anything else
    Data(&'a str),
}

/// Classify a response line. The trailing newline must already be stripped.
#[must_use]
pub fn classify(line: &str) -> ResponseLine<'_> {
    if line == SUCCESS {
        return ResponseLine::Ok;
    }

    if let Some(text) = line.strip_prefix(ACK_PREFIX) {
        return ResponseLine::Ack(AckError::parse(text));
    }

    if let Some(version) = parse_greeting(line) {
        return ResponseLine::Greeting(version);
    }

    ResponseLine::Data(line)
}

/// Extract the protocol version from an `OK MPD <version>` greeting.
#[must_use]
pub fn parse_greeting(line: &str) -> Option<&str> {
    line.strip_prefix(GREETING_PREFIX).map(str::trim)
}

/// Numeric error codes carried in `ACK [code@index]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    NotList,
    Arg,
    Password,
    Permission,
    Unknown,
    NoExist,
    PlaylistMax,
    System,
    PlaylistLoad,
    UpdateAlready,
    PlayerSync,
    Exist,
    Other(u32),
}

impl From<u32> for AckCode {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::NotList,
            2 => Self::Arg,
            3 => Self::Password,
            4 => Self::Permission,
            5 => Self::Unknown,
            50 => Self::NoExist,
            51 => Self::PlaylistMax,
            52 => Self::System,
            53 => Self::PlaylistLoad,
            54 => Self::UpdateAlready,
            55 => Self::PlayerSync,
            56 => Self::Exist,
            other => Self::Other(other),
        }
    }
}

/// Error reported by the daemon on an `ACK` line.
///
/// The usual layout is `ACK [code@command_index] {command} message`. Lines that
/// do not follow it keep their full text as the message with code `Other(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckError {
    pub code: AckCode,
    pub command_index: u32,
    pub command: String,
    pub message: String,
    raw: String,
}

impl AckError {
    /// Parse the text following the `ACK ` prefix.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim_end();
        Self::parse_bracketed(text).unwrap_or_else(|| Self {
            code: AckCode::Other(0),
            command_index: 0,
            command: String::new(),
            message: text.to_string(),
            raw: text.to_string(),
        })
    }

    fn parse_bracketed(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('[')?;
        let (location, rest) = rest.split_once(']')?;
        let (code, index) = location.split_once('@')?;
        let code: u32 = code.parse().ok()?;
        let command_index: u32 = index.parse().ok()?;

        let rest = rest.trim_start().strip_prefix('{')?;
        let (command, message) = rest.split_once('}')?;

        Some(Self {
            code: code.into(),
            command_index,
            command: command.to_string(),
            message: message.trim().to_string(),
            raw: text.to_string(),
        })
    }

    /// Full error text as sent by the daemon, without the `ACK ` prefix
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A single command line.
///
/// Arguments are joined with single spaces and sent verbatim; the caller is
/// responsible for arguments the daemon can parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    line: String,
}

impl Command {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            line: name.to_string(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        // Writing into a String cannot fail
        let _ = write!(self.line, " {arg}");
        self
    }

    /// Append a single trailing space before the newline.
    #[must_use]
    fn padded(mut self) -> Self {
        self.line.push(' ');
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Command name (first word of the line)
    #[must_use]
    pub fn name(&self) -> &str {
        self.line.split(' ').next().unwrap_or_default()
    }

    #[must_use]
    pub fn play(index: u32) -> Self {
        Self::new("play").arg(index)
    }

    #[must_use]
    pub fn stop() -> Self {
        Self::new("stop")
    }

    #[must_use]
    pub fn next() -> Self {
        Self::new("next")
    }

    /// `pause 1` pauses, `pause 0` resumes.
    #[must_use]
    pub fn pause(paused: bool) -> Self {
        Self::new("pause").arg(u8::from(paused))
    }

    #[must_use]
    pub fn list_all(path: &str) -> Self {
        Self::new("listall").arg(path)
    }

    #[must_use]
    pub fn list(column: &str) -> Self {
        Self::new("list").arg(column)
    }

    #[must_use]
    pub fn status() -> Self {
        Self::new("status")
    }

    #[must_use]
    pub fn find_add_file(file: &str) -> Self {
        Self::new("findadd").arg("file").arg(file).padded()
    }

    #[must_use]
    pub fn update() -> Self {
        Self::new("update")
    }

    #[must_use]
    pub fn set_volume(volume: u8) -> Self {
        Self::new("setvol").arg(volume).padded()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Database tags accepted by `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Artist,
    Album,
    Title,
    Track,
    Genre,
    Date,
}

impl Column {
    pub const ALL: [Self; 6] = [
        Self::Artist,
        Self::Album,
        Self::Title,
        Self::Track,
        Self::Genre,
        Self::Date,
    ];

    /// Tag name as the daemon echoes it back in `list` replies
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::Album => "Album",
            Self::Title => "Title",
            Self::Track => "Track",
            Self::Genre => "Genre",
            Self::Date => "Date",
        }
    }

    /// Comma-separated list of supported tags, for error messages and help text
    #[must_use]
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|column| column.tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for Column {
    type Err = Error;

    /// Matching ignores case and spaces, so `"al bum"` and `"ALBUM"` are both `Album`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input.chars().filter(|c| *c != ' ').collect();

        Self::ALL
            .into_iter()
            .find(|column| column.tag().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| Error::Validation(input.to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_terminators() {
        assert_eq!(classify("OK"), ResponseLine::Ok);

        let line = classify("ACK [50@0] {play} song doesn't exist");
        let ResponseLine::Ack(err) = line else {
            panic!("Expected Ack, got {line:?}");
        };
        assert_eq!(err.code, AckCode::NoExist);
        assert_eq!(err.command_index, 0);
        assert_eq!(err.command, "play");
        assert_eq!(err.message, "song doesn't exist");
    }

    #[test]
    fn test_classify_greeting_and_data() {
        assert_eq!(classify("OK MPD 0.23.5"), ResponseLine::Greeting("0.23.5"));
        assert_eq!(classify("file: a.mp3"), ResponseLine::Data("file: a.mp3"));
    }

    #[test]
    fn test_ok_must_match_exactly() {
        assert_eq!(classify("OKAY"), ResponseLine::Data("OKAY"));
        assert_eq!(classify("OK "), ResponseLine::Data("OK "));
    }

    #[test]
    fn test_ack_without_brackets_keeps_text() {
        let err = AckError::parse("something went wrong");
        assert_eq!(err.code, AckCode::Other(0));
        assert_eq!(err.message, "something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_ack_display_is_raw_text() {
        let err = AckError::parse("[2@1] {setvol} Invalid volume value");
        assert_eq!(err.code, AckCode::Arg);
        assert_eq!(err.command_index, 1);
        assert_eq!(err.raw(), "[2@1] {setvol} Invalid volume value");
        assert_eq!(err.to_string(), "[2@1] {setvol} Invalid volume value");
    }

    #[test]
    fn test_ack_code_mapping() {
        assert_eq!(AckCode::from(4), AckCode::Permission);
        assert_eq!(AckCode::from(54), AckCode::UpdateAlready);
        assert_eq!(AckCode::from(99), AckCode::Other(99));
    }

    #[test]
    fn test_command_lines() {
        assert_eq!(Command::play(3).as_str(), "play 3");
        assert_eq!(Command::stop().as_str(), "stop");
        assert_eq!(Command::next().as_str(), "next");
        assert_eq!(Command::pause(true).as_str(), "pause 1");
        assert_eq!(Command::pause(false).as_str(), "pause 0");
        assert_eq!(Command::list_all("/").as_str(), "listall /");
        assert_eq!(Command::list("Artist").as_str(), "list Artist");
        assert_eq!(Command::status().as_str(), "status");
        assert_eq!(
            Command::find_add_file("a/b.mp3").as_str(),
            "findadd file a/b.mp3 "
        );
        assert_eq!(Command::update().as_str(), "update");
        assert_eq!(Command::set_volume(42).as_str(), "setvol 42 ");
    }

    #[test]
    fn test_command_name() {
        assert_eq!(Command::find_add_file("x").name(), "findadd");
        assert_eq!(Command::status().name(), "status");
    }

    #[test]
    fn test_column_parse_ignores_case_and_spaces() {
        assert_eq!("artist".parse::<Column>().unwrap(), Column::Artist);
        assert_eq!("ALBUM".parse::<Column>().unwrap(), Column::Album);
        assert_eq!("Ti tle".parse::<Column>().unwrap(), Column::Title);
        assert_eq!(" g e n r e ".parse::<Column>().unwrap(), Column::Genre);
    }

    #[test]
    fn test_column_parse_rejects_unknown() {
        let err = "composer".parse::<Column>().unwrap_err();
        assert!(matches!(err, Error::Validation(ref c) if c == "composer"));
        assert!(err.to_string().contains("Artist, Album, Title, Track, Genre, Date"));
    }

    #[test]
    fn test_greeting_version() {
        assert_eq!(parse_greeting("OK MPD 0.21.11"), Some("0.21.11"));
        assert_eq!(parse_greeting("OK"), None);
    }
}
