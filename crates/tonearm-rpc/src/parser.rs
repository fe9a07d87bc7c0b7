//! Response parsing.
//!
//! A [`ResponseParser`] is fed one line at a time and decides when the response
//! is complete. Data lines are handed to an [`Extractor`], which turns them into
//! the command's typed result. Extraction is single pass with no lookahead.

use crate::error::{Error, Result};
use crate::protocol::{self, FIELD_SEPARATOR, ResponseLine};
use crate::status::StatusMap;

/// Builds a typed result from the data lines of one response
pub trait Extractor {
    type Output;

    /// Handle a data line. Lines the extractor does not recognise are ignored.
    fn extract(&mut self, line: &str);

    fn finish(self) -> Self::Output;
}

/// Collects values of a single field, in the order received.
///
/// The field name is matched without regard to ASCII case, since the daemon
/// echoes canonical tag names (`Artist: ...`) regardless of how the tag was
/// requested.
#[derive(Debug, Clone)]
pub struct ListExtractor {
    prefix: String,
    items: Vec<String>,
}

impl ListExtractor {
    #[must_use]
    pub fn new(field: &str) -> Self {
        Self {
            prefix: format!("{field}{FIELD_SEPARATOR}"),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn strip_prefix<'a>(&self, line: &'a str) -> Option<&'a str> {
        let len = self.prefix.len();
        if !line.is_char_boundary(len) || !line[..len].eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        Some(&line[len..])
    }
}

impl Extractor for ListExtractor {
    type Output = Vec<String>;

    fn extract(&mut self, line: &str) {
        if let Some(value) = self.strip_prefix(line) {
            self.items.push(value.trim().to_string());
        }
    }

    fn finish(self) -> Self::Output {
        self.items
    }
}

/// Builds a field name to value map; later lines overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct StatusExtractor {
    map: StatusMap,
}

impl StatusExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for StatusExtractor {
    type Output = StatusMap;

    fn extract(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(FIELD_SEPARATOR) else {
            return;
        };
        if key.is_empty() {
            return;
        }
        self.map.insert(key.to_string(), value.trim().to_string());
    }

    fn finish(self) -> Self::Output {
        self.map
    }
}

/// Outcome of feeding one line to a parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More lines are needed
    Continue,
    /// The success terminator was seen
    Done,
}

/// Drives an [`Extractor`] until the response terminator.
#[derive(Debug)]
pub struct ResponseParser<E> {
    extractor: E,
    done: bool,
}

impl<E: Extractor> ResponseParser<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            done: false,
        }
    }

    /// Feed the next line, without its trailing newline.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the line is an `ACK` terminator.
    pub fn feed(&mut self, line: &str) -> Result<Step> {
        match protocol::classify(line) {
            ResponseLine::Ok => {
                self.done = true;
                Ok(Step::Done)
            }
            ResponseLine::Ack(ack) => Err(ack.into()),
            ResponseLine::Greeting(version) => {
                tracing::debug!("Skipping greeting (protocol {version})");
                Ok(Step::Continue)
            }
            ResponseLine::Data(data) => {
                self.extractor.extract(data);
                Ok(Step::Continue)
            }
        }
    }

    /// Consume the parser and return the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedEof` if the success terminator was never fed.
    pub fn finish(self) -> Result<E::Output> {
        if !self.done {
            return Err(Error::UnexpectedEof);
        }
        Ok(self.extractor.finish())
    }
}

/// Parse a complete response from already-split lines.
///
/// Lines after the terminator are not examined.
///
/// # Errors
///
/// Returns a protocol error on an `ACK` line or `Error::UnexpectedEof` if the
/// lines run out before the terminator.
pub fn parse_lines<'a, E, I>(lines: I, extractor: E) -> Result<E::Output>
where
    E: Extractor,
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = ResponseParser::new(extractor);
    for line in lines {
        if parser.feed(line)? == Step::Done {
            break;
        }
    }
    parser.finish()
}
