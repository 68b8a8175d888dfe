/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Forward-only cursor over the YAML event stream of one source file.
 */

use std::sync::Arc;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::source::SourceLocation;

/// 1-based line and column of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    fn from_marker(marker: &Marker) -> Self {
        Self {
            line: marker.line() as u32,
            column: marker.col() as u32 + 1,
        }
    }
}

/// A tag as written on a node: `!Ref` has handle `!` and suffix `Ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeTag {
    pub handle: String,
    pub suffix: String,
}

impl NodeTag {
    pub fn is_local(&self) -> bool {
        self.handle == "!"
    }

    /// `!!str` and friends; the parser may hand them over expanded.
    pub fn is_core_schema(&self) -> bool {
        self.handle == "!!" || self.handle == "tag:yaml.org,2002:"
    }
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.handle == "tag:yaml.org,2002:" {
            write!(f, "!!{}", self.suffix)
        } else {
            write!(f, "{}{}", self.handle, self.suffix)
        }
    }
}

/// A scalar taken off the stream.
#[derive(Debug, Clone)]
pub(crate) struct ScalarEvent {
    pub value: String,
    pub plain: bool,
    pub tag: Option<NodeTag>,
    pub location: SourceLocation,
}

struct EventCollector {
    events: Vec<(Event, Position)>,
}

impl MarkedEventReceiver for EventCollector {
    fn on_event(&mut self, event: Event, marker: Marker) {
        self.events.push((event, Position::from_marker(&marker)));
    }
}

pub(crate) struct EventCursor {
    file: Arc<str>,
    events: Vec<(Event, Position)>,
    index: usize,
    last: Position,
}

impl EventCursor {
    /// Scans `content` into events. A scanner error becomes an `E100` diagnostic.
    pub fn load(file: &str, content: &str) -> Result<Self, Diagnostic> {
        let mut collector = EventCollector { events: Vec::new() };
        let mut parser = Parser::new(content.chars());
        if let Err(err) = parser.load(&mut collector, false) {
            let marker = err.marker();
            let location = SourceLocation::point(file, marker.line() as u32, marker.col() as u32 + 1);
            return Err(
                Diagnostic::error(ErrorCode::E100, format!("invalid YAML: {}", err.info())).at(&location)
            );
        }
        Ok(Self {
            file: Arc::from(file),
            events: collector.events,
            index: 0,
            last: Position { line: 1, column: 1 },
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Moves past the stream and document headers. False for an empty stream.
    pub fn enter_document(&mut self) -> bool {
        while let Some(event) = self.peek() {
            match event {
                Event::StreamStart | Event::Nothing => self.index += 1,
                Event::DocumentStart { .. } => {
                    self.index += 1;
                    return !matches!(self.peek(), Some(Event::DocumentEnd) | None);
                }
                _ => return false,
            }
        }
        false
    }

    pub fn peek(&self) -> Option<&Event> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, offset: usize) -> Option<&Event> {
        self.events.get(self.index + offset).map(|(event, _)| event)
    }

    /// Position of the next event, or of the last consumed one at the end.
    pub fn position(&self) -> Position {
        self.events
            .get(self.index)
            .map_or(self.last, |(_, position)| *position)
    }

    pub fn location(&self, start: Position, end: Position) -> SourceLocation {
        SourceLocation::new(self.file.clone(), start.line, start.column, end.line, end.column)
    }

    /// Location from `start` up to the last consumed event.
    pub fn span_from(&self, start: Position) -> SourceLocation {
        self.location(start, self.last)
    }

    pub fn current_location(&self) -> SourceLocation {
        let position = self.position();
        self.location(position, position)
    }

    pub fn next(&mut self) -> Option<Event> {
        let (event, position) = self.events.get_mut(self.index)?;
        let event = std::mem::replace(event, Event::Nothing);
        self.last = *position;
        self.index += 1;
        Some(event)
    }

    /// Tag of the next node, if any.
    pub fn peek_tag(&self) -> Option<NodeTag> {
        match self.peek()? {
            Event::Scalar(_, _, _, Some(tag))
            | Event::SequenceStart(_, Some(tag))
            | Event::MappingStart(_, Some(tag)) => Some(NodeTag {
                handle: tag.handle.clone(),
                suffix: tag.suffix.clone(),
            }),
            _ => None,
        }
    }

    /// Removes the tag from the next node so it reads like an untagged one.
    pub fn strip_tag(&mut self) {
        if let Some((event, _)) = self.events.get_mut(self.index) {
            match event {
                Event::Scalar(_, _, _, tag)
                | Event::SequenceStart(_, tag)
                | Event::MappingStart(_, tag) => *tag = None,
                _ => {}
            }
        }
    }

    pub fn at_scalar(&self) -> bool {
        matches!(self.peek(), Some(Event::Scalar(..)))
    }

    pub fn at_sequence(&self) -> bool {
        matches!(self.peek(), Some(Event::SequenceStart(..)))
    }

    pub fn at_mapping(&self) -> bool {
        matches!(self.peek(), Some(Event::MappingStart(..)))
    }

    pub fn at_sequence_end(&self) -> bool {
        matches!(self.peek(), Some(Event::SequenceEnd))
    }

    pub fn at_mapping_end(&self) -> bool {
        matches!(self.peek(), Some(Event::MappingEnd))
    }

    /// Consumes the next event if it is a scalar.
    pub fn next_scalar(&mut self) -> Option<ScalarEvent> {
        if !self.at_scalar() {
            return None;
        }
        let start = self.position();
        match self.next()? {
            Event::Scalar(value, style, _, tag) => {
                let end_column = start.column + value.chars().count() as u32;
                let location = SourceLocation::new(
                    self.file.clone(),
                    start.line,
                    start.column,
                    start.line,
                    end_column,
                );
                Some(ScalarEvent {
                    plain: matches!(style, TScalarStyle::Plain),
                    tag: tag.map(|tag| NodeTag {
                        handle: tag.handle,
                        suffix: tag.suffix,
                    }),
                    value,
                    location,
                })
            }
            _ => None,
        }
    }

    /// Value of the next scalar when it is an untagged plain key-like scalar,
    /// without consuming it.
    pub fn peek_plain_key(&self, offset: usize) -> Option<&str> {
        match self.peek_nth(offset)? {
            Event::Scalar(value, _, _, None) => Some(value),
            _ => None,
        }
    }

    /// Short description of the next node for messages.
    pub fn describe_next(&self) -> &'static str {
        match self.peek() {
            Some(Event::Scalar(..)) => "a scalar",
            Some(Event::SequenceStart(..)) => "a list",
            Some(Event::MappingStart(..)) => "a mapping",
            Some(Event::Alias(_)) => "an alias",
            _ => "the end of the document",
        }
    }

    /// Consumes one complete node.
    pub fn skip_node(&mut self) {
        let mut depth = 0usize;
        while let Some(event) = self.next() {
            match event {
                Event::SequenceStart(..) | Event::MappingStart(..) => depth += 1,
                Event::SequenceEnd | Event::MappingEnd => depth = depth.saturating_sub(1),
                Event::StreamEnd | Event::DocumentEnd => return,
                _ => {}
            }
            if depth == 0 {
                return;
            }
        }
    }

    /// Consumes the rest of a mapping or sequence whose start was already
    /// consumed, including its end event.
    pub fn skip_to_end(&mut self) {
        loop {
            match self.peek() {
                Some(Event::MappingEnd | Event::SequenceEnd) => {
                    self.next();
                    return;
                }
                Some(Event::StreamEnd | Event::DocumentEnd) | None => return,
                Some(_) => self.skip_node(),
            }
        }
    }

    /// Number of entries of the mapping that starts at the next event.
    pub fn mapping_len(&self) -> usize {
        let mut index = self.index + 1;
        let mut nodes = 0;
        while let Some((event, _)) = self.events.get(index) {
            if matches!(event, Event::MappingEnd) {
                break;
            }
            index = self.node_end(index);
            nodes += 1;
        }
        nodes / 2
    }

    // Index just past the node starting at `index`.
    fn node_end(&self, mut index: usize) -> usize {
        let mut depth = 0usize;
        while let Some((event, _)) = self.events.get(index) {
            index += 1;
            match event {
                Event::SequenceStart(..) | Event::MappingStart(..) => depth += 1,
                Event::SequenceEnd | Event::MappingEnd => depth = depth.saturating_sub(1),
                Event::StreamEnd | Event::DocumentEnd => return index,
                _ => {}
            }
            if depth == 0 {
                break;
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(content: &str) -> EventCursor {
        let mut cursor = EventCursor::load("test.yml", content).unwrap();
        assert!(cursor.enter_document());
        cursor
    }

    #[test]
    fn test_scalar_location_is_one_based() {
        let mut cursor = cursor("key: value\n");
        assert!(cursor.at_mapping());
        cursor.next();
        let key = cursor.next_scalar().unwrap();
        assert_eq!(key.value, "key");
        assert_eq!(key.location.start_line(), 1);
        assert_eq!(key.location.start_column(), 1);
        let value = cursor.next_scalar().unwrap();
        assert_eq!(value.location.start_column(), 6);
        assert!(value.plain);
    }

    #[test]
    fn test_tags_are_reported_and_stripped() {
        let mut cursor = cursor("!Ref Bucket\n");
        let tag = cursor.peek_tag().unwrap();
        assert!(tag.is_local());
        assert_eq!(tag.suffix, "Ref");
        cursor.strip_tag();
        assert!(cursor.peek_tag().is_none());
        assert_eq!(cursor.next_scalar().unwrap().value, "Bucket");
    }

    #[test]
    fn test_core_schema_tag() {
        let cursor = cursor("!!str 123\n");
        let tag = cursor.peek_tag().unwrap();
        assert!(tag.is_core_schema());
        assert_eq!(tag.suffix, "str");
        assert_eq!(tag.to_string(), "!!str");
    }

    #[test]
    fn test_skip_node_and_mapping_len() {
        let mut cursor = cursor("a: [1, 2, {b: c}]\nd: e\n");
        assert_eq!(cursor.mapping_len(), 2);
        cursor.next();
        cursor.next_scalar();
        cursor.skip_node();
        assert_eq!(cursor.next_scalar().unwrap().value, "d");
    }

    #[test]
    fn test_empty_document() {
        let mut cursor = EventCursor::load("empty.yml", "").unwrap();
        assert!(!cursor.enter_document());
    }

    #[test]
    fn test_scan_error() {
        let diagnostic = EventCursor::load("bad.yml", "a: [1, 2\n").err().unwrap();
        assert_eq!(diagnostic.code(), ErrorCode::E100);
        assert_eq!(diagnostic.location().unwrap().file(), "bad.yml");
    }
}
