/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Parser turning module YAML into a source-located AST.
 * Source text comes from a `FileProvider`; this module performs no file I/O itself.
 */

mod declarations;
mod events;
mod expressions;
pub(crate) mod literals;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use crate::ast::Ast;
use crate::diagnostics::{did_you_mean, Diagnostic, DiagnosticSink, ErrorCode};
use crate::source::{normalize_path, resolve_relative, FileProvider, SourceLocation};

use events::{EventCursor, ScalarEvent};

/// Parses the module at `entry_path` and everything it includes.
///
/// Returns `None` when any syntax error was reported; the diagnostics are
/// in `sink`.
pub fn parse_module(
    entry_path: &str,
    provider: &dyn FileProvider,
    sink: &mut dyn DiagnosticSink,
) -> Option<Ast> {
    ModuleParser::new(provider, sink).parse(entry_path)
}

pub(crate) struct ModuleParser<'a> {
    provider: &'a dyn FileProvider,
    sink: &'a mut dyn DiagnosticSink,
    ast: Ast,
    include_stack: Vec<String>,
    errors: usize,
}

impl<'a> ModuleParser<'a> {
    pub fn new(provider: &'a dyn FileProvider, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            provider,
            sink,
            ast: Ast::new(),
            include_stack: Vec::new(),
            errors: 0,
        }
    }

    pub fn parse(mut self, entry_path: &str) -> Option<Ast> {
        let path = normalize_path(entry_path);
        log::debug!("Parsing module '{path}'");

        let mut cursor = self.open(&path, None)?;
        if !cursor.enter_document() {
            self.error(
                ErrorCode::E103,
                "module file is empty",
                &SourceLocation::point(path.as_str(), 1, 1),
            );
            return None;
        }

        self.include_stack.push(path);
        let root = self.parse_module_declaration(&mut cursor);
        self.include_stack.pop();

        let root = root?;
        if self.errors > 0 {
            log::debug!("Parsing failed with {} error(s)", self.errors);
            return None;
        }
        self.ast.set_root(root);
        log::debug!("Parsed {} nodes", self.ast.len());
        Some(self.ast)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.errors += 1;
        }
        self.sink.emit(diagnostic);
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, location: &SourceLocation) {
        self.report(Diagnostic::error(code, message).at(location));
    }

    /// Reports that the next node has the wrong shape and skips it.
    ///
    /// End events are left in place so the enclosing reader can finish.
    fn unexpected(&mut self, cursor: &mut EventCursor, expected: &str) {
        let location = cursor.current_location();
        let found = cursor.describe_next();
        self.error(
            ErrorCode::E103,
            format!("expected {expected}, found {found}"),
            &location,
        );
        if !cursor.at_sequence_end() && !cursor.at_mapping_end() {
            cursor.skip_node();
        }
    }

    fn open(&mut self, path: &str, origin: Option<&SourceLocation>) -> Option<EventCursor> {
        log::trace!("Reading '{path}'");
        let content = match self.provider.read_file(path) {
            Ok(content) => content,
            Err(err) => {
                let diagnostic =
                    Diagnostic::error(ErrorCode::E101, format!("cannot read '{path}': {err}"));
                self.report(match origin {
                    Some(location) => diagnostic.at(location),
                    None => diagnostic,
                });
                return None;
            }
        };
        match EventCursor::load(path, &content) {
            Ok(cursor) => Some(cursor),
            Err(diagnostic) => {
                self.report(diagnostic);
                None
            }
        }
    }

    /// Parses the document named by an `!Include` scalar with `parse`.
    ///
    /// Paths are relative to the including file. Nodes from the included
    /// document keep that document's locations.
    fn parse_include<T>(
        &mut self,
        cursor: &mut EventCursor,
        parse: impl FnOnce(&mut Self, &mut EventCursor) -> Option<T>,
    ) -> Option<T> {
        let Some(scalar) = cursor.next_scalar() else {
            let location = cursor.current_location();
            self.error(ErrorCode::E108, "!Include expects a file path", &location);
            cursor.skip_node();
            return None;
        };
        let path = resolve_relative(cursor.file(), &scalar.value);
        if self.include_stack.contains(&path) {
            let chain = self.include_stack.join(" -> ");
            self.error(
                ErrorCode::E102,
                format!("include cycle: {chain} -> {path}"),
                &scalar.location,
            );
            return None;
        }

        let mut included = self.open(&path, Some(&scalar.location))?;
        if !included.enter_document() {
            self.error(
                ErrorCode::E103,
                format!("included file '{path}' is empty"),
                &scalar.location,
            );
            return None;
        }
        log::trace!("Including '{path}'");
        self.include_stack.push(path);
        let result = parse(self, &mut included);
        self.include_stack.pop();
        result
    }

    fn at_include(cursor: &EventCursor) -> bool {
        cursor
            .peek_tag()
            .is_some_and(|tag| tag.is_local() && tag.suffix == "Include")
    }

    /// Reads the remaining `key: value` entries of a mapping whose start
    /// event was consumed, including the end event.
    ///
    /// `handle` consumes the value of a key it knows and returns `true`;
    /// keys it rejects are reported with a suggestion from `known`.
    /// Returns the keys that were present.
    fn parse_entries(
        &mut self,
        cursor: &mut EventCursor,
        context: &str,
        known: &[&str],
        mut handle: impl FnMut(&mut Self, &mut EventCursor, &ScalarEvent) -> bool,
    ) -> HashSet<String> {
        let mut seen = HashSet::new();
        loop {
            if cursor.at_mapping_end() {
                cursor.next();
                break;
            }
            if cursor.peek().is_none() {
                break;
            }
            if !cursor.at_scalar() || cursor.peek_tag().is_some() {
                let location = cursor.current_location();
                self.error(
                    ErrorCode::E103,
                    format!("keys of {context} must be plain strings"),
                    &location,
                );
                cursor.skip_node();
                cursor.skip_node();
                continue;
            }
            let Some(key) = cursor.next_scalar() else {
                break;
            };
            if !seen.insert(key.value.clone()) {
                self.error(
                    ErrorCode::E106,
                    format!("duplicate key `{}` in {context}", key.value),
                    &key.location,
                );
                cursor.skip_node();
                continue;
            }
            if !handle(self, cursor, &key) {
                let mut diagnostic = Diagnostic::error(
                    ErrorCode::E105,
                    format!("unknown key `{}` in {context}", key.value),
                )
                .at(&key.location);
                if let Some(suggestion) = did_you_mean(&key.value, known.iter().copied()) {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                self.report(diagnostic);
                cursor.skip_node();
            }
        }
        seen
    }

    /// Reports a missing required key unless it was present (and already
    /// reported as malformed).
    fn require<T>(
        &mut self,
        value: Option<T>,
        seen: &HashSet<String>,
        key: &str,
        context: &str,
        location: &SourceLocation,
    ) -> Option<T> {
        if value.is_none() && !seen.contains(key) {
            self.error(
                ErrorCode::E107,
                format!("missing required key `{key}` in {context}"),
                location,
            );
        }
        value
    }

    /// A literal string value.
    fn parse_string(&mut self, cursor: &mut EventCursor, key: &str) -> Option<String> {
        if !cursor.at_scalar() {
            self.unexpected(cursor, &format!("a string for `{key}`"));
            return None;
        }
        if let Some(tag) = cursor.peek_tag() {
            if !(tag.is_core_schema() && tag.suffix == "str") {
                let location = cursor.current_location();
                self.error(
                    ErrorCode::E103,
                    format!("`{key}` must be a literal string, not `{tag}`"),
                    &location,
                );
                cursor.skip_node();
                return None;
            }
        }
        cursor.next_scalar().map(|scalar| scalar.value)
    }

    fn parse_bool(&mut self, cursor: &mut EventCursor, key: &str) -> Option<bool> {
        let location = cursor.current_location();
        let text = self.parse_string(cursor, key)?;
        let value = literals::parse_bool(&text);
        if value.is_none() {
            self.error(
                ErrorCode::E103,
                format!("`{key}` must be a boolean, found `{text}`"),
                &location,
            );
        }
        value
    }

    /// A list of literal strings. A single scalar counts as a one-element
    /// list; with `split_commas` it is split on `,` instead.
    fn parse_string_list(
        &mut self,
        cursor: &mut EventCursor,
        key: &str,
        split_commas: bool,
    ) -> Option<Vec<String>> {
        if cursor.at_scalar() {
            let text = self.parse_string(cursor, key)?;
            return Some(if split_commas {
                text.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                vec![text]
            });
        }
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.unexpected(cursor, &format!("a list of strings for `{key}`"));
            return None;
        }
        cursor.next();
        let mut items = Vec::new();
        let mut valid = true;
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            match self.parse_string(cursor, key) {
                Some(item) => items.push(item),
                None => valid = false,
            }
        }
        cursor.next();
        valid.then_some(items)
    }
}
