//! Positioned error messages
//!
//! Tracks line and column of document characters and keeps a short ring of
//! recently fed codepoints (document and replacement text alike) to show as
//! context.

use std::collections::VecDeque;

use crate::core::chars::{describe, to_char, Codepoint, EOF, LF};

const CONTEXT_WIDTH: usize = 32;

#[derive(Debug)]
pub struct Position {
    ring: VecDeque<Codepoint>,
    line: usize,
    column: usize,
    after_newline: bool,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            ring: VecDeque::with_capacity(CONTEXT_WIDTH),
            line: 1,
            column: 0,
            after_newline: false,
        }
    }
}

impl Position {
    /// Record a codepoint taken from a source; only document characters move
    /// the line and column counters
    pub fn record(&mut self, cp: Codepoint, from_document: bool) {
        if from_document {
            if self.after_newline {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.after_newline = cp == LF;
        }
        if self.ring.len() == CONTEXT_WIDTH {
            self.ring.pop_front();
        }
        self.ring.push_back(cp);
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Recent input on the current line, excluding `offending` when it is
    /// the last recorded codepoint
    fn context(&self, offending: Codepoint) -> String {
        let mut recent: Vec<Codepoint> = self.ring.iter().copied().collect();
        if recent.last() == Some(&offending) {
            recent.pop();
        }
        let start = recent.iter().rposition(|&cp| cp == LF).map_or(0, |i| i + 1);
        recent[start..].iter().map(|&cp| to_char(cp)).collect()
    }

    /// Build the message for an expectation failure on `offending`
    pub fn describe_failure(&self, stage: &str, offending: Codepoint, expectation: &str) -> String {
        let context = self.context(offending);
        if offending == EOF {
            return format!(
                "{} failed at end of input, line {}, column {}:\n{}\nExpected {}.",
                stage, self.line, self.column, context, expectation
            );
        }
        format!(
            "{} failed at 0x{:X}, line {}, column {}:\n{}{}\nExpected {}.",
            stage,
            offending,
            self.line,
            self.column,
            context,
            describe(offending),
            expectation
        )
    }
}
