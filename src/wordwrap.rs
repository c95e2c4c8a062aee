//! Word wrapping for buffered windows.
//!
//! Each buffered window owns one wrapper. Text submitted with [`WordWrapper::wrap`]
//! is buffered until a line decision can be made; completed lines come back as
//! a stream of [`WrapEmission`] values which the caller routes to the window
//! target. Style and colour changes are inserted as metadata and re-emitted at
//! the exact character position where the wrapper places them, which may be
//! well after the position where they were submitted.

use crate::screen::Color;

/// Style or colour change riding along with wrapped text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metadata {
    Style(u8),
    Colours(Color, Color),
}

/// One unit of wrapper output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WrapEmission {
    /// A run of characters; line breaks appear as `\n`
    Text(Vec<char>),
    /// A style change taking effect before the next text run
    Style(u8),
    /// A colour change taking effect before the next text run
    Colours(Color, Color),
}

impl Metadata {
    fn into_emission(self) -> WrapEmission {
        match self {
            Metadata::Style(style) => WrapEmission::Style(style),
            Metadata::Colours(foreground, background) => {
                WrapEmission::Colours(foreground, background)
            }
        }
    }
}

#[derive(Debug)]
pub struct WordWrapper {
    line_length: i32,
    /// Characters already on the current output line (prompt text etc.)
    chars_on_line: i32,
    buffer: Vec<char>,
    /// Pending metadata, positioned by offset into `buffer`
    metadata: Vec<(usize, Metadata)>,
    hyphenate: bool,
}

impl WordWrapper {
    pub fn new(line_length: i32, hyphenate: bool) -> WordWrapper {
        WordWrapper {
            line_length: line_length.max(1),
            chars_on_line: 0,
            buffer: Vec::new(),
            metadata: Vec::new(),
            hyphenate,
        }
    }

    pub fn line_length(&self) -> i32 {
        self.line_length
    }

    /// Submit text, returning any emissions that became ready.
    pub fn wrap(&mut self, input: &[char]) -> Vec<WrapEmission> {
        let mut out = Vec::new();
        for &c in input {
            if c == '\n' {
                self.emit_line(self.buffer.len(), 0, true, false, &mut out);
                continue;
            }
            self.buffer.push(c);
            while self.chars_on_line + self.buffer.len() as i32 > self.line_length {
                self.break_line(&mut out);
            }
        }
        out
    }

    /// Flush the buffered partial line without a trailing line break.
    pub fn flush(&mut self) -> Vec<WrapEmission> {
        let mut out = Vec::new();
        self.emit_line(self.buffer.len(), 0, false, true, &mut out);
        out
    }

    /// Queue a style or colour change at the current buffer position.
    pub fn insert_metadata(&mut self, metadata: Metadata) {
        self.metadata.push((self.buffer.len(), metadata));
    }

    /// Tell the wrapper how many characters are already on the output line.
    pub fn set_line_index(&mut self, index: i32) {
        self.chars_on_line = index.max(0);
    }

    /// Change the wrap width, re-breaking any buffered overflow.
    pub fn adjust_line_length(&mut self, line_length: i32) {
        self.line_length = line_length.max(1);
        // The buffer may now be overlong; resolving it here keeps wrap()'s
        // one-break-per-character invariant intact.
        let mut out = Vec::new();
        while self.chars_on_line + self.buffer.len() as i32 > self.line_length {
            self.break_line(&mut out);
        }
        // Re-broken text is dropped on the floor on purpose: callers flush
        // before any resize, so the buffer is empty in practice.
        if !out.is_empty() {
            warn!(target: "app::screen", "Wrapper re-break with non-empty buffer discarded output");
        }
    }

    /// Break the overlong buffered line: at the last space, else (with
    /// hyphenation on) after the last hyphen, else hard at the line edge.
    fn break_line(&mut self, out: &mut Vec<WrapEmission>) {
        if let Some(space) = self.buffer.iter().rposition(|&c| c == ' ') {
            self.emit_line(space, 1, true, false, out);
        } else if self.hyphenate && self.buffer.len() > 1 {
            match self.buffer[..self.buffer.len() - 1]
                .iter()
                .rposition(|&c| c == '-')
            {
                Some(hyphen) => self.emit_line(hyphen + 1, 0, true, false, out),
                None => self.emit_line(self.buffer.len() - 1, 0, true, false, out),
            }
        } else {
            self.emit_line(self.buffer.len() - 1, 0, true, false, out);
        }
    }

    /// Emit `buffer[..length]` with its metadata interleaved at the recorded
    /// offsets, optionally followed by a line break. `consume_extra`
    /// characters after the emitted text are dropped (the break space).
    fn emit_line(
        &mut self,
        length: usize,
        consume_extra: usize,
        line_break: bool,
        flush_trailing: bool,
        out: &mut Vec<WrapEmission>,
    ) {
        let consumed = (length + consume_extra).min(self.buffer.len());
        let mut kept = Vec::new();
        let mut text: Vec<char> = Vec::new();
        let mut pos = 0;
        for (offset, metadata) in std::mem::take(&mut self.metadata) {
            if offset < length || (flush_trailing && offset <= length) {
                if offset > pos {
                    text.extend(&self.buffer[pos..offset]);
                    pos = offset;
                }
                if !text.is_empty() {
                    out.push(WrapEmission::Text(std::mem::take(&mut text)));
                }
                out.push(metadata.into_emission());
            } else {
                kept.push((offset.saturating_sub(consumed), metadata));
            }
        }
        text.extend(&self.buffer[pos..length]);
        if line_break {
            text.push('\n');
        }
        if !text.is_empty() {
            out.push(WrapEmission::Text(text));
        }
        self.buffer.drain(..consumed);
        self.metadata = kept;
        if line_break {
            self.chars_on_line = 0;
        } else {
            self.chars_on_line += length as i32;
        }
    }
}
