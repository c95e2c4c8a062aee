//! Paragraph-addressable output history.
//!
//! Everything written to window 0 is recorded here, unwrapped, with style
//! and colour changes interleaved. The screen layer replays paragraphs
//! through the window's wrapper to repaint regions after a resize, an
//! explicit refresh or while the user scrolls back; because the stored text
//! is unwrapped, a replay at a new width re-wraps correctly.

use std::collections::VecDeque;

use crate::screen::Color;

const DEFAULT_PARAGRAPH_CAPACITY: usize = 1000;

/// One recorded unit of output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Span {
    /// A run of characters without line breaks
    Text(Vec<char>),
    /// A style change
    Style(u8),
    /// A colour change
    Colours(Color, Color),
}

/// A newline-delimited paragraph of recorded output
#[derive(Clone, Debug, Default)]
pub struct Paragraph {
    spans: Vec<Span>,
}

impl Paragraph {
    /// A paragraph with pending metadata but no text does not count as
    /// rewindable content.
    fn is_empty(&self) -> bool {
        !self
            .spans
            .iter()
            .any(|s| matches!(s, Span::Text(t) if !t.is_empty()))
    }

    fn push_text(&mut self, text: &[char]) {
        if text.is_empty() {
            return;
        }
        if let Some(Span::Text(existing)) = self.spans.last_mut() {
            existing.extend_from_slice(text);
        } else {
            self.spans.push(Span::Text(text.to_vec()));
        }
    }
}

/// The output history store: completed paragraphs plus the open tail
/// paragraph still being written.
#[derive(Debug)]
pub struct OutputHistory {
    completed: VecDeque<Paragraph>,
    open: Paragraph,
    capacity: usize,
}

impl Default for OutputHistory {
    fn default() -> Self {
        OutputHistory::new(DEFAULT_PARAGRAPH_CAPACITY)
    }
}

impl OutputHistory {
    pub fn new(capacity: usize) -> OutputHistory {
        OutputHistory {
            completed: VecDeque::new(),
            open: Paragraph::default(),
            capacity,
        }
    }

    /// Record output text, splitting paragraphs at newlines.
    pub fn record_text(&mut self, text: &[char]) {
        let mut rest = text;
        while let Some(newline) = rest.iter().position(|&c| c == '\n') {
            self.open.push_text(&rest[..newline]);
            let paragraph = std::mem::take(&mut self.open);
            if self.completed.len() == self.capacity {
                self.completed.pop_front();
            }
            self.completed.push_back(paragraph);
            rest = &rest[newline + 1..];
        }
        self.open.push_text(rest);
    }

    /// Record a style change.
    pub fn record_style(&mut self, style: u8) {
        self.open.spans.push(Span::Style(style));
    }

    /// Record a colour change.
    pub fn record_colours(&mut self, foreground: Color, background: Color) {
        self.open.spans.push(Span::Colours(foreground, background));
    }

    /// Number of rewindable paragraphs, the open tail included when it has
    /// content.
    pub fn paragraph_count(&self) -> usize {
        self.completed.len() + usize::from(!self.open.is_empty())
    }

    /// A replay cursor positioned at the tail (nothing left to repeat).
    pub fn cursor_at_tail(&self) -> HistoryCursor {
        HistoryCursor {
            index: self.paragraph_count(),
            rewound_newline_terminated: false,
        }
    }

    fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        if index < self.completed.len() {
            self.completed.get(index)
        } else if index == self.completed.len() && !self.open.is_empty() {
            Some(&self.open)
        } else {
            None
        }
    }

    fn is_terminated(&self, index: usize) -> bool {
        index < self.completed.len()
    }
}

/// Result of a rewind: either the cursor moved one paragraph back, or the
/// oldest recorded paragraph had already been reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewindOutcome {
    Rewound,
    TopHit,
}

/// Result of a repeat: either all requested paragraphs were produced, or
/// the newest end of the history was hit first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatOutcome {
    Repeated,
    EndHit,
}

/// A cursor into the output history, owned by the screen layer only while a
/// refresh or scroll-back is in progress.
#[derive(Clone, Debug)]
pub struct HistoryCursor {
    index: usize,
    rewound_newline_terminated: bool,
}

impl HistoryCursor {
    /// Move one paragraph towards the oldest output.
    pub fn rewind_paragraph(&mut self, history: &OutputHistory) -> RewindOutcome {
        if self.index == 0 {
            RewindOutcome::TopHit
        } else {
            self.index -= 1;
            self.rewound_newline_terminated = history.is_terminated(self.index);
            RewindOutcome::Rewound
        }
    }

    /// Was the most recently rewound paragraph terminated by a newline in
    /// the buffer (as opposed to being the open tail)?
    pub fn rewound_paragraph_was_newline_terminated(&self) -> bool {
        self.rewound_newline_terminated
    }

    /// Collect `count` paragraphs forward from the cursor. With
    /// `want_newlines`, a line break is produced between paragraphs (never
    /// after the last). With `advance`, the cursor ends past the repeated
    /// paragraphs; otherwise it stays put so the same region can be
    /// rewound over again.
    pub fn repeat_paragraphs(
        &mut self,
        history: &OutputHistory,
        count: usize,
        want_newlines: bool,
        advance: bool,
    ) -> (Vec<Span>, RepeatOutcome) {
        let mut spans = Vec::new();
        let mut outcome = RepeatOutcome::Repeated;
        let mut index = self.index;
        for n in 0..count {
            match history.paragraph(index) {
                Some(paragraph) => {
                    if n > 0 && want_newlines {
                        spans.push(Span::Text(vec!['\n']));
                    }
                    spans.extend(paragraph.spans.iter().cloned());
                    index += 1;
                }
                None => {
                    outcome = RepeatOutcome::EndHit;
                    break;
                }
            }
        }
        if advance {
            self.index = index;
        }
        (spans, outcome)
    }

    /// Is the cursor at the newest end of the history, with nothing left to
    /// repeat?
    pub fn is_at_frontindex(&self, history: &OutputHistory) -> bool {
        self.index >= history.paragraph_count()
    }
}
