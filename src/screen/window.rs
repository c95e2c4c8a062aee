//! Per-window state.

use crate::screen::{CellStyle, Color};
use crate::wordwrap::WordWrapper;

/// One Z-Machine window: geometry, cursor, margins, styles and colours,
/// plus the bookkeeping the screen layer needs for \[MORE\] pagination and
/// history-driven refreshes.
#[derive(Debug)]
pub struct Window {
    /// Top-left position on screen, 1-based
    pub(crate) ypos: i32,
    pub(crate) xpos: i32,
    pub(crate) ysize: i32,
    pub(crate) xsize: i32,
    /// Cursor within the window, 1-based
    pub(crate) ycursorpos: i32,
    pub(crate) xcursorpos: i32,
    pub(crate) leftmargin: i32,
    pub(crate) rightmargin: i32,
    /// Style and colours as set by the story
    pub(crate) text_style: CellStyle,
    pub(crate) foreground: Color,
    pub(crate) background: Color,
    /// Style and colours in effect for output currently leaving the wrapper
    pub(crate) output_text_style: CellStyle,
    pub(crate) output_foreground: Color,
    pub(crate) output_background: Color,
    /// Does the window scroll at the bottom?
    pub(crate) wrapping: bool,
    /// Is output word-wrapped through the wrapper?
    pub(crate) buffering: bool,
    /// Line counter driving the \[MORE\] prompt
    pub(crate) nof_consecutive_lines_output: i32,
    /// Rows protected at the bottom/top during a refresh
    pub(crate) lowermargin: i32,
    pub(crate) uppermargin: i32,
    /// Refresh bookkeeping: -1 when inactive
    pub(crate) remaining_lines_to_fill: i32,
    pub(crate) lines_to_skip: i32,
    /// Buffer line number shown at the top of the window; equals `ysize`
    /// when no scroll-back is active
    pub(crate) scrollback_top_line: i32,
    pub(crate) wrapper: WordWrapper,
}

impl Window {
    pub(crate) fn new(foreground: Color, background: Color, hyphenate: bool) -> Window {
        Window {
            ypos: 1,
            xpos: 1,
            ysize: 0,
            xsize: 0,
            ycursorpos: 1,
            xcursorpos: 1,
            leftmargin: 0,
            rightmargin: 0,
            text_style: CellStyle::new(),
            foreground,
            background,
            output_text_style: CellStyle::new(),
            output_foreground: foreground,
            output_background: background,
            wrapping: false,
            buffering: false,
            nof_consecutive_lines_output: 0,
            lowermargin: 0,
            uppermargin: 0,
            remaining_lines_to_fill: -1,
            lines_to_skip: -1,
            scrollback_top_line: 0,
            wrapper: WordWrapper::new(1, hyphenate),
        }
    }

    /// Width available for wrapped content
    pub(crate) fn content_width(&self) -> i32 {
        self.xsize - self.leftmargin - self.rightmargin
    }

    pub fn cursor(&self) -> (i32, i32) {
        (self.ycursorpos, self.xcursorpos)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.ysize, self.xsize)
    }

    pub fn position(&self) -> (i32, i32) {
        (self.ypos, self.xpos)
    }

    pub fn margins(&self) -> (i32, i32) {
        (self.leftmargin, self.rightmargin)
    }

    /// The style last set by the story for this window
    pub fn text_style(&self) -> CellStyle {
        self.text_style
    }

    /// The colours last set by the story for this window
    pub fn colors(&self) -> (Color, Color) {
        (self.foreground, self.background)
    }
}
