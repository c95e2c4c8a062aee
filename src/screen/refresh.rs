//! History-driven refresh of window 0.
//!
//! A refresh repaints the strip `[y_refresh_top .. y_refresh_top+y_size-1]`
//! of window 0 by replaying the output history. The screen layer keeps a
//! screen-line cursor (`current_history_screen_line`, "chsl"): how many
//! lines above the bottom of the logical text buffer the history cursor is
//! currently pointing at, 0 meaning "just below the bottom, nothing shown".
//! Every call classifies the cursor position against the strip's buffer-line
//! bounds and either measures paragraphs by dry-running them through the
//! wrapper (case 0), paints upward from the strip's bottom line (case 1),
//! fills downward then recurses on the strip above (case 2), or skips
//! already-shown rows and fills forward (case 3). Upper and lower margins
//! protect the rest of the window while a paragraph scrolls during replay.

use crate::error::{ErrorCode, RuntimeError};
use crate::fatal_error;
use crate::history::{RepeatOutcome, RewindOutcome, Span};
use crate::wordwrap::Metadata;

use super::{CellStyle, Screen};

impl Screen {
    /// Point the history cursor at the tail of the output history.
    pub(crate) fn init_output_history(&mut self) {
        if self.history_cursor.take().is_some() {
            trace!(target: "app::history", "Discarding history cursor");
            self.current_history_hit_top = false;
        }
        self.history_cursor = Some(self.history.cursor_at_tail());
        self.current_history_screen_line = 0;
    }

    /// Drop the history cursor; replay would no longer match the screen
    /// once new output arrives.
    pub(crate) fn destroy_history_cursor(&mut self) {
        if self.history_cursor.take().is_some() {
            trace!(target: "app::history", "Destroying history cursor");
            self.current_history_screen_line = -1;
            self.current_history_hit_top = false;
        }
    }

    fn rewind_history_paragraph(&mut self) -> Result<RewindOutcome, RuntimeError> {
        let mut cursor = match self.history_cursor.take() {
            Some(c) => c,
            None => {
                return fatal_error!(
                    ErrorCode::HistoryInconsistent,
                    "{}",
                    self.locale.aborted_message("rewind_paragraph")
                )
            }
        };
        let outcome = cursor.rewind_paragraph(&self.history);
        self.history_cursor = Some(cursor);
        Ok(outcome)
    }

    /// Replay paragraphs at the cursor through window 0's wrapper. With
    /// `advance` false the cursor stays put, so the same paragraph can be
    /// rewound over again by the caller.
    fn replay_history_paragraphs(
        &mut self,
        count: usize,
        want_newlines: bool,
        advance: bool,
    ) -> Result<RepeatOutcome, RuntimeError> {
        let mut cursor = match self.history_cursor.take() {
            Some(c) => c,
            None => {
                return fatal_error!(
                    ErrorCode::HistoryInconsistent,
                    "{}",
                    self.locale.aborted_message("repeat_paragraphs")
                )
            }
        };
        let (spans, outcome) =
            cursor.repeat_paragraphs(&self.history, count, want_newlines, advance);
        self.history_cursor = Some(cursor);

        self.replaying_history = true;
        let result = self.feed_replay(spans);
        self.replaying_history = false;
        result?;
        Ok(outcome)
    }

    fn feed_replay(&mut self, spans: Vec<Span>) -> Result<(), RuntimeError> {
        for span in spans {
            match span {
                Span::Text(text) => {
                    let emissions = self.windows[0].wrapper.wrap(&text);
                    self.route_emissions(0, emissions)?;
                }
                Span::Style(style) => self.windows[0]
                    .wrapper
                    .insert_metadata(Metadata::Style(style)),
                Span::Colours(foreground, background) => self.windows[0]
                    .wrapper
                    .insert_metadata(Metadata::Colours(foreground, background)),
            }
        }
        Ok(())
    }

    fn rewound_paragraph_was_newline_terminated(&self) -> bool {
        self.history_cursor
            .as_ref()
            .map(|c| c.rewound_paragraph_was_newline_terminated())
            .unwrap_or(false)
    }

    /// Refresh a strip of window 0 from the output history.
    ///
    /// `y_refresh_top` is in window lines (1 = top of the window regardless
    /// of any scroll-back); a negative `y_size` selects the whole window
    /// height. Returns false when the strip lies (partly) outside the
    /// recorded history; callers clamp scroll-back with this.
    pub(crate) fn refresh_window0(
        &mut self,
        y_size: i32,
        y_refresh_top: i32,
        reset_history: bool,
    ) -> Result<bool, RuntimeError> {
        if reset_history || self.history_cursor.is_none() {
            self.init_output_history();
        }

        if let Some(st) = self.input_state.as_mut() {
            st.y = self.windows[0].ypos + self.windows[0].ysize - 1;
        }

        let last_active = if self.active_window != 0 {
            let last = self.active_window;
            self.switch_to_window(0);
            Some(last)
        } else {
            None
        };
        self.disable_more_prompt = true;
        self.rightmost_y_refresh_curpos = -1;

        debug!(target: "app::history", "refresh_window0 size {} top {} reset {}", y_size, y_refresh_top, reset_history);

        let mut paragraph_diff = 0;
        let result = self.refresh_window0_inner(y_size, y_refresh_top, &mut paragraph_diff)?;

        self.terminal.set_text_style(CellStyle::new());
        self.current_output_text_style = Some(CellStyle::new());
        self.disable_more_prompt = false;
        {
            let w = &mut self.windows[0];
            w.remaining_lines_to_fill = -1;
            w.lines_to_skip = -1;
            w.lowermargin = 0;
            w.uppermargin = 0;
        }

        if let Some(last) = last_active {
            self.switch_to_window(last);
        }

        if self.windows[0].scrollback_top_line <= self.windows[0].ysize {
            if self.input_state.is_some() {
                // Input position was re-anchored while replaying the tail
                self.refresh_input_line()?;
            } else {
                let rightmost = self.rightmost_y_refresh_curpos;
                let w = &mut self.windows[0];
                w.ycursorpos = w.ysize;
                if rightmost >= 1 {
                    w.xcursorpos = rightmost - (w.xpos - 1);
                }
            }
        }

        trace!(target: "app::history", "refresh_window0 -> {} (chsl {}, top {})",
            result, self.current_history_screen_line, self.windows[0].scrollback_top_line);
        Ok(result)
    }

    fn refresh_window0_inner(
        &mut self,
        y_size: i32,
        y_refresh_top: i32,
        paragraph_diff: &mut i32,
    ) -> Result<bool, RuntimeError> {
        let mut y_size = y_size;
        if y_size == 0 {
            return Ok(false);
        }
        if y_size < 0 {
            y_size = self.windows[0].ysize;
        }
        if y_size < 1 {
            // A zero-height window has nothing to refresh
            return Ok(false);
        }

        let ysize = self.windows[0].ysize;
        if y_refresh_top < 1 || y_refresh_top > ysize || y_refresh_top - 1 + y_size > ysize {
            return fatal_error!(
                ErrorCode::GeometryViolation,
                "{}: strip {}+{} outside window height {}",
                self.locale.aborted_message("refresh_window0"),
                y_refresh_top,
                y_size,
                ysize
            );
        }

        let chsl = self.current_history_screen_line;
        let scrollback_top = self.windows[0].scrollback_top_line;
        let b_lo = scrollback_top - (y_refresh_top - 1) - y_size;
        let b_hi = scrollback_top - (y_refresh_top - 1);
        trace!(target: "app::history", "refresh strip {}..{} chsl {} bounds {}..{}",
            y_refresh_top, y_refresh_top + y_size - 1, chsl, b_lo, b_hi);

        let mut my_paragraph_diff = 0;

        let result = if chsl < b_lo {
            // Case 0: the cursor points below the strip. The height of the
            // paragraph above it is unknown, so measure it with a dry run
            // (everything skipped), then reclassify.
            trace!(target: "app::history", "case 0");
            match self.rewind_history_paragraph()? {
                RewindOutcome::TopHit => {
                    self.current_history_hit_top = true;
                    false
                }
                RewindOutcome::Rewound => {
                    my_paragraph_diff -= 1;
                    {
                        let w = &mut self.windows[0];
                        w.lines_to_skip = i32::MAX;
                        w.nof_consecutive_lines_output = 0;
                        w.wrapper.set_line_index(0);
                        w.xcursorpos = 1 + w.leftmargin;
                    }
                    let outcome = self.replay_history_paragraphs(1, true, false)?;
                    self.flush_window(0)?;
                    if outcome == RepeatOutcome::EndHit && self.current_history_screen_line != 0 {
                        return fatal_error!(
                            ErrorCode::HistoryInconsistent,
                            "{}: history end at line {}",
                            self.locale.aborted_message("repeat_paragraphs"),
                            self.current_history_screen_line
                        );
                    }
                    // The tail paragraph's terminating newline occupies a
                    // screen line of its own; count it here just as case 1
                    // sends it explicitly.
                    if chsl == 0 && self.rewound_paragraph_was_newline_terminated() {
                        self.window_target(0, &['\n'])?;
                    }
                    let lines = self.windows[0].nof_consecutive_lines_output + 1;
                    self.current_history_screen_line += lines;
                    self.windows[0].lines_to_skip = 0;
                    self.refresh_window0_inner(y_size, y_refresh_top, &mut my_paragraph_diff)?
                }
            }
        } else if chsl == b_lo {
            // Case 1: the cursor sits exactly on the strip's bottom bound.
            // Paint the paragraph above it at the strip's bottom line; the
            // lower margin protects everything below while it scrolls.
            trace!(target: "app::history", "case 1");
            {
                let w = &mut self.windows[0];
                w.xcursorpos = 1 + w.leftmargin;
                w.ycursorpos = y_refresh_top + y_size - 1;
                w.lowermargin = w.ysize - (y_refresh_top + (y_size - 1));
                w.nof_consecutive_lines_output = 0;
                w.wrapper.set_line_index(0);
            }
            self.refresh_cursor(0);

            match self.rewind_history_paragraph()? {
                RewindOutcome::TopHit => {
                    self.current_history_hit_top = true;
                    false
                }
                RewindOutcome::Rewound => {
                    self.windows[0].uppermargin = y_refresh_top - 1;
                    let outcome = self.replay_history_paragraphs(1, true, false)?;
                    if outcome == RepeatOutcome::EndHit && self.current_history_screen_line != 0 {
                        return fatal_error!(
                            ErrorCode::HistoryInconsistent,
                            "{}: history end at line {}",
                            self.locale.aborted_message("repeat_paragraphs"),
                            self.current_history_screen_line
                        );
                    }
                    my_paragraph_diff -= 1;
                    self.flush_window(0)?;
                    // Rebuilding from the buffer bottom: a paragraph that
                    // ended with a newline needs that newline sent
                    // explicitly to land the cursor below it.
                    if self.current_history_screen_line == 0
                        && self.rewound_paragraph_was_newline_terminated()
                    {
                        self.window_target(0, &['\n'])?;
                    }
                    self.windows[0].uppermargin = 0;

                    if self.current_history_screen_line == 0 {
                        let w = &self.windows[0];
                        self.rightmost_y_refresh_curpos = w.xpos + w.xcursorpos - 1;
                        let (ypos, ycur, xpos, xcur, xsize, rightmargin) =
                            (w.ypos, w.ycursorpos, w.xpos, w.xcursorpos, w.xsize, w.rightmargin);
                        if let Some(st) = self.input_state.as_mut() {
                            st.y = ypos + ycur - 1;
                            st.x = xpos + xcur - 1;
                            st.display_width = xpos + xsize - st.x - rightmargin;
                        }
                    }

                    let lines = self.windows[0].nof_consecutive_lines_output + 1;
                    self.current_history_screen_line += lines;

                    let nof_relevant_lines = self.current_history_screen_line - b_lo;
                    let mut lines_left = y_size;
                    if nof_relevant_lines > 0 {
                        lines_left -= nof_relevant_lines;
                    }
                    let mut result = true;
                    if lines_left > 0 {
                        result |= self.refresh_window0_inner(
                            lines_left,
                            y_refresh_top,
                            &mut my_paragraph_diff,
                        )?;
                    }
                    result
                }
            }
        } else if chsl < b_hi {
            // Case 2: the cursor points inside the strip. Fill downward to
            // the strip's bottom, rewind what was advanced, then recurse on
            // the sub-strip above the cursor.
            trace!(target: "app::history", "case 2");
            let original_pos = chsl;
            {
                let w = &mut self.windows[0];
                w.remaining_lines_to_fill = chsl - b_lo;
                w.lowermargin = w.ysize - ((y_refresh_top - 1) + y_size);
                w.ycursorpos = scrollback_top - chsl;
            }

            loop {
                {
                    let w = &mut self.windows[0];
                    w.xcursorpos = 1 + w.leftmargin;
                    w.ycursorpos += 1;
                    w.wrapper.set_line_index(0);
                    w.nof_consecutive_lines_output = 0;
                }
                self.refresh_cursor(0);

                let outcome = self.replay_history_paragraphs(1, true, true)?;
                if outcome == RepeatOutcome::Repeated {
                    my_paragraph_diff += 1;
                }
                self.current_history_hit_top = false;
                self.flush_window(0)?;
                if self.windows[0].remaining_lines_to_fill > 0 {
                    self.windows[0].remaining_lines_to_fill -= 1;
                }
                let lines = self.windows[0].nof_consecutive_lines_output + 1;
                self.current_history_screen_line += lines;

                if self.windows[0].remaining_lines_to_fill < 1
                    || outcome == RepeatOutcome::EndHit
                {
                    break;
                }
            }
            self.windows[0].remaining_lines_to_fill = -1;

            while my_paragraph_diff > 0 {
                self.rewind_history_paragraph()?;
                my_paragraph_diff -= 1;
            }
            self.current_history_screen_line = original_pos;

            self.refresh_window0_inner(
                b_hi - original_pos,
                y_refresh_top,
                &mut my_paragraph_diff,
            )?;
            // Something below the cursor position is always displayable
            true
        } else {
            // Case 3: the cursor points at or above the strip's top bound.
            // Skip the rows above the strip and fill forward.
            trace!(target: "app::history", "case 3");
            {
                let w = &mut self.windows[0];
                w.lowermargin = w.ysize - (y_refresh_top + (y_size - 1));
                w.uppermargin = y_refresh_top - 1;
                w.ycursorpos = w.uppermargin + 1;
                w.xcursorpos = 1 + w.leftmargin;
                w.lines_to_skip = chsl - (scrollback_top - y_refresh_top + 1);
                w.remaining_lines_to_fill = y_size;
            }
            self.refresh_cursor(0);

            while self.windows[0].remaining_lines_to_fill > 0 {
                if self.windows[0].buffering {
                    self.windows[0].wrapper.set_line_index(0);
                }
                self.windows[0].nof_consecutive_lines_output = 0;

                let at_front = match self.history_cursor.as_ref() {
                    Some(cursor) => cursor.is_at_frontindex(&self.history),
                    None => true,
                };
                if at_front {
                    break;
                }

                let outcome = self.replay_history_paragraphs(1, true, true)?;
                self.current_history_hit_top = false;
                self.flush_window(0)?;

                if self.windows[0].lines_to_skip < 1 {
                    {
                        let w = &mut self.windows[0];
                        w.ycursorpos += 1;
                        w.xcursorpos = 1 + w.leftmargin;
                    }
                    self.refresh_cursor(0);
                }

                // Compensate for the missing newline after the paragraph
                {
                    let w = &mut self.windows[0];
                    if w.lines_to_skip > 0 {
                        w.lines_to_skip -= 1;
                    } else if w.remaining_lines_to_fill > 0 {
                        w.remaining_lines_to_fill -= 1;
                    }
                }
                my_paragraph_diff += 1;

                let lines = self.windows[0].nof_consecutive_lines_output + 1;
                self.current_history_screen_line -= lines;
                if outcome == RepeatOutcome::EndHit && self.current_history_screen_line != 0 {
                    return fatal_error!(
                        ErrorCode::HistoryInconsistent,
                        "{}: history end at line {}",
                        self.locale.aborted_message("repeat_paragraphs"),
                        self.current_history_screen_line
                    );
                }
            }
            true
        };

        self.windows[0].uppermargin = 0;
        *paragraph_diff += my_paragraph_diff;
        Ok(result)
    }

    /// Full repaint: window 0 from history, the status line, and the upper
    /// window from its content buffer.
    pub(crate) fn refresh_screen(&mut self) -> Result<(), RuntimeError> {
        self.erase_window(0)?;
        let ysize = self.windows[0].ysize;
        self.refresh_window0(ysize, 1, true)?;

        if self.version <= 3 {
            if let Some((room, mode, p1, p2)) = self.last_status.clone() {
                self.show_status(&room, mode, p1, p2)?;
            }
        }
        self.redraw_upper_window();

        self.update_output_colours(0);
        self.update_output_text_style(0);
        self.refresh_cursor(0);
        self.terminal.redraw_screen_from_scratch();
        Ok(())
    }

    /// Redraw window 1 from the content buffer, batching runs of identical
    /// style and colours.
    fn redraw_upper_window(&mut self) {
        if self.windows.len() < 2 || self.windows[1].ysize < 1 {
            return;
        }
        let ysize = self.windows[1].ysize;
        let limit = self.windows[1].xsize.min(self.blockbuf.width());
        let top = self.windows[1].ypos;

        let first = self.blockbuf.cell(1, 1);
        let mut style = first.style;
        let mut colors = (first.foreground, first.background);
        self.push_run_attributes(style, colors);

        for row in 1..=ysize {
            self.terminal.goto_yx(top + row - 1, 1);
            let mut column = 1;
            while column <= limit {
                let mut run = Vec::new();
                while column <= limit {
                    let cell = self.blockbuf.cell(row, column);
                    if cell.style != style || (cell.foreground, cell.background) != colors {
                        break;
                    }
                    run.push(cell.character);
                    column += 1;
                }
                if !run.is_empty() {
                    self.terminal.output(&run);
                }
                if column <= limit {
                    let cell = self.blockbuf.cell(row, column);
                    style = cell.style;
                    colors = (cell.foreground, cell.background);
                    self.push_run_attributes(style, colors);
                }
            }
        }
    }

    fn push_run_attributes(&mut self, style: u8, colors: (super::Color, super::Color)) {
        let mut cell_style = CellStyle::new();
        cell_style.set(style);
        self.terminal.set_text_style(cell_style);
        self.current_output_text_style = Some(cell_style);
        if self.using_colors {
            self.terminal.set_colors(colors);
            self.current_output_colors = Some(colors);
        }
    }

    /// PAGE_UP / PAGE_DOWN during input: shift the view by half the window
    /// height, reusing still-valid screen content with a copy and
    /// refreshing the newly exposed half from history.
    pub(crate) fn handle_scroll_key(&mut self, up: bool) -> Result<(), RuntimeError> {
        let scroll_area_ysize = self.windows[0].ysize / 2;
        let (xpos, ypos, ysize, xsize) = {
            let w = &self.windows[0];
            (w.xpos, w.ypos, w.ysize, w.xsize)
        };

        if up && !self.current_history_hit_top {
            self.windows[0].scrollback_top_line += scroll_area_ysize;
            debug!(target: "app::history", "Page up to top line {}", self.windows[0].scrollback_top_line);

            let redraw_result = if self.windows[0].ycursorpos != ysize {
                // Cursor not at the bottom: the copy trick would misalign,
                // redraw everything
                self.terminal
                    .clear_area(xpos, ypos, self.screen_width, ysize);
                self.refresh_window0(ysize, 1, true)?
            } else {
                self.terminal.copy_area(
                    ypos + scroll_area_ysize,
                    xpos,
                    ypos,
                    xpos,
                    ysize - scroll_area_ysize,
                    xsize,
                );
                self.terminal
                    .clear_area(xpos, ypos, self.screen_width, scroll_area_ysize);
                self.refresh_window0(scroll_area_ysize, 1, false)?
            };

            if !redraw_result {
                // The exposed half lies outside the history. Clamp the
                // scroll-back and repaint everything; the copy above may
                // have dirtied rows the refresh will not touch.
                self.windows[0].scrollback_top_line -= scroll_area_ysize;
                self.terminal
                    .clear_area(xpos, ypos, self.screen_width, ysize);
                self.refresh_window0(ysize, 1, true)?;
            }
        } else if !up && self.windows[0].scrollback_top_line > ysize {
            self.windows[0].scrollback_top_line -= scroll_area_ysize;
            debug!(target: "app::history", "Page down to top line {}", self.windows[0].scrollback_top_line);
            self.terminal.copy_area(
                ypos,
                xpos,
                ypos + scroll_area_ysize,
                xpos,
                ysize - scroll_area_ysize,
                xsize,
            );
            self.terminal.clear_area(
                xpos,
                ypos + (ysize - scroll_area_ysize),
                self.screen_width,
                scroll_area_ysize,
            );
            self.refresh_window0(scroll_area_ysize, 1 + (ysize - scroll_area_ysize), false)?;
        }

        let scrolled = self.windows[0].scrollback_top_line > self.windows[0].ysize;
        self.terminal.set_cursor_visibility(!scrolled);
        self.terminal.update_screen();
        Ok(())
    }

    /// Snap back to the live view before any non-scrolling key is acted on.
    pub(crate) fn return_to_live_view(&mut self) -> Result<(), RuntimeError> {
        if self.windows[0].scrollback_top_line > self.windows[0].ysize {
            self.erase_window(0)?;
            self.windows[0].scrollback_top_line = self.windows[0].ysize;
            let ysize = self.windows[0].ysize;
            self.refresh_window0(ysize, 1, false)?;
            self.terminal.set_cursor_visibility(true);
            self.terminal.update_screen();
        }
        Ok(())
    }

    /// Re-layout all windows for a new screen size and repaint everything.
    pub fn new_screen_size(&mut self, rows: i32, columns: i32) -> Result<(), RuntimeError> {
        if rows < 1 || columns < 1 || self.windows.is_empty() {
            return Ok(());
        }
        info!(target: "app::screen", "New screen size {}x{}", rows, columns);

        let dy = rows - self.screen_height;
        self.screen_height = rows;
        self.screen_width = columns;
        self.resize_notification = Some((rows, columns));

        let status_offset = i32::from(self.statusline_window_id.is_some());
        if self.windows.len() > 1 {
            let w1 = &mut self.windows[1];
            w1.ysize = self.last_split_window_size.min(rows - status_offset);
            w1.scrollback_top_line = w1.ysize;
        }
        let upper_ysize = if self.windows.len() > 1 {
            self.windows[1].ysize
        } else {
            0
        };

        for i in 0..self.windows.len() {
            if self.version != 6 {
                if i == 0 {
                    let w = &mut self.windows[0];
                    w.xsize = columns;
                    w.ysize = rows - status_offset - upper_ysize;
                    w.scrollback_top_line = w.ysize;
                    w.ycursorpos += dy;
                } else {
                    self.windows[i].xsize = columns;
                }
            }

            let w = &mut self.windows[i];
            w.ypos = w.ypos.min(rows);
            w.xpos = w.xpos.min(columns);
            if w.ypos + w.ysize > rows {
                w.ysize = rows - w.ypos + 1;
                w.scrollback_top_line = w.ysize;
            }
            if w.xpos + w.xsize > columns {
                w.xsize = columns - w.xpos + 1;
            }
            if w.content_width() < 1 {
                // Margins would consume the whole window
                w.leftmargin = 0;
                w.rightmargin = 0;
            }
            let content_width = w.content_width();
            w.wrapper.adjust_line_length(content_width);
            w.ycursorpos = w.ycursorpos.clamp(1, w.ysize.max(1));
            w.xcursorpos = w.xcursorpos.clamp(1, w.xsize.max(1));
        }

        self.blockbuf.resize(columns, rows);
        self.refresh_screen()
    }

    /// A restore changed the output history under us: reset scroll-back,
    /// repaint window 0 from the restored history and home the cursor.
    pub fn game_was_restored_and_history_modified(&mut self) -> Result<(), RuntimeError> {
        if !self.interface_open {
            return Ok(());
        }
        self.flush_all_buffered_windows()?;
        let (xpos, ypos, xsize, ysize) = {
            let w = &mut self.windows[0];
            w.scrollback_top_line = w.ysize;
            (w.xpos, w.ypos, w.xsize, w.ysize)
        };
        self.terminal.clear_area(xpos, ypos, xsize, ysize);
        self.refresh_window0(ysize, 1, true)?;
        self.destroy_history_cursor();
        let w = &mut self.windows[0];
        w.ycursorpos = w.ysize;
        w.xcursorpos = w.leftmargin + 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::screen::{Config, Screen, Story};
    use crate::test_util;
    use crate::{assert_ok, assert_ok_eq, assert_row};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn linked_screen(version: u8) -> Screen {
        let mut screen = Screen::new(Config::default());
        assert_ok!(screen.link_to_story(&Story::new(version)));
        screen
    }

    /// Emit `count` numbered lines in small batches, with a keystroke
    /// between batches so [MORE] never fires.
    fn screen_with_lines(count: usize) -> Screen {
        let mut screen = linked_screen(5);
        let mut emitted = 0;
        while emitted < count {
            let batch = (count - emitted).min(15);
            let mut text = String::new();
            for i in emitted + 1..=emitted + batch {
                text.push_str(&format!("line {}\n", i));
            }
            assert_ok!(screen.output(&chars(&text)));
            emitted += batch;
            test_util::queue_input(" ");
            assert_ok!(screen.read_char(0, None));
        }
        screen
    }

    fn rows() -> Vec<String> {
        (1..=24).map(test_util::row).collect()
    }

    #[test]
    fn test_full_refresh_is_bottom_anchored() {
        let mut screen = screen_with_lines(5);
        // Blank the display without touching any state
        test_util::set_size(24, 80);
        assert_ok_eq!(screen.refresh_window0(24, 1, true), true);
        assert_row!(18, "");
        assert_row!(19, "line 1");
        assert_row!(23, "line 5");
        assert_row!(24, "");
        // Margins and fill counters are cleared on exit
        let w0 = &screen.windows[0];
        assert_eq!(w0.uppermargin, 0);
        assert_eq!(w0.lowermargin, 0);
        assert_eq!(w0.remaining_lines_to_fill, -1);
        assert_eq!(w0.lines_to_skip, -1);
        assert_eq!(w0.cursor(), (24, 1));
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut screen = screen_with_lines(30);
        test_util::clear_printed();
        assert_ok!(screen.refresh_window0(24, 1, true));
        let first_rows = rows();
        let first_printed = test_util::printed();
        test_util::clear_printed();
        assert_ok!(screen.refresh_window0(24, 1, true));
        assert_eq!(rows(), first_rows);
        assert_eq!(test_util::printed(), first_printed);
        assert_row!(1, "line 8");
        assert_row!(23, "line 30");
        assert_row!(24, "");
    }

    #[test]
    fn test_refresh_with_live_cursor_position_repaints_in_place() {
        // A second refresh without resetting the history classifies the
        // cursor inside the strip and must repaint identically.
        let mut screen = screen_with_lines(5);
        assert_ok!(screen.refresh_window0(24, 1, true));
        let before = rows();
        assert_ok!(screen.refresh_window0(24, 1, false));
        assert_eq!(rows(), before);
    }

    #[test]
    fn test_refresh_zero_height_is_noop() {
        let mut screen = screen_with_lines(5);
        assert_ok_eq!(screen.refresh_window0(0, 1, true), false);
    }

    #[test]
    fn test_refresh_outside_window_is_fatal() {
        let mut screen = screen_with_lines(5);
        for (size, top) in [(25, 1), (5, 0), (5, 30), (20, 10)] {
            let result = screen.refresh_window0(size, top, true);
            let error = result.expect_err("geometry violation expected");
            assert_eq!(error.code(), ErrorCode::GeometryViolation);
            assert!(!error.is_recoverable());
        }
    }

    #[test]
    fn test_page_up_shows_older_lines() {
        let mut screen = screen_with_lines(50);
        assert_row!(1, "line 28");
        assert_ok!(screen.handle_scroll_key(true));
        // The still-valid half was copied down, the exposed half refreshed
        assert_row!(1, "line 16");
        assert_row!(12, "line 27");
        assert_row!(13, "line 28");
        assert_row!(24, "line 39");
        assert!(!test_util::cursor_visible());
        assert!(screen.windows[0].scrollback_top_line > screen.windows[0].ysize);
    }

    #[test]
    fn test_page_down_returns_towards_live_view() {
        let mut screen = screen_with_lines(50);
        assert_ok!(screen.handle_scroll_key(true));
        assert_ok!(screen.handle_scroll_key(false));
        assert_row!(1, "line 28");
        assert_row!(23, "line 50");
        assert_row!(24, "");
        assert!(test_util::cursor_visible());
        assert_eq!(screen.windows[0].scrollback_top_line, 24);
    }

    #[test]
    fn test_keystroke_snaps_back_to_live_view() {
        let mut screen = screen_with_lines(50);
        assert_ok!(screen.handle_scroll_key(true));
        test_util::queue_input("y");
        assert_ok_eq!(screen.read_char(0, None), b'y');
        assert_row!(1, "line 28");
        assert_row!(23, "line 50");
        assert_row!(24, "");
        assert!(test_util::cursor_visible());
    }

    #[test]
    fn test_page_up_stops_at_history_top() {
        let mut screen = screen_with_lines(30);
        assert_ok!(screen.handle_scroll_key(true));
        // Scrolled to the very top: blank lead-in, then the oldest lines
        assert_row!(5, "");
        assert_row!(6, "line 1");
        assert_row!(12, "line 7");
        assert_row!(13, "line 8");
        assert!(screen.current_history_hit_top);
        let scrolled = rows();
        // Further page-ups are refused once the top was reached
        assert_ok!(screen.handle_scroll_key(true));
        assert_eq!(rows(), scrolled);
    }

    #[test]
    fn test_page_up_clamps_when_history_runs_out() {
        let mut screen = screen_with_lines(10);
        assert_ok!(screen.refresh_window0(24, 1, true));
        let live = rows();
        // Nothing at all fits into the exposed half; the view must revert
        assert_ok!(screen.handle_scroll_key(true));
        assert_eq!(rows(), live);
        assert_eq!(screen.windows[0].scrollback_top_line, 24);
        assert!(test_util::cursor_visible());
    }

    #[test]
    fn test_resize_repaints_from_history() {
        let mut screen = screen_with_lines(30);
        test_util::set_size(30, 100);
        assert_ok!(screen.new_screen_size(30, 100));
        assert_eq!(screen.rows(), 30);
        assert_eq!(screen.columns(), 100);
        let w0 = &screen.windows[0];
        assert_eq!(w0.size(), (30, 100));
        assert_eq!(w0.scrollback_top_line, 30);
        assert_eq!(w0.wrapper.line_length(), 100);
        assert_row!(1, "line 2");
        assert_eq!(test_util::row(29), "line 30");
        assert_eq!(test_util::row(30), "");
        assert_eq!(screen.take_resize_notification(), Some((30, 100)));
        assert_eq!(screen.take_resize_notification(), None);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut screen = screen_with_lines(20);
        test_util::set_size(30, 100);
        assert_ok!(screen.new_screen_size(30, 100));
        let first: Vec<String> = (1..=30).map(test_util::row).collect();
        assert_ok!(screen.new_screen_size(30, 100));
        let second: Vec<String> = (1..=30).map(test_util::row).collect();
        assert_eq!(second, first);
    }

    #[test]
    fn test_resize_forces_margins_off_when_too_wide() {
        let mut screen = Screen::new(Config::new(4, 4, false, false));
        assert_ok!(screen.link_to_story(&Story::new(5)));
        assert_eq!(screen.windows[0].margins(), (4, 4));
        test_util::set_size(24, 7);
        assert_ok!(screen.new_screen_size(24, 7));
        assert_eq!(screen.windows[0].margins(), (0, 0));
        assert!(screen.windows[0].wrapper.line_length() >= 1);
    }

    #[test]
    fn test_refresh_screen_redraws_upper_window() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.split_window(2));
        assert_ok!(screen.set_window(1));
        assert_ok!(screen.output(&chars("STATUS")));
        assert_ok!(screen.set_window(0));
        assert_ok!(screen.output(&chars("line 1\nline 2\nline 3\n")));
        // Blank the display, then rebuild everything
        test_util::set_size(24, 80);
        assert_ok!(screen.refresh_screen());
        assert_row!(1, "STATUS");
        assert_row!(23, "line 3");
        assert_row!(24, "");
    }

    #[test]
    fn test_refresh_screen_redraws_status_line() {
        let mut screen = linked_screen(3);
        assert_ok!(screen.show_status(
            &chars("Library"),
            crate::screen::StatusMode::ScoreAndTurn,
            1,
            2
        ));
        assert_ok!(screen.output(&chars("reading\n")));
        test_util::set_size(24, 80);
        assert_ok!(screen.refresh_screen());
        assert!(test_util::row(1).starts_with(" Library"));
        assert!(test_util::row(1).ends_with("Score: 1  Turns: 2"));
    }

    #[test]
    fn test_game_was_restored_repaints_and_homes_cursor() {
        let mut screen = screen_with_lines(10);
        assert_ok!(screen.game_was_restored_and_history_modified());
        assert_row!(14, "line 1");
        assert_row!(23, "line 10");
        assert_row!(24, "");
        assert_eq!(screen.windows[0].cursor(), (24, 1));
        assert!(screen.history_cursor.is_none());
    }

    #[test]
    fn test_winch_interrupts_more_and_repaints() {
        let mut screen = linked_screen(5);
        let mut text = String::new();
        for i in 1..=30 {
            text.push_str(&format!("line {}\n", i));
        }
        test_util::queue_event(crate::screen::Event::Winch);
        assert_ok!(screen.output(&chars(&text)));
        // The remainder of the paragraph was abandoned at the prompt
        assert!(screen.winch_pending);
        // The next input repaints everything from the recorded history
        test_util::queue_input("x");
        assert_ok_eq!(screen.read_char(0, None), b'x');
        assert!(!screen.winch_pending);
        assert_row!(1, "line 8");
        assert_row!(23, "line 30");
        assert_row!(24, "");
    }
}
