//! Line input editor and single-key input.
//!
//! `read_line` runs the backend event loop: printable keys edit the buffer
//! with horizontal scrolling, cursor keys move or recall command history,
//! PAGE_UP/PAGE_DOWN scroll back through the output history, and timed
//! input ticks a verification callback. `read_char` shares the event model
//! with a reduced key mapping.

use crate::error::{ErrorCode, RuntimeError};
use crate::recoverable_error;
use crate::zscii::{
    ZSCII_CURSOR_DOWN, ZSCII_CURSOR_LEFT, ZSCII_CURSOR_RIGHT, ZSCII_CURSOR_UP, ZSCII_DELETE,
    ZSCII_FORWARD_DELETE,
};

use super::{Event, Screen};

const CTRL_L: char = '\u{0c}';
const CTRL_R: char = '\u{12}';

/// The interpreter-side callback for timed input.
///
/// The routine runs inside the interpreter; any text it printed comes back
/// in the outcome so the screen layer can flush it and repaint the input
/// line before waiting again.
pub trait InputVerifier {
    fn invoke(&mut self) -> VerifyOutcome;
}

/// Outcome of one verification callback
#[derive(Clone, Debug, Default)]
pub struct VerifyOutcome {
    /// The routine's return value; non-zero terminates the read
    pub retval: u16,
    /// Text the routine printed while it ran
    pub output: Vec<char>,
    /// The interpreter asked to shut down
    pub terminate: bool,
}

/// Editor state, live only while `read_line` runs
#[derive(Debug)]
pub(crate) struct InputState {
    pub buffer: Vec<char>,
    /// Cursor index within the buffer
    pub index: usize,
    /// Leftmost visible buffer index
    pub scroll_x: usize,
    /// Width of the editable strip on screen
    pub display_width: i32,
    /// Screen column of the strip's left edge
    pub x: i32,
    /// Screen row of the input line
    pub y: i32,
}

impl InputState {
    /// The buffer slice currently visible in the editable strip
    fn visible(&self) -> Vec<char> {
        let width = self.display_width.max(0) as usize;
        let end = self.buffer.len().min(self.scroll_x + width);
        self.buffer[self.scroll_x.min(end)..end].to_vec()
    }
}

impl Screen {
    /// Read a line of input into `dest` as Z-SCII.
    ///
    /// The first `preloaded` entries of `dest` are editable preloaded input
    /// already on screen. Returns the input length, 0 when the verifier or
    /// the interpreter terminated the read, or -2 when ESC ended it (only
    /// with `return_on_escape`). The input line is cleared on exit; the
    /// story is expected to echo the input itself.
    #[allow(clippy::too_many_arguments)]
    pub fn read_line(
        &mut self,
        dest: &mut Vec<u8>,
        maximum_length: usize,
        tenth_seconds: u16,
        mut verifier: Option<&mut dyn InputVerifier>,
        preloaded: usize,
        return_on_escape: bool,
        disable_command_history: bool,
    ) -> Result<i16, RuntimeError> {
        if self.windows.is_empty() {
            return recoverable_error!(ErrorCode::InterfaceNotOpen, "read_line before linking");
        }
        debug!(target: "app::input", "read_line max {} preload {} timed {}", maximum_length, preloaded, tenth_seconds);

        self.flush_all_buffered_windows()?;
        for w in self.windows.iter_mut() {
            w.nof_consecutive_lines_output = 0;
        }

        let active = self.active_window();
        {
            let w = &self.windows[active];
            if w.xcursorpos + w.rightmargin > w.xsize - 1 {
                // Too close to the right margin for any input
                self.window_target(active, &['\n'])?;
            }
        }

        if self.winch_pending {
            let (rows, columns) = self.terminal.size();
            self.new_screen_size(rows, columns)?;
            self.winch_pending = false;
        }

        let timed_input_active = tenth_seconds != 0 && verifier.is_some();
        let timeout_millis: u16 = if timed_input_active && self.is_timed_keyboard_input_available()
        {
            100
        } else {
            0
        };

        self.terminal.update_screen();
        self.update_output_colours(active);
        self.update_output_text_style(active);

        let preloaded = preloaded.min(dest.len()).min(maximum_length);
        {
            let w = &self.windows[active];
            let mut state = InputState {
                buffer: Vec::new(),
                index: preloaded,
                scroll_x: 0,
                display_width: w.xsize - (w.xcursorpos - 1 - preloaded as i32) - w.rightmargin,
                x: w.xpos + w.xcursorpos - 1 - preloaded as i32,
                y: w.ypos + w.ycursorpos - 1,
            };
            if preloaded as i32 >= state.display_width || state.x < w.xpos + w.leftmargin {
                // Preload longer than the room on the line: anchor the
                // strip at the content area and scroll so the cursor sits
                // at the right edge.
                state.x = w.xpos + w.leftmargin;
                state.display_width = w.content_width();
                state.scroll_x = (preloaded as i32 - state.display_width + 1).max(0) as usize;
            }
            for &z in dest.iter().take(preloaded) {
                state.buffer.push(self.mapper.zscii_to_unicode(z));
            }
            self.input_state = Some(state);
        }

        let mut input_in_progress = true;
        let mut final_size: Option<i16> = None;
        let mut current_tenth_seconds: u16 = 0;
        let mut cmd_history_index: usize = 0;

        while input_in_progress {
            let event = self.terminal.next_event(timeout_millis);
            trace!(target: "app::input", "Event {:?}", event);

            match event {
                Event::Timeout => {
                    if timed_input_active {
                        current_tenth_seconds += 1;
                        if current_tenth_seconds == tenth_seconds {
                            current_tenth_seconds = 0;
                            if let Some(v) = verifier.as_mut() {
                                let outcome = v.invoke();
                                if outcome.terminate {
                                    input_in_progress = false;
                                    final_size = Some(0);
                                } else {
                                    if !outcome.output.is_empty() {
                                        self.output(&outcome.output)?;
                                        self.flush_all_buffered_windows()?;
                                        self.refresh_input_line()?;
                                        if let Some(st) = self.input_state.as_ref() {
                                            let size = st.buffer.len() as i32;
                                            let column = if size > st.display_width {
                                                st.x + st.display_width
                                            } else {
                                                st.x + size
                                            };
                                            let w = &mut self.windows[active];
                                            w.xcursorpos = column - (w.xpos - 1);
                                        }
                                        self.terminal.update_screen();
                                    }
                                    if outcome.retval != 0 {
                                        input_in_progress = false;
                                        final_size = Some(0);
                                    }
                                }
                            }
                        }
                    }
                }
                Event::PageUp | Event::PageDown => {
                    self.handle_scroll_key(event == Event::PageUp)?;
                }
                _ => {
                    self.return_to_live_view()?;
                    // Any further output would desynchronise replay
                    self.destroy_history_cursor();

                    match event {
                        Event::Input('\n') | Event::Input('\r') => {
                            input_in_progress = false;
                        }
                        Event::Input(CTRL_L) | Event::CtrlL => {
                            self.refresh_screen()?;
                        }
                        Event::Input(CTRL_R) | Event::CtrlR => {
                            let (rows, columns) = self.terminal.size();
                            self.new_screen_size(rows, columns)?;
                        }
                        Event::Input(c) => {
                            self.editor_insert(c, maximum_length)?;
                        }
                        Event::Backspace => {
                            self.editor_backspace()?;
                        }
                        Event::Delete => {
                            self.editor_delete()?;
                        }
                        Event::CursorLeft => {
                            self.editor_cursor_left()?;
                        }
                        Event::CursorRight => {
                            self.editor_cursor_right()?;
                        }
                        Event::CursorUp | Event::CursorDown => {
                            if !disable_command_history {
                                self.editor_history_recall(
                                    event == Event::CursorUp,
                                    &mut cmd_history_index,
                                )?;
                            }
                        }
                        Event::CtrlA => {
                            self.editor_home()?;
                        }
                        Event::CtrlE => {
                            self.editor_end()?;
                        }
                        Event::Escape => {
                            if return_on_escape {
                                input_in_progress = false;
                                final_size = Some(-2);
                            }
                        }
                        Event::Winch => {
                            let (rows, columns) = self.terminal.size();
                            if (rows, columns) != (self.screen_height, self.screen_width) {
                                self.new_screen_size(rows, columns)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Clear the input line; the story repeats the input on its own.
        let strip_origin = self.input_state.as_ref().map(|st| (st.x, st.y));
        if let Some((x, y)) = strip_origin {
            self.terminal.goto_yx(y, x);
            self.clear_to_eol_no_reverse(active);
            let w = &mut self.windows[active];
            w.xcursorpos = x - (w.xpos - 1);
        }
        self.refresh_cursor(active);

        let buffer = self
            .input_state
            .take()
            .map(|st| st.buffer)
            .unwrap_or_default();
        let size = match final_size {
            Some(s) => s,
            None => buffer.len() as i16,
        };
        if size > 0 {
            dest.clear();
            for c in &buffer[..size as usize] {
                dest.push(self.mapper.unicode_to_zscii(*c).unwrap_or(b' '));
            }
            if !disable_command_history {
                self.command_history.push(dest.clone());
            }
        }
        debug!(target: "app::input", "read_line -> {}", size);
        Ok(size)
    }

    /// Read a single keypress as Z-SCII. Cursor keys, backspace and delete
    /// produce their distinguished codes; scroll-back and refresh keys are
    /// handled internally and do not end the read.
    pub fn read_char(
        &mut self,
        tenth_seconds: u16,
        mut verifier: Option<&mut dyn InputVerifier>,
    ) -> Result<u8, RuntimeError> {
        if self.windows.is_empty() {
            return recoverable_error!(ErrorCode::InterfaceNotOpen, "read_char before linking");
        }
        self.flush_all_buffered_windows()?;
        for w in self.windows.iter_mut() {
            w.nof_consecutive_lines_output = 0;
        }

        if self.winch_pending {
            let (rows, columns) = self.terminal.size();
            self.new_screen_size(rows, columns)?;
            self.winch_pending = false;
        }

        self.terminal.update_screen();

        let timed_input_active = tenth_seconds != 0 && verifier.is_some();
        let timeout_millis: u16 = if timed_input_active && self.is_timed_keyboard_input_available()
        {
            100
        } else {
            0
        };

        let mut current_tenth_seconds: u16 = 0;
        loop {
            let event = self.terminal.next_event(timeout_millis);
            match event {
                Event::PageUp | Event::PageDown => {
                    self.handle_scroll_key(event == Event::PageUp)?;
                }
                _ => {
                    self.return_to_live_view()?;
                    self.destroy_history_cursor();

                    match event {
                        Event::Input(CTRL_L) | Event::CtrlL => {
                            self.refresh_screen()?;
                        }
                        Event::Input(c) => {
                            if let Some(zscii) = self.mapper.unicode_to_zscii(c) {
                                return Ok(zscii);
                            }
                        }
                        Event::CursorUp => return Ok(ZSCII_CURSOR_UP),
                        Event::CursorDown => return Ok(ZSCII_CURSOR_DOWN),
                        Event::CursorLeft => return Ok(ZSCII_CURSOR_LEFT),
                        Event::CursorRight => return Ok(ZSCII_CURSOR_RIGHT),
                        Event::Backspace => return Ok(ZSCII_DELETE),
                        Event::Delete => return Ok(ZSCII_FORWARD_DELETE),
                        Event::Timeout => {
                            if timed_input_active {
                                current_tenth_seconds += 1;
                                if current_tenth_seconds == tenth_seconds {
                                    current_tenth_seconds = 0;
                                    if let Some(v) = verifier.as_mut() {
                                        let outcome = v.invoke();
                                        if outcome.terminate {
                                            return Ok(0);
                                        }
                                        if !outcome.output.is_empty() {
                                            self.output(&outcome.output)?;
                                            self.flush_all_buffered_windows()?;
                                            self.terminal.update_screen();
                                        }
                                        if outcome.retval != 0 {
                                            return Ok(0);
                                        }
                                    }
                                }
                            }
                        }
                        Event::Winch => {
                            let (rows, columns) = self.terminal.size();
                            self.new_screen_size(rows, columns)?;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Repaint the input line after interpreter output or a refresh moved
    /// it, and restore the hardware cursor into it.
    pub(crate) fn refresh_input_line(&mut self) -> Result<(), RuntimeError> {
        if self.input_state.is_none() {
            return Ok(());
        }
        let last_active = if self.active_window() != 0 {
            let last = self.active_window();
            self.switch_to_window(0);
            Some(last)
        } else {
            None
        };

        self.update_output_colours(0);
        self.update_output_text_style(0);

        let (slice, x, y, index, scroll_x) = match self.input_state.as_ref() {
            Some(st) => (st.visible(), st.x, st.y, st.index as i32, st.scroll_x as i32),
            None => return Ok(()),
        };
        if !slice.is_empty() {
            self.terminal.goto_yx(y, x);
            self.terminal.output(&slice);
        }

        {
            let w = &mut self.windows[0];
            w.xcursorpos = (x - (w.xpos - 1)) + index - scroll_x;
            w.ycursorpos = y - (w.ypos - 1);
        }
        let line_index = {
            let w = &self.windows[0];
            x - w.xpos - w.leftmargin
        };
        self.windows[0].wrapper.set_line_index(line_index);
        self.refresh_cursor(0);

        if let Some(last) = last_active {
            self.switch_to_window(last);
        }
        Ok(())
    }

    /// Insert a printable character at the cursor.
    fn editor_insert(&mut self, c: char, maximum_length: usize) -> Result<(), RuntimeError> {
        if self.mapper.unicode_to_zscii(c).is_none() {
            return Ok(());
        }
        let active = self.active_window();
        let (y, x, width, at_right_edge, slice) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            let size = st.buffer.len();
            // Reject input only when the line is full and the cursor sits
            // at its end
            if size >= maximum_length && st.index >= size {
                return Ok(());
            }
            if st.index < size {
                st.buffer.insert(st.index, c);
                if st.buffer.len() > maximum_length {
                    // Full line: the rightmost character drops off
                    st.buffer.truncate(maximum_length);
                }
            } else {
                st.buffer.push(c);
            }
            st.index += 1;

            let w = &self.windows[active];
            let at_right_edge = w.xcursorpos + w.rightmargin == w.xsize;
            if at_right_edge {
                st.scroll_x += 1;
            }
            (st.y, st.x, st.display_width, at_right_edge, st.visible())
        };

        if at_right_edge {
            self.terminal.copy_area(y, x, y, x + 1, 1, width - 1);
            self.terminal.goto_yx(y, x + width - 1);
            self.terminal.output(&[' ']);
        } else {
            self.windows[active].xcursorpos += 1;
        }

        self.terminal.goto_yx(y, x);
        self.terminal.output(&slice);
        self.refresh_cursor(active);
        self.terminal.update_screen();
        Ok(())
    }

    fn editor_backspace(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, width, at_left_edge, cursor_abs, fill) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            if st.index == 0 {
                return Ok(());
            }
            st.buffer.remove(st.index - 1);
            st.index -= 1;

            let w = &self.windows[active];
            let cursor_abs = w.xpos + w.xcursorpos - 1;
            let at_left_edge = cursor_abs == st.x;
            if at_left_edge {
                // The strip scrolls under the cursor; memory is enough
                st.scroll_x = st.scroll_x.saturating_sub(1);
            }
            let width = st.display_width;
            let rightmost = st.scroll_x + width.max(1) as usize - 1;
            let fill = if st.buffer.len() > rightmost {
                st.buffer[rightmost]
            } else {
                ' '
            };
            (st.y, st.x, width, at_left_edge, cursor_abs, fill)
        };

        if !at_left_edge {
            self.terminal.copy_area(
                y,
                cursor_abs - 1,
                y,
                cursor_abs,
                1,
                width - (cursor_abs - x),
            );
            self.terminal.goto_yx(y, x + width - 1);
            self.terminal.output(&[fill]);
            self.windows[active].xcursorpos -= 1;
            self.refresh_cursor(active);
            self.terminal.update_screen();
        }
        Ok(())
    }

    fn editor_delete(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, width, cursor_abs, fill) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            if st.index >= st.buffer.len() {
                return Ok(());
            }
            st.buffer.remove(st.index);

            let w = &self.windows[active];
            let cursor_abs = w.xpos + w.xcursorpos - 1;
            let width = st.display_width;
            let rightmost = st.scroll_x + width.max(1) as usize - 1;
            let fill = if st.buffer.len() > rightmost {
                st.buffer[rightmost]
            } else {
                ' '
            };
            (st.y, st.x, width, cursor_abs, fill)
        };

        self.terminal.copy_area(
            y,
            cursor_abs,
            y,
            cursor_abs + 1,
            1,
            width - (cursor_abs + 1 - x),
        );
        self.terminal.goto_yx(y, x + width - 1);
        self.terminal.output(&[fill]);
        self.refresh_cursor(active);
        self.terminal.update_screen();
        Ok(())
    }

    fn editor_cursor_left(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, width, at_left_edge, fill) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            if st.index == 0 {
                return Ok(());
            }
            let w = &self.windows[active];
            let at_left_edge = w.xpos + w.xcursorpos - 1 <= st.x;
            let fill = if at_left_edge && st.scroll_x > 0 {
                let c = st.buffer[st.scroll_x - 1];
                st.scroll_x -= 1;
                c
            } else {
                ' '
            };
            st.index -= 1;
            (st.y, st.x, st.display_width, at_left_edge, fill)
        };

        if at_left_edge {
            self.terminal.copy_area(y, x + 1, y, x, 1, width - 1);
            self.terminal.goto_yx(y, x);
            self.terminal.output(&[fill]);
            self.terminal.goto_yx(y, x);
        } else {
            self.windows[active].xcursorpos -= 1;
            self.refresh_cursor(active);
        }
        self.terminal.update_screen();
        Ok(())
    }

    fn editor_cursor_right(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, width, at_right_edge, fill) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            if st.index >= st.buffer.len() {
                return Ok(());
            }
            let w = &self.windows[active];
            let at_right_edge = w.xpos + w.xcursorpos >= st.x + st.display_width;
            let fill = if at_right_edge {
                // Vacated rightmost cell: a space when the cursor moves to
                // the append column, else the next scrolled-in character
                let c = if st.index == st.buffer.len() - 1 {
                    ' '
                } else {
                    let next = st.scroll_x + st.display_width.max(1) as usize;
                    st.buffer.get(next).copied().unwrap_or(' ')
                };
                st.scroll_x += 1;
                c
            } else {
                ' '
            };
            st.index += 1;
            (st.y, st.x, st.display_width, at_right_edge, fill)
        };

        if at_right_edge {
            self.terminal.copy_area(y, x, y, x + 1, 1, width - 1);
            self.terminal.goto_yx(y, x + width - 1);
            self.terminal.output(&[fill]);
            self.terminal.goto_yx(y, x + width - 1);
        } else {
            self.windows[active].xcursorpos += 1;
            self.refresh_cursor(active);
        }
        self.terminal.update_screen();
        Ok(())
    }

    /// Replace the buffer with a command-history entry. Index 0 is the
    /// freshly typed (empty) line.
    fn editor_history_recall(
        &mut self,
        up: bool,
        cmd_history_index: &mut usize,
    ) -> Result<(), RuntimeError> {
        let stored = self.command_history.len();
        if (up && *cmd_history_index >= stored) || (!up && *cmd_history_index == 0) {
            return Ok(());
        }
        *cmd_history_index = if up {
            *cmd_history_index + 1
        } else {
            *cmd_history_index - 1
        };

        let active = self.active_window();
        let entry: Option<Vec<char>> = if *cmd_history_index > 0 {
            self.command_history
                .get(*cmd_history_index - 1)
                .map(|zscii| zscii.iter().map(|&z| self.mapper.zscii_to_unicode(z)).collect())
        } else {
            None
        };

        let (y, x, slice, column) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            let (slice, column) = match entry {
                Some(text) => {
                    let size = text.len() as i32;
                    st.buffer = text;
                    st.index = st.buffer.len();
                    let column = if size > st.display_width - 1 {
                        st.scroll_x = (size - st.display_width + 1).max(0) as usize;
                        st.x + st.display_width - 1
                    } else {
                        st.scroll_x = 0;
                        st.x + size
                    };
                    (st.visible(), column)
                }
                None => {
                    st.buffer.clear();
                    st.index = 0;
                    st.scroll_x = 0;
                    (Vec::new(), st.x)
                }
            };
            (st.y, st.x, slice, column)
        };

        self.terminal.goto_yx(y, x);
        if !slice.is_empty() {
            self.terminal.output(&slice);
        }
        self.clear_to_eol_no_reverse(active);
        {
            let w = &mut self.windows[active];
            w.xcursorpos = column - (w.xpos - 1);
        }
        self.refresh_cursor(active);
        self.terminal.update_screen();
        Ok(())
    }

    fn editor_home(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, redraw, slice) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            if st.index == 0 {
                return Ok(());
            }
            let redraw = st.scroll_x > 0;
            if redraw {
                st.scroll_x = 0;
            }
            st.index = 0;
            (st.y, st.x, redraw, st.visible())
        };

        if redraw {
            self.terminal.goto_yx(y, x);
            self.terminal.output(&slice);
        }
        {
            let w = &mut self.windows[active];
            w.xcursorpos = x - (w.xpos - 1);
        }
        self.refresh_cursor(active);
        self.terminal.update_screen();
        Ok(())
    }

    fn editor_end(&mut self) -> Result<(), RuntimeError> {
        let active = self.active_window();
        let (y, x, redraw, slice, column) = {
            let Some(st) = self.input_state.as_mut() else {
                return Ok(());
            };
            let size = st.buffer.len() as i32;
            let redraw = size > st.display_width - 1;
            let column = if redraw {
                st.scroll_x = (size - st.display_width + 1).max(0) as usize;
                st.x + st.display_width - 1
            } else {
                st.x + size
            };
            st.index = st.buffer.len();
            (st.y, st.x, redraw, st.visible(), column)
        };

        if redraw {
            self.terminal.goto_yx(y, x);
            self.terminal.output(&slice);
            self.clear_to_eol_no_reverse(active);
        }
        {
            let w = &mut self.windows[active];
            w.xcursorpos = column - (w.xpos - 1);
        }
        self.refresh_cursor(active);
        self.terminal.update_screen();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn read_plain(screen: &mut Screen, dest: &mut Vec<u8>) -> i16 {
        screen
            .read_line(dest, 40, 0, None, 0, false, false)
            .expect("read_line failed")
    }

    struct CountingVerifier {
        invocations: u32,
        retval: u16,
        output: Vec<char>,
        terminate: bool,
    }

    impl CountingVerifier {
        fn new(retval: u16) -> CountingVerifier {
            CountingVerifier {
                invocations: 0,
                retval,
                output: Vec::new(),
                terminate: false,
            }
        }
    }

    impl InputVerifier for CountingVerifier {
        fn invoke(&mut self) -> VerifyOutcome {
            self.invocations += 1;
            VerifyOutcome {
                retval: self.retval,
                output: self.output.clone(),
                terminate: self.terminate,
            }
        }
    }

    #[test]
    fn test_read_line_collects_typed_input() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("> ")));
        test_util::queue_input("hello\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 5);
        assert_eq!(dest, b"hello".to_vec());
        // The input line is cleared on exit; the story echoes it itself
        assert_row!(1, ">");
    }

    #[test]
    fn test_read_line_empty_input() {
        let mut screen = linked_screen(5);
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 0);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_read_line_preloaded_edit() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("look")));
        test_util::queue_event(Event::Backspace);
        test_util::queue_event(Event::Backspace);
        test_util::queue_event(Event::Backspace);
        test_util::queue_event(Event::CtrlE);
        test_util::queue_input("\n");
        let mut dest = b"look".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 4, false, false)
            .expect("read_line failed");
        assert_eq!(size, 1);
        assert_eq!(dest, b"l".to_vec());
    }

    #[test]
    fn test_read_line_backspace_updates_display() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("look")));
        test_util::queue_event(Event::Backspace);
        test_util::queue_event(Event::Backspace);
        let mut dest = b"look".to_vec();
        // The queue runs dry after the backspaces; the fallback newline
        // ends the read, but the display was already checked mid-way by
        // the copy-and-fill logic.
        let size = screen
            .read_line(&mut dest, 40, 0, None, 4, false, false)
            .expect("read_line failed");
        assert_eq!(size, 2);
        assert_eq!(dest, b"lo".to_vec());
    }

    #[test]
    fn test_read_line_insert_in_the_middle() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("abd")));
        test_util::queue_event(Event::CursorLeft);
        test_util::queue_input("c");
        test_util::queue_input("\n");
        let mut dest = b"abd".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 3, false, false)
            .expect("read_line failed");
        assert_eq!(size, 4);
        assert_eq!(dest, b"abcd".to_vec());
    }

    #[test]
    fn test_read_line_full_buffer_drops_rightmost() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("abcd")));
        test_util::queue_event(Event::CursorLeft);
        test_util::queue_event(Event::CursorLeft);
        test_util::queue_input("X");
        test_util::queue_input("\n");
        let mut dest = b"abcd".to_vec();
        let size = screen
            .read_line(&mut dest, 4, 0, None, 4, false, false)
            .expect("read_line failed");
        assert_eq!(size, 4);
        assert_eq!(dest, b"abXc".to_vec());
    }

    #[test]
    fn test_read_line_rejects_input_beyond_maximum() {
        let mut screen = linked_screen(5);
        test_util::queue_input("abcdef\n");
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 3, 0, None, 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 3);
        assert_eq!(dest, b"abc".to_vec());
    }

    #[test]
    fn test_read_line_delete_forward() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("abcd")));
        test_util::queue_event(Event::CursorLeft);
        test_util::queue_event(Event::CursorLeft);
        test_util::queue_event(Event::Delete);
        test_util::queue_input("\n");
        let mut dest = b"abcd".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 4, false, false)
            .expect("read_line failed");
        assert_eq!(size, 3);
        assert_eq!(dest, b"abd".to_vec());
    }

    #[test]
    fn test_read_line_home_and_end() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("bc")));
        test_util::queue_event(Event::CtrlA);
        test_util::queue_input("a");
        test_util::queue_event(Event::CtrlE);
        test_util::queue_input("d");
        test_util::queue_input("\n");
        let mut dest = b"bc".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 2, false, false)
            .expect("read_line failed");
        assert_eq!(size, 4);
        assert_eq!(dest, b"abcd".to_vec());
    }

    #[test]
    fn test_read_line_horizontal_scroll() {
        test_util::set_size(10, 20);
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars(">")));
        let text = "abcdefghijklmnopqrstuvwxy";
        test_util::queue_input(text);
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 25);
        assert_eq!(dest, text.as_bytes().to_vec());
    }

    #[test]
    fn test_read_line_scrolled_view_shows_tail() {
        test_util::set_size(10, 20);
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars(">")));
        test_util::queue_input("abcdefghijklmnopqrstuvwxy");
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 25);
        // After exit the strip is cleared back to the prompt
        assert_row!(1, ">");
    }

    #[test]
    fn test_read_line_escape() {
        let mut screen = linked_screen(5);
        test_util::queue_input("ab");
        test_util::queue_event(Event::Escape);
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 0, true, false)
            .expect("read_line failed");
        assert_eq!(size, -2);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_read_line_escape_ignored_when_disabled() {
        let mut screen = linked_screen(5);
        test_util::queue_event(Event::Escape);
        test_util::queue_input("x\n");
        let mut dest = Vec::new();
        let size = read_plain(&mut screen, &mut dest);
        assert_eq!(size, 1);
        assert_eq!(dest, b"x".to_vec());
    }

    #[test]
    fn test_read_line_command_history_recall() {
        let mut screen = linked_screen(5);
        test_util::queue_input("north\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 5);

        test_util::queue_event(Event::CursorUp);
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 5);
        assert_eq!(dest, b"north".to_vec());
    }

    #[test]
    fn test_read_line_command_history_down_returns_to_empty() {
        let mut screen = linked_screen(5);
        test_util::queue_input("wait\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 4);

        test_util::queue_event(Event::CursorUp);
        test_util::queue_event(Event::CursorDown);
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 0);
    }

    #[test]
    fn test_read_line_command_history_disabled() {
        let mut screen = linked_screen(5);
        test_util::queue_input("east\n");
        let mut dest = Vec::new();
        assert_eq!(
            screen
                .read_line(&mut dest, 40, 0, None, 0, false, true)
                .expect("read_line failed"),
            4
        );
        // Nothing was stored, and recall is inert
        test_util::queue_event(Event::CursorUp);
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        assert_eq!(
            screen
                .read_line(&mut dest, 40, 0, None, 0, false, true)
                .expect("read_line failed"),
            0
        );
    }

    #[test]
    fn test_timed_input_invokes_verifier_once() {
        let mut screen = linked_screen(5);
        for _ in 0..10 {
            test_util::queue_event(Event::Timeout);
        }
        test_util::queue_input("\n");
        let mut verifier = CountingVerifier::new(0);
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 40, 10, Some(&mut verifier), 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 0);
        assert_eq!(verifier.invocations, 1);
        // Timed input polls the backend on the 100ms tick
        assert!(test_util::timeouts().contains(&100));
    }

    #[test]
    fn test_timed_input_verifier_aborts_read() {
        let mut screen = linked_screen(5);
        for _ in 0..10 {
            test_util::queue_event(Event::Timeout);
        }
        let mut verifier = CountingVerifier::new(1);
        let mut dest = b"keep".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 10, Some(&mut verifier), 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 0);
        assert_eq!(verifier.invocations, 1);
        // An aborted read returns nothing; dest is left alone
        assert_eq!(dest, b"keep".to_vec());
    }

    #[test]
    fn test_timed_input_not_yet_due() {
        let mut screen = linked_screen(5);
        for _ in 0..5 {
            test_util::queue_event(Event::Timeout);
        }
        test_util::queue_input("\n");
        let mut verifier = CountingVerifier::new(0);
        let mut dest = Vec::new();
        assert_ok!(screen.read_line(&mut dest, 40, 10, Some(&mut verifier), 0, false, false));
        assert_eq!(verifier.invocations, 0);
    }

    #[test]
    fn test_timed_input_output_repaints_input_line() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("> ")));
        for _ in 0..10 {
            test_util::queue_event(Event::Timeout);
        }
        test_util::queue_input("\n");
        let mut verifier = CountingVerifier::new(0);
        verifier.output = chars("Tick!\n");
        let mut dest = b"go".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 10, Some(&mut verifier), 2, false, false)
            .expect("read_line failed");
        assert_eq!(size, 2);
        assert_eq!(dest, b"go".to_vec());
        assert!(test_util::printed().contains("Tick!"));
    }

    #[test]
    fn test_timed_input_terminate_ends_read() {
        let mut screen = linked_screen(5);
        for _ in 0..10 {
            test_util::queue_event(Event::Timeout);
        }
        let mut verifier = CountingVerifier::new(0);
        verifier.terminate = true;
        let mut dest = Vec::new();
        let size = screen
            .read_line(&mut dest, 40, 10, Some(&mut verifier), 0, false, false)
            .expect("read_line failed");
        assert_eq!(size, 0);
    }

    #[test]
    fn test_resize_mid_input_preserves_buffer() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars(">")));
        test_util::set_size(30, 100);
        test_util::queue_input("abc");
        test_util::queue_event(Event::Winch);
        test_util::queue_input("d");
        test_util::queue_input("\n");
        let mut dest = Vec::new();
        let size = read_plain(&mut screen, &mut dest);
        assert_eq!(size, 4);
        assert_eq!(dest, b"abcd".to_vec());
        assert_eq!(screen.rows(), 30);
        assert_eq!(screen.columns(), 100);
        assert_eq!(screen.windows[0].wrapper.line_length(), 100);
        // The prompt was repainted from history at the new bottom line
        assert_eq!(test_util::row(30), ">");
        assert_eq!(screen.take_resize_notification(), Some((30, 100)));
    }

    #[test]
    fn test_read_line_breaks_line_when_too_close_to_margin() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.set_cursor(1, 80, 0));
        test_util::queue_input("hi\n");
        let mut dest = Vec::new();
        assert_eq!(read_plain(&mut screen, &mut dest), 2);
        assert_eq!(dest, b"hi".to_vec());
        assert_eq!(screen.get_cursor_row(), 2);
    }

    #[test]
    fn test_read_char_returns_zscii() {
        let mut screen = linked_screen(5);
        test_util::queue_input("x");
        assert_ok_eq!(screen.read_char(0, None), b'x');
        test_util::queue_input("\n");
        assert_ok_eq!(screen.read_char(0, None), 13);
    }

    #[test]
    fn test_read_char_distinguished_codes() {
        let mut screen = linked_screen(5);
        test_util::queue_event(Event::CursorUp);
        assert_ok_eq!(screen.read_char(0, None), 129);
        test_util::queue_event(Event::CursorDown);
        assert_ok_eq!(screen.read_char(0, None), 130);
        test_util::queue_event(Event::CursorLeft);
        assert_ok_eq!(screen.read_char(0, None), 131);
        test_util::queue_event(Event::CursorRight);
        assert_ok_eq!(screen.read_char(0, None), 132);
        test_util::queue_event(Event::Backspace);
        assert_ok_eq!(screen.read_char(0, None), 8);
        test_util::queue_event(Event::Delete);
        assert_ok_eq!(screen.read_char(0, None), 127);
    }

    #[test]
    fn test_read_char_timed_abort() {
        let mut screen = linked_screen(5);
        for _ in 0..5 {
            test_util::queue_event(Event::Timeout);
        }
        let mut verifier = CountingVerifier::new(1);
        assert_ok_eq!(screen.read_char(5, Some(&mut verifier)), 0);
        assert_eq!(verifier.invocations, 1);
    }

    #[test]
    fn test_read_char_ctrl_l_refreshes_screen() {
        let mut screen = linked_screen(5);
        assert_ok!(screen.output(&chars("remembered\n")));
        test_util::set_size(24, 80);
        test_util::queue_event(Event::CtrlL);
        test_util::queue_input("k");
        assert_ok_eq!(screen.read_char(0, None), b'k');
        assert_row!(23, "remembered");
    }

    #[test]
    fn test_preload_longer_than_line_prefix() {
        let mut screen = linked_screen(5);
        // The preload reaches further left than the line has room for
        assert_ok!(screen.set_cursor(1, 10, 0));
        test_util::queue_input("\n");
        let mut dest = b"0123456789012345".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 16, false, false)
            .expect("read_line failed");
        assert_eq!(size, 16);
        assert_eq!(dest, b"0123456789012345".to_vec());
    }

    #[test]
    fn test_preload_longer_than_display_width_scrolls() {
        test_util::set_size(10, 20);
        let mut screen = linked_screen(5);
        test_util::queue_input("\n");
        let mut dest = b"0123456789012345678901234".to_vec();
        let size = screen
            .read_line(&mut dest, 40, 0, None, 25, false, false)
            .expect("read_line failed");
        assert_eq!(size, 25);
        assert_eq!(dest.len(), 25);
    }
}
