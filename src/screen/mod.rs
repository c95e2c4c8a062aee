//! The screen layer.
//!
//! [`Screen`] owns the window table and mediates between the interpreter
//! core and a [`Terminal`] backend. Output for buffered windows runs through
//! the per-window wrapper; everything that lands in window 0 is also
//! recorded in the output history so the window can be repainted from it
//! (see `refresh`). Input is handled by the line editor in `input`.

pub(crate) mod blockbuf;
mod curses;
mod input;
mod refresh;
pub mod window;

use crate::cmd_history::CommandHistory;
use crate::config::{self, Config, CONFIG_FALSE_VALUE, CONFIG_TRUE_VALUE};
use crate::error::{ErrorCode, RuntimeError};
use crate::history::{HistoryCursor, OutputHistory};
use crate::locales::Locale;
use crate::wordwrap::{Metadata, WordWrapper, WrapEmission};
use crate::zscii::ZsciiMapper;
use crate::{fatal_error, recoverable_error};

use blockbuf::BlockBuf;
use window::Window;

pub use input::{InputVerifier, VerifyOutcome};

#[cfg(not(test))]
use curses::pancurses::new_terminal;

#[cfg(test)]
use curses::test_terminal::new_terminal;

/// Stories needing an extra newline after linking, so their first line of
/// text is not immediately overwritten by the status line. Identified by
/// (release, checksum, serial). None are registered by default.
const STARTUP_NEWLINE_QUIRKS: &[(u16, u16, &str)] = &[];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Color {
    Black = 2,
    Red = 3,
    Green = 4,
    Yellow = 5,
    Blue = 6,
    Magenta = 7,
    Cyan = 8,
    White = 9,
}

impl Color {
    /// Map a Z-Machine colour code to a colour.
    pub fn from_code(color: u8) -> Result<Color, RuntimeError> {
        match color {
            2 => Ok(Color::Black),
            3 => Ok(Color::Red),
            4 => Ok(Color::Green),
            5 => Ok(Color::Yellow),
            6 => Ok(Color::Blue),
            7 => Ok(Color::Magenta),
            8 => Ok(Color::Cyan),
            9 => Ok(Color::White),
            _ => recoverable_error!(ErrorCode::InvalidColor, "Invalid color {}", color),
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

pub enum Style {
    Roman = 0,
    Reverse = 1,
    Bold = 2,
    Italic = 4,
    Fixed = 8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CellStyle {
    mask: u8,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle::new()
    }
}

impl CellStyle {
    pub fn new() -> CellStyle {
        CellStyle { mask: 0 }
    }

    pub fn set(&mut self, style: u8) {
        match style {
            0 => self.mask = 0,
            _ => self.mask |= style & 0xf,
        }
    }

    pub fn clear(&mut self, style: u8) {
        let mask = !(style & 0xF);
        self.mask &= mask;
    }

    pub fn is_style(&self, style: Style) -> bool {
        let s = style as u8;
        self.mask & s == s
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }
}

/// One event from the backend's event loop
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// A printable (or control) character
    Input(char),
    /// The read timeout elapsed without input
    Timeout,
    /// The screen size changed
    Winch,
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CtrlA,
    CtrlE,
    CtrlL,
    CtrlR,
    PageUp,
    PageDown,
    Escape,
}

/// Status line flavour for V3 stories
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusMode {
    ScoreAndTurn,
    Time,
}

/// Outcome of a backend filename dialog
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilenamePrompt {
    /// The backend has no dialog; the caller should fall back to line input
    NotImplemented,
    /// The user cancelled
    Cancelled,
    Selected(String),
}

/// What the screen layer needs to know about the story being played
#[derive(Clone, Debug)]
pub struct Story {
    pub version: u8,
    pub release: u16,
    pub checksum: u16,
    pub serial: String,
    pub title: Option<String>,
}

impl Story {
    pub fn new(version: u8) -> Story {
        Story {
            version,
            release: 0,
            checksum: 0,
            serial: String::new(),
            title: None,
        }
    }
}

/// The display backend: a cell-addressed monospace screen.
///
/// Coordinates are 1-based with row 1, column 1 at the top left.
pub trait Terminal {
    fn name(&self) -> &str;
    /// (rows, columns)
    fn size(&self) -> (i32, i32);
    fn default_colors(&self) -> (Color, Color);
    fn is_colour_available(&self) -> bool;
    fn is_bold_available(&self) -> bool;
    fn is_italic_available(&self) -> bool;
    fn is_input_timeout_available(&self) -> bool;
    fn goto_yx(&mut self, row: i32, column: i32);
    /// Write text at the cursor; the text contains no line breaks
    fn output(&mut self, text: &[char]);
    fn set_text_style(&mut self, style: CellStyle);
    fn set_colors(&mut self, colors: (Color, Color));
    fn clear_area(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_to_eol(&mut self);
    fn copy_area(&mut self, dst_y: i32, dst_x: i32, src_y: i32, src_x: i32, height: i32, width: i32);
    fn set_cursor_visibility(&mut self, visible: bool);
    fn update_screen(&mut self);
    fn redraw_screen_from_scratch(&mut self);
    /// Wait for the next event; `timeout_millis` 0 blocks indefinitely
    fn next_event(&mut self, timeout_millis: u16) -> Event;
    fn reset(&mut self);
    fn close(&mut self, error_message: Option<&str>);
    // Optional backend surfaces
    fn link_interface_to_story(&mut self, _story: &Story) {}
    fn set_window_title(&mut self, _title: &str) {}
    fn prompt_for_filename(&mut self, _suggestion: &str) -> FilenamePrompt {
        FilenamePrompt::NotImplemented
    }
    /// 0 on success, -1 for unknown keys or bad values
    fn parse_config_parameter(&mut self, _key: &str, _value: Option<&str>) -> i32 {
        -1
    }
    fn get_config_value(&self, _key: &str) -> Option<String> {
        None
    }
    fn config_option_names(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct Screen {
    version: u8,
    screen_height: i32,
    screen_width: i32,
    windows: Vec<Window>,
    statusline_window_id: Option<usize>,
    active_window: usize,
    custom_left_margin: i32,
    custom_right_margin: i32,
    hyphenation_enabled: bool,
    using_colors: bool,
    color_disabled: bool,
    use_xterm_title: bool,
    disable_more_prompt: bool,
    more_prompt: Vec<char>,
    score_label: Vec<char>,
    turns_label: Vec<char>,
    default_colors: (Color, Color),
    // What the backend is currently set to; None until pushed once
    current_output_colors: Option<(Color, Color)>,
    current_output_text_style: Option<CellStyle>,
    last_split_window_size: i32,
    winch_pending: bool,
    resize_notification: Option<(i32, i32)>,
    interface_open: bool,
    history: OutputHistory,
    history_cursor: Option<HistoryCursor>,
    current_history_screen_line: i32,
    current_history_hit_top: bool,
    rightmost_y_refresh_curpos: i32,
    replaying_history: bool,
    input_state: Option<input::InputState>,
    command_history: CommandHistory,
    locale: Locale,
    mapper: ZsciiMapper,
    last_status: Option<(Vec<char>, StatusMode, i16, i16)>,
    blockbuf: BlockBuf,
    terminal: Box<dyn Terminal>,
}

impl Screen {
    pub fn new(config: Config) -> Screen {
        Screen::with_locale(config, Locale::default())
    }

    pub fn with_locale(config: Config, locale: Locale) -> Screen {
        let terminal = new_terminal();
        let default_colors = terminal.default_colors();
        let more_prompt = format!("[{}]", locale.more_prompt).chars().collect();
        let score_label: Vec<char> = locale.score.chars().collect();
        let turns_label: Vec<char> = locale.turns.chars().collect();

        Screen {
            version: 0,
            screen_height: 0,
            screen_width: 0,
            windows: Vec::new(),
            statusline_window_id: None,
            active_window: 0,
            custom_left_margin: config.left_margin(),
            custom_right_margin: config.right_margin(),
            hyphenation_enabled: !config.disable_hyphenation(),
            using_colors: false,
            color_disabled: config.disable_color(),
            use_xterm_title: config.use_xterm_title(),
            disable_more_prompt: false,
            more_prompt,
            score_label,
            turns_label,
            default_colors,
            current_output_colors: None,
            current_output_text_style: None,
            last_split_window_size: 0,
            winch_pending: false,
            resize_notification: None,
            interface_open: false,
            history: OutputHistory::default(),
            history_cursor: None,
            current_history_screen_line: -1,
            current_history_hit_top: false,
            rightmost_y_refresh_curpos: -1,
            replaying_history: false,
            input_state: None,
            command_history: CommandHistory::default(),
            locale,
            mapper: ZsciiMapper::default(),
            last_status: None,
            blockbuf: BlockBuf::new(0, 0, default_colors.0, default_colors.1),
            terminal,
        }
    }

    /// Build the window table for a story and open the interface.
    pub fn link_to_story(&mut self, story: &Story) -> Result<(), RuntimeError> {
        if !(1..=8).contains(&story.version) {
            return recoverable_error!(
                ErrorCode::UnsupportedVersion,
                "Version {} is unsupported",
                story.version
            );
        }
        debug!(target: "app::screen", "Linking screen to V{} story", story.version);

        self.terminal.link_interface_to_story(story);
        self.version = story.version;
        self.using_colors =
            story.version >= 5 && !self.color_disabled && self.terminal.is_colour_available();

        let (rows, columns) = self.terminal.size();
        self.screen_height = rows;
        self.screen_width = columns;

        let game_windows: usize = match story.version {
            1 | 2 => 1,
            6 => 8,
            _ => 2,
        };
        let statusline = story.version == 3;

        self.windows.clear();
        self.statusline_window_id = if statusline {
            Some(game_windows)
        } else {
            None
        };

        let window_count = game_windows + usize::from(statusline);
        let (foreground, background) = self.default_colors;
        for id in 0..window_count {
            let mut w = Window::new(foreground, background, self.hyphenation_enabled);
            if id == 0 {
                w.ysize = self.screen_height;
                w.xsize = self.screen_width;
                w.scrollback_top_line = self.screen_height;
                if story.version != 6 {
                    w.leftmargin = self.custom_left_margin;
                    w.rightmargin = self.custom_right_margin;
                }
                if statusline {
                    w.ysize -= 1;
                    w.scrollback_top_line -= 1;
                    w.ypos += 1;
                }
                w.wrapping = true;
            } else if id == 1 {
                w.ysize = 0;
                w.xsize = self.screen_width;
                if statusline {
                    w.ypos += 1;
                }
            } else if Some(id) == self.statusline_window_id {
                w.ysize = 1;
                w.xsize = self.screen_width;
                w.scrollback_top_line = 1;
                w.text_style.set(Style::Reverse as u8);
                w.output_text_style.set(Style::Reverse as u8);
            }
            w.buffering = story.version == 6 || id == 0;
            w.ycursorpos = if story.version >= 5 { 1 } else { w.ysize.max(1) };
            w.xcursorpos = 1 + w.leftmargin;
            w.wrapper = WordWrapper::new(w.content_width(), self.hyphenation_enabled);
            self.windows.push(w);
        }

        self.active_window = 0;
        self.last_split_window_size = 0;
        self.blockbuf = BlockBuf::new(self.screen_width, self.screen_height, foreground, background);

        // Set default colors first, then clear, so the whole screen comes up
        // in the desired colors.
        if self.using_colors {
            self.terminal.set_colors(self.default_colors);
            self.current_output_colors = Some(self.default_colors);
        }
        self.terminal
            .clear_area(1, 1, self.screen_width, self.screen_height);

        self.refresh_cursor(0);
        self.startup_quirks(story)?;
        self.interface_open = true;
        Ok(())
    }

    fn startup_quirks(&mut self, story: &Story) -> Result<(), RuntimeError> {
        if STARTUP_NEWLINE_QUIRKS
            .iter()
            .any(|&(r, c, s)| story.release == r && story.checksum == c && story.serial == s)
        {
            self.window_target(0, &['\n'])?;
        }
        if self.use_xterm_title {
            if let Some(title) = &story.title {
                self.terminal.set_window_title(title);
            }
        }
        Ok(())
    }

    pub fn reset_interface(&mut self) {
        self.terminal.reset();
    }

    /// Close the interface: on a clean shutdown, prompt for a final
    /// keypress first. Teardown happens regardless of prior errors.
    pub fn close_interface(&mut self, error_message: Option<&str>) -> Result<(), RuntimeError> {
        if error_message.is_none() && self.interface_open {
            let prompt: Vec<char> = format!("[{}]", self.locale.press_any_key_to_quit)
                .chars()
                .collect();
            self.output(&prompt)?;
            let active = self.active_window;
            self.flush_window(active)?;
            self.terminal.update_screen();
            while self.terminal.next_event(0) == Event::Winch {}
        }
        self.terminal.close(error_message);
        self.windows.clear();
        self.interface_open = false;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.interface_open
    }

    pub fn rows(&self) -> i32 {
        self.screen_height
    }

    pub fn columns(&self) -> i32 {
        self.screen_width
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The most recent resize, if the interpreter has not yet collected it.
    pub fn take_resize_notification(&mut self) -> Option<(i32, i32)> {
        self.resize_notification.take()
    }

    // Capabilities

    pub fn is_status_line_available(&self) -> bool {
        true
    }

    pub fn is_split_screen_available(&self) -> bool {
        true
    }

    pub fn is_variable_pitch_font_default(&self) -> bool {
        false
    }

    pub fn is_colour_available(&self) -> bool {
        self.using_colors
    }

    pub fn is_picture_displaying_available(&self) -> bool {
        false
    }

    pub fn is_bold_face_available(&self) -> bool {
        self.terminal.is_bold_available()
    }

    pub fn is_italic_available(&self) -> bool {
        self.terminal.is_italic_available()
    }

    pub fn is_fixed_space_font_available(&self) -> bool {
        true
    }

    pub fn is_timed_keyboard_input_available(&self) -> bool {
        self.terminal.is_input_timeout_available()
    }

    pub fn is_preloaded_input_available(&self) -> bool {
        true
    }

    pub fn is_character_graphics_font_available(&self) -> bool {
        true
    }

    pub fn is_picture_font_available(&self) -> bool {
        false
    }

    pub fn get_screen_height(&self) -> Result<u16, RuntimeError> {
        if self.screen_height < 1 {
            fatal_error!(ErrorCode::InterfaceNotOpen, "Screen height queried before linking")
        } else {
            Ok(self.screen_height as u16)
        }
    }

    pub fn get_screen_width(&self) -> Result<u16, RuntimeError> {
        if self.screen_width < 1 {
            fatal_error!(ErrorCode::InterfaceNotOpen, "Screen width queried before linking")
        } else {
            Ok(self.screen_width as u16)
        }
    }

    pub fn get_font_width(&self) -> u8 {
        1
    }

    pub fn get_font_height(&self) -> u8 {
        1
    }

    pub fn get_default_foreground_colour(&self) -> Color {
        self.default_colors.0
    }

    pub fn get_default_background_colour(&self) -> Color {
        self.default_colors.1
    }

    pub fn input_must_be_repeated_by_story(&self) -> bool {
        true
    }

    pub fn output_interface_info(&self) {
        println!("Display interface: {}", self.terminal.name());
        println!("{}", self.locale.version_message());
    }

    pub fn prompt_for_filename(&mut self, suggestion: &str) -> FilenamePrompt {
        self.terminal.prompt_for_filename(suggestion)
    }

    // Configuration surface

    pub fn parse_config_parameter(
        &mut self,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), RuntimeError> {
        trace!(target: "app::screen", "Config {} = {:?}", key, value);
        match key {
            "left-margin" | "right-margin" => {
                let value = match value {
                    Some(v) if !v.is_empty() => config::expand_home(v),
                    _ => {
                        return recoverable_error!(
                            ErrorCode::ConfigError,
                            "Missing value for {}",
                            key
                        )
                    }
                };
                match value.parse::<i32>() {
                    Ok(margin) => {
                        if key == "left-margin" {
                            self.custom_left_margin = margin.max(0);
                        } else {
                            self.custom_right_margin = margin.max(0);
                        }
                        Ok(())
                    }
                    Err(e) => recoverable_error!(
                        ErrorCode::ConfigError,
                        "Invalid {} value \"{}\": {}",
                        key,
                        value,
                        e
                    ),
                }
            }
            "disable-hyphenation" => {
                self.hyphenation_enabled = !config::boolean_value_set(value);
                Ok(())
            }
            "disable-color" => {
                self.color_disabled = config::boolean_value_set(value);
                Ok(())
            }
            "enable-color" => {
                self.color_disabled = !config::boolean_value_set(value);
                Ok(())
            }
            _ => {
                if self.terminal.parse_config_parameter(key, value) == 0 {
                    Ok(())
                } else {
                    recoverable_error!(ErrorCode::ConfigError, "Unknown config key {}", key)
                }
            }
        }
    }

    pub fn get_config_value(&self, key: &str) -> Option<String> {
        match key {
            "left-margin" => Some(format!("{}", self.custom_left_margin)),
            "right-margin" => Some(format!("{}", self.custom_right_margin)),
            "disable-hyphenation" => Some(bool_value(!self.hyphenation_enabled)),
            "disable-color" => Some(bool_value(self.color_disabled)),
            "enable-color" => Some(bool_value(!self.color_disabled)),
            _ => self.terminal.get_config_value(key),
        }
    }

    pub fn get_config_option_names(&self) -> Vec<String> {
        let mut names = vec![
            "left-margin".to_string(),
            "right-margin".to_string(),
            "disable-hyphenation".to_string(),
            "disable-color".to_string(),
        ];
        names.extend(self.terminal.config_option_names());
        names
    }

    // Output pipeline

    /// Write interpreter output to the active window.
    pub fn output(&mut self, text: &[char]) -> Result<(), RuntimeError> {
        if self.windows.is_empty() {
            return recoverable_error!(ErrorCode::InterfaceNotOpen, "Output before linking");
        }
        if text.is_empty() {
            return Ok(());
        }
        trace!(target: "app::screen", "Output {} chars to window {}", text.len(), self.active_window);
        if self.active_window == 0 && !self.replaying_history {
            self.history.record_text(text);
        }
        let active = self.active_window;
        if self.windows[active].buffering {
            let emissions = self.windows[active].wrapper.wrap(text);
            self.route_emissions(active, emissions)
        } else {
            self.update_output_colours(active);
            self.update_output_text_style(active);
            self.window_target(active, text)
        }
    }

    /// Convenience for string literals.
    pub fn output_str(&mut self, text: &str) -> Result<(), RuntimeError> {
        let chars: Vec<char> = text.chars().collect();
        self.output(&chars)
    }

    /// Hand wrapper output to its destination: text to the window target,
    /// metadata to the window's output style and colours.
    fn route_emissions(
        &mut self,
        window: usize,
        emissions: Vec<WrapEmission>,
    ) -> Result<(), RuntimeError> {
        for emission in emissions {
            match emission {
                WrapEmission::Text(text) => self.window_target(window, &text)?,
                WrapEmission::Style(style) => self.windows[window].output_text_style.set(style),
                WrapEmission::Colours(foreground, background) => {
                    self.windows[window].output_foreground = foreground;
                    self.windows[window].output_background = background;
                }
            }
        }
        Ok(())
    }

    fn flush_window(&mut self, window: usize) -> Result<(), RuntimeError> {
        if self.windows[window].buffering {
            let emissions = self.windows[window].wrapper.flush();
            self.route_emissions(window, emissions)?;
        }
        Ok(())
    }

    pub(crate) fn flush_all_buffered_windows(&mut self) -> Result<(), RuntimeError> {
        for window in 0..self.windows.len() {
            self.flush_window(window)?;
        }
        Ok(())
    }

    fn update_output_colours(&mut self, window: usize) {
        if !self.using_colors {
            return;
        }
        let colors = (
            self.windows[window].output_foreground,
            self.windows[window].output_background,
        );
        if self.current_output_colors != Some(colors) {
            self.terminal.set_colors(colors);
            self.current_output_colors = Some(colors);
        }
    }

    fn update_output_text_style(&mut self, window: usize) {
        let style = self.windows[window].output_text_style;
        if self.current_output_text_style != Some(style) {
            self.terminal.set_text_style(style);
            self.current_output_text_style = Some(style);
        }
    }

    pub(crate) fn refresh_cursor(&mut self, window: usize) {
        let w = &self.windows[window];
        self.terminal
            .goto_yx(w.ypos + w.ycursorpos - 1, w.xpos + w.xcursorpos - 1);
    }

    pub(crate) fn switch_to_window(&mut self, window: usize) {
        trace!(target: "app::screen", "Switching to window {}", window);
        self.active_window = window;
        self.refresh_cursor(window);
    }

    pub(crate) fn active_window(&self) -> usize {
        self.active_window
    }

    /// Clear to the end of the line with reverse video off, so margins and
    /// vacated cells stay in the background colour.
    pub(crate) fn clear_to_eol_no_reverse(&mut self, window: usize) {
        let mut style = self.windows[window].output_text_style;
        style.clear(Style::Reverse as u8);
        self.terminal.set_text_style(style);
        self.terminal.clear_to_eol();
        let style = self.windows[window].output_text_style;
        self.terminal.set_text_style(style);
        self.current_output_text_style = Some(style);
    }

    /// Put a run of characters into one window, breaking lines at the
    /// window edge, scrolling (or protecting refresh margins) at the
    /// bottom, and pausing for \[MORE\] when a wrapping window fills.
    pub(crate) fn window_target(
        &mut self,
        window: usize,
        text: &[char],
    ) -> Result<(), RuntimeError> {
        if text.is_empty() || self.windows[window].ysize < 1 {
            return Ok(());
        }

        {
            let w = &mut self.windows[window];
            if w.ycursorpos - 1 + w.lowermargin >= w.ysize {
                w.ycursorpos = w.ysize - w.lowermargin;
            }
        }

        self.update_output_colours(window);
        self.update_output_text_style(window);
        self.refresh_cursor(window);

        let mut rest = text;
        while !rest.is_empty() {
            let w = &self.windows[window];
            let mut space_on_line = w.xsize - w.rightmargin - (w.xcursorpos - 1);
            let newline = rest.iter().position(|&c| c == '\n');

            if space_on_line <= 0 && !w.wrapping {
                // Nothing more fits; without wrapping, just advance to the
                // next line of the run, or quit at the window bottom.
                match newline {
                    Some(p) if w.ycursorpos < w.ysize => {
                        rest = &rest[p + 1..];
                        let w = &mut self.windows[window];
                        if w.lines_to_skip > 0 {
                            w.lines_to_skip -= 1;
                        } else {
                            w.xcursorpos = 1 + w.leftmargin;
                            w.ycursorpos += 1;
                        }
                        continue;
                    }
                    _ => return Ok(()),
                }
            }

            if space_on_line < 0 {
                // Cursor moved off the right side of a non-wrapping window
                space_on_line = 0;
            }

            let linebreak = match newline {
                Some(p) if p as i32 <= space_on_line => Some(p),
                _ => {
                    if rest.len() as i32 > space_on_line {
                        Some(space_on_line as usize)
                    } else {
                        None
                    }
                }
            };

            let emit_len = linebreak.unwrap_or(rest.len());
            {
                let w = &self.windows[window];
                if w.lines_to_skip < 1 && w.remaining_lines_to_fill != 0 {
                    self.refresh_cursor(window);
                    let slice = &rest[..emit_len];
                    self.terminal.output(slice);
                    if window == 1 {
                        let (y, x) = self.windows[window].cursor();
                        let style = self.windows[window].output_text_style.mask();
                        let colors = (
                            self.windows[window].output_foreground,
                            self.windows[window].output_background,
                        );
                        for (i, &c) in slice.iter().enumerate() {
                            self.blockbuf.set(y, x + i as i32, c, style, colors);
                        }
                    }
                    self.windows[window].xcursorpos += emit_len as i32;
                }
            }

            match linebreak {
                None => {
                    rest = &rest[emit_len..];
                }
                Some(b) => {
                    let w = &self.windows[window];
                    if w.lines_to_skip < 1
                        && w.remaining_lines_to_fill != 0
                        && w.remaining_lines_to_fill != 1
                    {
                        // Keep margins clean while scrolling
                        self.terminal.set_text_style(CellStyle::new());
                        self.windows[window].xcursorpos = 1;

                        let w = &self.windows[window];
                        if w.ycursorpos + w.lowermargin == w.ysize && w.wrapping {
                            let (ypos, xpos) = (w.ypos, w.xpos);
                            let (upper, lower) = (w.uppermargin, w.lowermargin);
                            let (ysize, xsize) = (w.ysize, w.xsize);
                            self.terminal.copy_area(
                                ypos + upper,
                                xpos,
                                ypos + upper + 1,
                                xpos,
                                ysize - lower - upper - 1,
                                xsize,
                            );
                            self.refresh_cursor(window);
                            self.clear_to_eol_no_reverse(window);
                        } else {
                            self.windows[window].ycursorpos += 1;
                            self.refresh_cursor(window);
                        }

                        self.windows[window].xcursorpos = 1 + self.windows[window].leftmargin;
                        self.refresh_cursor(window);
                        let style = self.windows[window].output_text_style;
                        self.terminal.set_text_style(style);
                        self.current_output_text_style = Some(style);
                    } else {
                        self.windows[window].xcursorpos = 1 + self.windows[window].leftmargin;
                    }

                    rest = &rest[b..];
                    if rest.first() == Some(&'\n') {
                        rest = &rest[1..];
                    }

                    if self.windows[window].wrapping {
                        self.windows[window].nof_consecutive_lines_output += 1;
                        if self.more_prompt_due(window) && self.show_more_prompt(window)? {
                            // Screen size changed under the prompt; the rest
                            // of this run is abandoned and repainted from
                            // history before the next input.
                            return Ok(());
                        }
                    }

                    let w = &mut self.windows[window];
                    if w.lines_to_skip > 0 {
                        w.lines_to_skip -= 1;
                    } else if w.remaining_lines_to_fill > 0 {
                        w.remaining_lines_to_fill -= 1;
                    }
                }
            }
        }

        Ok(())
    }

    fn more_prompt_due(&self, window: usize) -> bool {
        let w = &self.windows[window];
        w.nof_consecutive_lines_output == w.ysize - 1
            && !self.disable_more_prompt
            && !self.winch_pending
            && w.remaining_lines_to_fill != 0
            && w.lines_to_skip < 1
    }

    /// Display \[MORE\] and wait for a key. Returns true when the wait was
    /// broken by a screen resize.
    fn show_more_prompt(&mut self, window: usize) -> Result<bool, RuntimeError> {
        debug!(target: "app::screen", "[MORE] in window {}", window);
        for i in 0..self.windows.len() {
            if i != window && self.windows[i].buffering {
                let emissions = self.windows[i].wrapper.flush();
                self.route_emissions(i, emissions)?;
            }
        }

        let prompt = self.more_prompt.clone();
        self.terminal.output(&prompt);
        self.terminal.update_screen();
        self.refresh_cursor(window);

        let event = loop {
            let event = self.terminal.next_event(0);
            if event != Event::Timeout {
                break event;
            }
        };

        self.windows[window].xcursorpos = self.windows[window].leftmargin + 1;
        self.refresh_cursor(window);
        self.clear_to_eol_no_reverse(window);

        if event == Event::Winch {
            self.winch_pending = true;
            return Ok(true);
        }

        self.windows[window].nof_consecutive_lines_output = 0;
        Ok(false)
    }

    // Window operations

    /// Change the style for subsequent output in all game windows.
    pub fn set_text_style(&mut self, style: u8) {
        trace!(target: "app::screen", "Text style {}", style);
        if !self.replaying_history {
            self.history.record_style(style);
        }
        for i in 0..self.windows.len() {
            if Some(i) == self.statusline_window_id {
                continue;
            }
            self.windows[i].text_style.set(style);
            if self.windows[i].buffering {
                self.windows[i].wrapper.insert_metadata(Metadata::Style(style));
            } else {
                self.windows[i].output_text_style.set(style);
            }
        }
    }

    /// Change colours for one game window, or all of them with window -1.
    pub fn set_colour(
        &mut self,
        foreground: u8,
        background: u8,
        window: i16,
    ) -> Result<(), RuntimeError> {
        if !self.using_colors {
            return Ok(());
        }
        let highest = self.highest_game_window() as i16;
        let (start, end) = if window == -1 {
            (0, highest)
        } else if (0..=highest).contains(&window) {
            (window, window)
        } else {
            return Ok(());
        };

        for i in start..=end {
            let i = i as usize;
            let fg = self.resolve_colour(foreground, self.windows[i].output_foreground, self.default_colors.0)?;
            let bg = self.resolve_colour(background, self.windows[i].output_background, self.default_colors.1)?;
            if i == 0 && !self.replaying_history {
                self.history.record_colours(fg, bg);
            }
            self.windows[i].foreground = fg;
            self.windows[i].background = bg;
            if self.windows[i].buffering {
                self.windows[i]
                    .wrapper
                    .insert_metadata(Metadata::Colours(fg, bg));
            } else {
                self.windows[i].output_foreground = fg;
                self.windows[i].output_background = bg;
            }
        }
        Ok(())
    }

    fn resolve_colour(
        &self,
        code: u8,
        current: Color,
        default: Color,
    ) -> Result<Color, RuntimeError> {
        match code {
            0 => Ok(current),
            1 => Ok(default),
            _ => Color::from_code(code),
        }
    }

    /// Fonts other than the normal one are unavailable; the request is
    /// accepted and ignored.
    pub fn set_font(&mut self, _font: u8) {}

    /// Buffering is fixed per window in this design.
    pub fn set_buffer_mode(&mut self, _mode: u16) {}

    fn highest_game_window(&self) -> usize {
        self.windows
            .len()
            .saturating_sub(1 + usize::from(self.statusline_window_id.is_some()))
    }

    pub fn split_window(&mut self, lines: i16) -> Result<(), RuntimeError> {
        if lines < 0 || self.windows.len() < 2 {
            return Ok(());
        }
        let lines = (lines as i32).min(self.screen_height);
        let delta = lines - self.windows[1].ysize;
        debug!(target: "app::screen", "Split to {} lines (delta {})", lines, delta);

        if delta != 0 {
            self.flush_window(0)?;

            {
                let w0 = &mut self.windows[0];
                w0.ysize -= delta;
                w0.scrollback_top_line -= delta;
                w0.ycursorpos -= delta;
                w0.ypos += delta;
                if w0.ycursorpos < 1 {
                    w0.xcursorpos = 1;
                    w0.ycursorpos = 1;
                }
            }
            {
                let w1 = &mut self.windows[1];
                w1.ysize += delta;
                w1.scrollback_top_line += delta;
                if w1.ycursorpos > w1.ysize {
                    w1.xcursorpos = 1;
                    w1.ycursorpos = 1;
                }
            }

            if self.version == 3 {
                let w1 = &self.windows[1];
                let (xpos, ypos, xsize, ysize) = (w1.xpos, w1.ypos, w1.xsize, w1.ysize);
                self.terminal.clear_area(xpos, ypos, xsize, ysize);
                self.blockbuf.clear_rows(1, ysize);
            }
        }

        self.last_split_window_size = lines;
        Ok(())
    }

    pub fn set_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        if self.windows.is_empty() {
            return recoverable_error!(ErrorCode::InterfaceNotOpen, "set_window before linking");
        }
        if window < 0 || window as usize > self.highest_game_window() {
            return recoverable_error!(ErrorCode::InvalidWindow, "Invalid window {}", window);
        }
        if self.version != 6 && window == 1 {
            self.windows[1].ycursorpos = 1;
            self.windows[1].xcursorpos = 1;
        }
        self.switch_to_window(window as usize);
        Ok(())
    }

    pub fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        if self.windows.is_empty() {
            return recoverable_error!(ErrorCode::InterfaceNotOpen, "erase_window before linking");
        }
        debug!(target: "app::screen", "Erase window {}", window);
        match window {
            -1 => {
                // Collapse the upper window, clear everything, home the
                // cursor and select window 0.
                self.flush_all_buffered_windows()?;
                self.split_window(0)?;
                self.erase_full_screen();
                self.active_window = 0;
                self.refresh_cursor(0);
                Ok(())
            }
            -2 => {
                self.flush_all_buffered_windows()?;
                self.erase_full_screen();
                self.refresh_cursor(self.active_window);
                Ok(())
            }
            w if w >= 0 && (w as usize) < self.windows.len() => {
                let window = w as usize;
                self.flush_window(window)?;
                self.update_output_colours(window);

                let mut style = self.windows[window].output_text_style;
                style.clear(Style::Reverse as u8);
                self.terminal.set_text_style(style);

                let (xpos, ypos, xsize, ysize) = {
                    let w = &self.windows[window];
                    (w.xpos, w.ypos, w.xsize, w.ysize)
                };
                self.terminal.clear_area(xpos, ypos, xsize, ysize);

                let style = self.windows[window].output_text_style;
                self.terminal.set_text_style(style);
                self.current_output_text_style = Some(style);

                if window == 1 {
                    self.blockbuf.clear_rows(1, ysize);
                }

                let version = self.version;
                let w = &mut self.windows[window];
                w.xcursorpos = 1 + w.leftmargin;
                w.ycursorpos = if version >= 5 { 1 } else { w.ysize.max(1) };
                w.nof_consecutive_lines_output = 0;
                Ok(())
            }
            _ => recoverable_error!(ErrorCode::InvalidWindow, "Invalid window {}", window),
        }
    }

    fn erase_full_screen(&mut self) {
        if self.windows.is_empty() {
            return;
        }
        self.update_output_colours(0);
        self.terminal
            .clear_area(1, 1, self.screen_width, self.screen_height);
        self.blockbuf.clear_rows(1, self.screen_height);
        let version = self.version;
        for w in self.windows.iter_mut() {
            w.xcursorpos = 1 + w.leftmargin;
            w.ycursorpos = if version >= 5 { 1 } else { w.ysize.max(1) };
            w.nof_consecutive_lines_output = 0;
        }
    }

    pub fn set_cursor(&mut self, line: i16, column: i16, window: i16) -> Result<(), RuntimeError> {
        if self.windows.is_empty()
            || window < 0
            || window as usize > self.highest_game_window()
        {
            return Ok(());
        }
        let window = window as usize;
        self.flush_window(window)?;

        if column < 0 {
            return Ok(());
        }
        if line < 0 {
            if self.version < 6 {
                return Ok(());
            }
            match line {
                -1 => self.terminal.set_cursor_visibility(false),
                -2 => self.terminal.set_cursor_visibility(true),
                _ => {}
            }
            return Ok(());
        }

        {
            let w = &mut self.windows[window];
            w.ycursorpos = (line as i32).clamp(1, w.ysize.max(1));
            let column = column as i32;
            w.xcursorpos = if column > w.xsize {
                if w.wrapping {
                    w.xsize
                } else {
                    w.xsize + 1
                }
            } else {
                column.max(1)
            };
        }
        self.refresh_cursor(window);
        Ok(())
    }

    pub fn get_cursor_row(&self) -> u16 {
        match self.windows.get(self.active_window) {
            Some(w) => (w.ypos + w.ycursorpos - 1) as u16,
            None => 0,
        }
    }

    pub fn get_cursor_column(&self) -> u16 {
        match self.windows.get(self.active_window) {
            Some(w) => (w.xpos + w.xcursorpos - 1) as u16,
            None => 0,
        }
    }

    // Status line

    /// Render the V3 status line: room description on the left, score and
    /// turns (or the time) right-aligned, reverse video throughout.
    pub fn show_status(
        &mut self,
        room_description: &[char],
        mode: StatusMode,
        parameter1: i16,
        parameter2: i16,
    ) -> Result<(), RuntimeError> {
        self.last_status = Some((room_description.to_vec(), mode, parameter1, parameter2));
        let status_id = match self.statusline_window_id {
            Some(id) => id,
            None => return Ok(()),
        };

        let last_active = self.active_window;
        self.switch_to_window(status_id);
        self.erase_window(status_id as i16)?;

        self.windows[status_id].ycursorpos = 1;
        self.windows[status_id].xcursorpos = 1;
        self.refresh_cursor(status_id);
        self.output(&[' '])?;

        let xsize = self.windows[status_id].xsize;
        match mode {
            StatusMode::ScoreAndTurn => {
                let mut rightside: Vec<char> = Vec::new();
                rightside.extend(&self.score_label);
                rightside.extend(format!(": {}  ", parameter1).chars());
                rightside.extend(&self.turns_label);
                rightside.extend(format!(": {}", parameter2).chars());
                let rightside_length = rightside.len() as i32 + 1;

                let room_desc_space = xsize - rightside_length - 3;
                let room = truncated(room_description, room_desc_space);
                self.output(room)?;

                while self.windows[status_id].xcursorpos < xsize - rightside_length + 1 {
                    self.output(&[' '])?;
                }
                self.windows[status_id].xcursorpos = xsize - rightside_length + 1;
                self.refresh_cursor(status_id);
                self.output(&rightside)?;
            }
            StatusMode::Time => {
                let room_desc_space = xsize - 8;
                let room = truncated(room_description, room_desc_space);
                self.output(room)?;

                while self.windows[status_id].xcursorpos < xsize - 5 {
                    self.output(&[' '])?;
                }
                self.windows[status_id].xcursorpos = xsize - 5;
                self.refresh_cursor(status_id);
                let time: Vec<char> = format!("{:02}:{:02}", parameter1, parameter2)
                    .chars()
                    .collect();
                self.output(&time)?;
            }
        }
        self.output(&[' '])?;

        self.switch_to_window(last_active);
        Ok(())
    }
}

fn bool_value(value: bool) -> String {
    if value {
        CONFIG_TRUE_VALUE.to_string()
    } else {
        CONFIG_FALSE_VALUE.to_string()
    }
}

fn truncated(text: &[char], space: i32) -> &[char] {
    if space >= 0 && (space as usize) < text.len() {
        &text[..space as usize]
    } else {
        text
    }
}
