//! Curses backend.

use pancurses::{
    Input, ALL_MOUSE_EVENTS, A_BOLD, A_REVERSE, A_UNDERLINE, COLOR_BLACK, COLOR_BLUE, COLOR_CYAN,
    COLOR_GREEN, COLOR_MAGENTA, COLOR_RED, COLOR_WHITE, COLOR_YELLOW,
};

use crate::screen::{CellStyle, Color, Event, Style, Terminal};

pub struct PCTerminal {
    window: pancurses::Window,
    style: CellStyle,
    colors: (Color, Color),
}

/// Color pair index for a (foreground, background) combination.
/// Colors are 0-7, 3 bits each; pair 0 is reserved by curses.
fn cp(fg: i16, bg: i16) -> i16 {
    ((fg << 3) & 0x38) + (bg & 0x07) + 1
}

pub fn new_terminal() -> Box<dyn Terminal> {
    Box::new(PCTerminal::new())
}

fn as_curses_color(color: Color) -> i16 {
    match color {
        Color::Black => COLOR_BLACK,
        Color::Red => COLOR_RED,
        Color::Green => COLOR_GREEN,
        Color::Yellow => COLOR_YELLOW,
        Color::Blue => COLOR_BLUE,
        Color::Magenta => COLOR_MAGENTA,
        Color::Cyan => COLOR_CYAN,
        Color::White => COLOR_WHITE,
    }
}

fn map_input(input: Input) -> Option<Event> {
    match input {
        Input::Character(c) => match c {
            '\u{01}' => Some(Event::CtrlA),
            '\u{05}' => Some(Event::CtrlE),
            '\u{0c}' => Some(Event::CtrlL),
            '\u{12}' => Some(Event::CtrlR),
            '\u{1b}' => Some(Event::Escape),
            '\u{08}' | '\u{7f}' => Some(Event::Backspace),
            '\r' | '\n' => Some(Event::Input('\n')),
            _ => Some(Event::Input(c)),
        },
        Input::KeyBackspace => Some(Event::Backspace),
        Input::KeyDC => Some(Event::Delete),
        Input::KeyUp => Some(Event::CursorUp),
        Input::KeyDown => Some(Event::CursorDown),
        Input::KeyLeft => Some(Event::CursorLeft),
        Input::KeyRight => Some(Event::CursorRight),
        Input::KeyPPage => Some(Event::PageUp),
        Input::KeyNPage => Some(Event::PageDown),
        Input::KeyHome => Some(Event::CtrlA),
        Input::KeyEnd => Some(Event::CtrlE),
        Input::KeyResize => {
            pancurses::resize_term(0, 0);
            Some(Event::Winch)
        }
        _ => {
            trace!(target: "app::input", "Unmapped input {:?}", input);
            None
        }
    }
}

impl PCTerminal {
    pub fn new() -> PCTerminal {
        info!(target: "app::screen", "Initialize pancurses terminal");
        let window = pancurses::initscr();
        pancurses::noecho();
        pancurses::cbreak();
        pancurses::raw();
        pancurses::start_color();
        pancurses::mousemask(ALL_MOUSE_EVENTS, None);

        window.keypad(true);
        window.clear();
        window.refresh();

        // Initialize fg/bg color pairs
        for fg in 0..8 {
            for bg in 0..8 {
                pancurses::init_pair(cp(fg, bg), fg, bg);
            }
        }

        PCTerminal {
            window,
            style: CellStyle::new(),
            colors: (Color::White, Color::Black),
        }
    }

    fn apply_attributes(&self) {
        let mut attributes = 0;
        if self.style.is_style(Style::Bold) {
            attributes |= A_BOLD;
        }
        if self.style.is_style(Style::Italic) {
            attributes |= A_UNDERLINE;
        }
        if self.style.is_style(Style::Reverse) {
            attributes |= A_REVERSE;
        }
        self.window.attrset(attributes);
        self.window
            .color_set(cp(as_curses_color(self.colors.0), as_curses_color(self.colors.1)));
    }
}

impl Default for PCTerminal {
    fn default() -> Self {
        PCTerminal::new()
    }
}

impl Terminal for PCTerminal {
    fn name(&self) -> &str {
        "pancurses"
    }

    fn size(&self) -> (i32, i32) {
        self.window.get_max_yx()
    }

    fn default_colors(&self) -> (Color, Color) {
        (Color::White, Color::Black)
    }

    fn is_colour_available(&self) -> bool {
        pancurses::has_colors()
    }

    fn is_bold_available(&self) -> bool {
        true
    }

    fn is_italic_available(&self) -> bool {
        true
    }

    fn is_input_timeout_available(&self) -> bool {
        true
    }

    fn goto_yx(&mut self, row: i32, column: i32) {
        self.window.mv(row - 1, column - 1);
    }

    fn output(&mut self, text: &[char]) {
        self.apply_attributes();
        let s: String = text.iter().collect();
        self.window.addstr(s);
    }

    fn set_text_style(&mut self, style: CellStyle) {
        self.style = style;
        self.apply_attributes();
    }

    fn set_colors(&mut self, colors: (Color, Color)) {
        self.colors = colors;
        self.apply_attributes();
    }

    fn clear_area(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.apply_attributes();
        for row in y..y + height {
            for column in x..x + width {
                self.window.mvaddch(row - 1, column - 1, ' ');
            }
        }
    }

    fn clear_to_eol(&mut self) {
        self.apply_attributes();
        self.window.clrtoeol();
    }

    fn copy_area(
        &mut self,
        dst_y: i32,
        dst_x: i32,
        src_y: i32,
        src_x: i32,
        height: i32,
        width: i32,
    ) {
        // Read the source rectangle first; source and destination overlap
        // when scrolling.
        let mut buffer = Vec::new();
        for row in 0..height {
            let mut line = Vec::new();
            for column in 0..width {
                line.push(self.window.mvinch(src_y + row - 1, src_x + column - 1));
            }
            buffer.push(line);
        }
        for (row, line) in buffer.iter().enumerate() {
            for (column, &ch) in line.iter().enumerate() {
                self.window
                    .mvaddch(dst_y + row as i32 - 1, dst_x + column as i32 - 1, ch);
            }
        }
    }

    fn set_cursor_visibility(&mut self, visible: bool) {
        pancurses::curs_set(i32::from(visible));
    }

    fn update_screen(&mut self) {
        self.window.refresh();
    }

    fn redraw_screen_from_scratch(&mut self) {
        self.window.touch();
        self.window.refresh();
    }

    fn next_event(&mut self, timeout_millis: u16) -> Event {
        if timeout_millis == 0 {
            self.window.timeout(-1);
        } else {
            self.window.timeout(timeout_millis as i32);
        }
        loop {
            match self.window.getch() {
                None => return Event::Timeout,
                Some(input) => {
                    if let Some(event) = map_input(input) {
                        return event;
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.window.refresh();
    }

    fn close(&mut self, error_message: Option<&str>) {
        info!(target: "app::screen", "Closing pancurses terminal");
        pancurses::curs_set(1);
        pancurses::endwin();
        pancurses::doupdate();
        if let Some(message) = error_message {
            eprintln!("{}", message);
        }
    }

    fn set_window_title(&mut self, title: &str) {
        // xterm title escape; harmless elsewhere
        print!("\u{1b}]0;{}\u{07}", title);
    }
}
