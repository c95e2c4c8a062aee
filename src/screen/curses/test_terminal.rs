//! Capturing terminal used by unit tests. All output lands in the
//! thread-local grid in `test_util`, and events come from its queue; an
//! empty queue yields a newline so read loops terminate.

use crate::screen::{CellStyle, Color, Event, Terminal};
use crate::test_util;

pub fn new_terminal() -> Box<dyn Terminal> {
    Box::new(TestTerminal {})
}

struct TestTerminal;

impl Terminal for TestTerminal {
    fn name(&self) -> &str {
        "test"
    }

    fn size(&self) -> (i32, i32) {
        test_util::size()
    }

    fn default_colors(&self) -> (Color, Color) {
        (Color::White, Color::Black)
    }

    fn is_colour_available(&self) -> bool {
        true
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
        test_util::goto(row, column);
    }

    fn output(&mut self, text: &[char]) {
        test_util::put_text(text);
    }

    fn set_text_style(&mut self, style: CellStyle) {
        test_util::push_style(style.mask());
    }

    fn set_colors(&mut self, colors: (Color, Color)) {
        test_util::push_colors(colors);
    }

    fn clear_area(&mut self, x: i32, y: i32, width: i32, height: i32) {
        test_util::clear_area(x, y, width, height);
    }

    fn clear_to_eol(&mut self) {
        test_util::clear_to_eol();
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
        test_util::copy_area(dst_y, dst_x, src_y, src_x, height, width);
    }

    fn set_cursor_visibility(&mut self, visible: bool) {
        test_util::set_cursor_visible(visible);
    }

    fn update_screen(&mut self) {
        test_util::count_update();
    }

    fn redraw_screen_from_scratch(&mut self) {}

    fn next_event(&mut self, timeout_millis: u16) -> Event {
        test_util::record_timeout(timeout_millis);
        test_util::next_queued_event().unwrap_or(Event::Input('\n'))
    }

    fn reset(&mut self) {}

    fn close(&mut self, _error_message: Option<&str>) {
        test_util::set_closed();
    }

    fn parse_config_parameter(&mut self, key: &str, value: Option<&str>) -> i32 {
        if key == "test-key" {
            test_util::set_backend_config(value.map(|v| v.to_string()));
            0
        } else {
            -1
        }
    }

    fn get_config_value(&self, key: &str) -> Option<String> {
        if key == "test-key" {
            test_util::backend_config()
        } else {
            None
        }
    }

    fn config_option_names(&self) -> Vec<String> {
        vec!["test-key".to_string()]
    }
}
