//! Shared state and helpers for unit tests.
//!
//! The test terminal maintains a real cell grid honouring the backend
//! primitives, so tests can assert what is visible on screen after window
//! operations, refreshes and scroll-back.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::screen::{Color, Event};

pub struct Grid {
    rows: i32,
    columns: i32,
    cells: Vec<Vec<char>>,
    cursor: (i32, i32),
}

impl Grid {
    fn new(rows: i32, columns: i32) -> Grid {
        Grid {
            rows,
            columns,
            cells: vec![vec![' '; columns as usize]; rows as usize],
            cursor: (1, 1),
        }
    }

    fn goto(&mut self, row: i32, column: i32) {
        self.cursor = (row, column);
    }

    fn put(&mut self, c: char) {
        let (row, column) = self.cursor;
        if row >= 1 && row <= self.rows && column >= 1 && column <= self.columns {
            self.cells[row as usize - 1][column as usize - 1] = c;
        }
        self.cursor = (row, column + 1);
    }

    fn clear_area(&mut self, x: i32, y: i32, width: i32, height: i32) {
        for row in y..y + height {
            for column in x..x + width {
                if row >= 1 && row <= self.rows && column >= 1 && column <= self.columns {
                    self.cells[row as usize - 1][column as usize - 1] = ' ';
                }
            }
        }
    }

    fn clear_to_eol(&mut self) {
        let (row, column) = self.cursor;
        if row >= 1 && row <= self.rows {
            for c in column.max(1)..=self.columns {
                self.cells[row as usize - 1][c as usize - 1] = ' ';
            }
        }
    }

    fn copy_area(&mut self, dst_y: i32, dst_x: i32, src_y: i32, src_x: i32, height: i32, width: i32) {
        let mut source = Vec::new();
        for row in 0..height {
            let mut line = Vec::new();
            for column in 0..width {
                let (y, x) = (src_y + row, src_x + column);
                line.push(if y >= 1 && y <= self.rows && x >= 1 && x <= self.columns {
                    self.cells[y as usize - 1][x as usize - 1]
                } else {
                    ' '
                });
            }
            source.push(line);
        }
        for (row, line) in source.iter().enumerate() {
            for (column, &c) in line.iter().enumerate() {
                let (y, x) = (dst_y + row as i32, dst_x + column as i32);
                if y >= 1 && y <= self.rows && x >= 1 && x <= self.columns {
                    self.cells[y as usize - 1][x as usize - 1] = c;
                }
            }
        }
    }

    fn row(&self, row: i32) -> String {
        if row >= 1 && row <= self.rows {
            let line: String = self.cells[row as usize - 1].iter().collect();
            line.trim_end().to_string()
        } else {
            String::new()
        }
    }
}

thread_local! {
    pub static GRID: RefCell<Grid> = RefCell::new(Grid::new(24, 80));
    pub static EVENTS: RefCell<VecDeque<Event>> = RefCell::new(VecDeque::new());
    pub static PRINT: RefCell<String> = RefCell::new(String::new());
    pub static STYLES: RefCell<Vec<u8>> = RefCell::new(Vec::new());
    pub static COLORS: RefCell<Vec<(Color, Color)>> = RefCell::new(Vec::new());
    pub static CURSOR_VISIBLE: RefCell<bool> = RefCell::new(true);
    pub static UPDATES: RefCell<u32> = RefCell::new(0);
    pub static CLOSED: RefCell<bool> = RefCell::new(false);
    pub static TIMEOUTS: RefCell<Vec<u16>> = RefCell::new(Vec::new());
    pub static BACKEND_CONFIG: RefCell<Option<String>> = RefCell::new(None);
}

pub fn reset() {
    let (rows, columns) = size();
    GRID.with(|g| *g.borrow_mut() = Grid::new(rows, columns));
    EVENTS.with(|e| e.borrow_mut().clear());
    PRINT.with(|p| p.borrow_mut().clear());
    STYLES.with(|s| s.borrow_mut().clear());
    COLORS.with(|c| c.borrow_mut().clear());
    CURSOR_VISIBLE.with(|v| *v.borrow_mut() = true);
    UPDATES.with(|u| *u.borrow_mut() = 0);
    CLOSED.with(|c| *c.borrow_mut() = false);
    TIMEOUTS.with(|t| t.borrow_mut().clear());
    BACKEND_CONFIG.with(|b| *b.borrow_mut() = None);
}

pub fn size() -> (i32, i32) {
    GRID.with(|g| {
        let g = g.borrow();
        (g.rows, g.columns)
    })
}

/// Change the reported screen size; the grid starts over blank.
pub fn set_size(rows: i32, columns: i32) {
    GRID.with(|g| *g.borrow_mut() = Grid::new(rows, columns));
}

pub fn goto(row: i32, column: i32) {
    GRID.with(|g| g.borrow_mut().goto(row, column));
}

pub fn put_text(text: &[char]) {
    GRID.with(|g| {
        let mut g = g.borrow_mut();
        for &c in text {
            g.put(c);
        }
    });
    PRINT.with(|p| p.borrow_mut().extend(text.iter()));
}

pub fn clear_area(x: i32, y: i32, width: i32, height: i32) {
    GRID.with(|g| g.borrow_mut().clear_area(x, y, width, height));
}

pub fn clear_to_eol() {
    GRID.with(|g| g.borrow_mut().clear_to_eol());
}

pub fn copy_area(dst_y: i32, dst_x: i32, src_y: i32, src_x: i32, height: i32, width: i32) {
    GRID.with(|g| g.borrow_mut().copy_area(dst_y, dst_x, src_y, src_x, height, width));
}

/// Visible text of a screen row, right-trimmed
pub fn row(row_number: i32) -> String {
    GRID.with(|g| g.borrow().row(row_number))
}

pub fn cell(row: i32, column: i32) -> char {
    GRID.with(|g| {
        let g = g.borrow();
        if row >= 1 && row <= g.rows && column >= 1 && column <= g.columns {
            g.cells[row as usize - 1][column as usize - 1]
        } else {
            ' '
        }
    })
}

pub fn cursor() -> (i32, i32) {
    GRID.with(|g| g.borrow().cursor)
}

pub fn queue_event(event: Event) {
    EVENTS.with(|e| e.borrow_mut().push_back(event));
}

pub fn queue_input(text: &str) {
    for c in text.chars() {
        queue_event(Event::Input(c));
    }
}

pub fn next_queued_event() -> Option<Event> {
    EVENTS.with(|e| e.borrow_mut().pop_front())
}

/// Everything ever sent to the terminal, in emission order
pub fn printed() -> String {
    PRINT.with(|p| p.borrow().clone())
}

pub fn clear_printed() {
    PRINT.with(|p| p.borrow_mut().clear());
}

pub fn push_style(style: u8) {
    STYLES.with(|s| s.borrow_mut().push(style));
}

pub fn styles() -> Vec<u8> {
    STYLES.with(|s| s.borrow().clone())
}

pub fn push_colors(colors: (Color, Color)) {
    COLORS.with(|c| c.borrow_mut().push(colors));
}

pub fn colors() -> Vec<(Color, Color)> {
    COLORS.with(|c| c.borrow().clone())
}

pub fn set_cursor_visible(visible: bool) {
    CURSOR_VISIBLE.with(|v| *v.borrow_mut() = visible);
}

pub fn cursor_visible() -> bool {
    CURSOR_VISIBLE.with(|v| *v.borrow())
}

pub fn count_update() {
    UPDATES.with(|u| *u.borrow_mut() += 1);
}

pub fn updates() -> u32 {
    UPDATES.with(|u| *u.borrow())
}

pub fn set_closed() {
    CLOSED.with(|c| *c.borrow_mut() = true);
}

pub fn closed() -> bool {
    CLOSED.with(|c| *c.borrow())
}

pub fn record_timeout(timeout: u16) {
    TIMEOUTS.with(|t| t.borrow_mut().push(timeout));
}

pub fn timeouts() -> Vec<u16> {
    TIMEOUTS.with(|t| t.borrow().clone())
}

pub fn set_backend_config(value: Option<String>) {
    BACKEND_CONFIG.with(|b| *b.borrow_mut() = value);
}

pub fn backend_config() -> Option<String> {
    BACKEND_CONFIG.with(|b| b.borrow().clone())
}

#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {{
        let result = $expr;
        assert!(result.is_ok(), "Expected Ok: {:?}", result.err());
        result.unwrap()
    }};
}

#[macro_export]
macro_rules! assert_ok_eq {
    ($expr:expr, $value:expr) => {{
        let result = $expr;
        assert!(result.is_ok(), "Expected Ok: {:?}", result.err());
        assert_eq!(result.unwrap(), $value);
    }};
}

#[macro_export]
macro_rules! assert_some_eq {
    ($expr:expr, $value:expr) => {
        assert_eq!($expr, Some($value))
    };
}

#[macro_export]
macro_rules! assert_print {
    ($value:expr) => {
        assert_eq!($crate::test_util::printed(), $value)
    };
}

#[macro_export]
macro_rules! assert_row {
    ($row:expr, $value:expr) => {
        assert_eq!($crate::test_util::row($row), $value)
    };
}
