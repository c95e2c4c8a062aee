//! Upper window content buffer.
//!
//! Window 1 is not covered by the output history, so a full refresh redraws
//! it from this cell buffer instead, reproducing style and colour runs.

use crate::screen::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockCell {
    pub character: char,
    pub style: u8,
    pub foreground: Color,
    pub background: Color,
}

#[derive(Debug)]
pub(crate) struct BlockBuf {
    width: i32,
    height: i32,
    default_cell: BlockCell,
    cells: Vec<BlockCell>,
}

impl BlockBuf {
    pub fn new(width: i32, height: i32, foreground: Color, background: Color) -> BlockBuf {
        let default_cell = BlockCell {
            character: ' ',
            style: 0,
            foreground,
            background,
        };
        BlockBuf {
            width: width.max(0),
            height: height.max(0),
            default_cell,
            cells: vec![default_cell; (width.max(0) * height.max(0)) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    fn index(&self, y: i32, x: i32) -> Option<usize> {
        if y >= 1 && y <= self.height && x >= 1 && x <= self.width {
            Some(((y - 1) * self.width + (x - 1)) as usize)
        } else {
            None
        }
    }

    pub fn set(&mut self, y: i32, x: i32, character: char, style: u8, colours: (Color, Color)) {
        if let Some(i) = self.index(y, x) {
            self.cells[i] = BlockCell {
                character,
                style,
                foreground: colours.0,
                background: colours.1,
            };
        }
    }

    pub fn cell(&self, y: i32, x: i32) -> BlockCell {
        match self.index(y, x) {
            Some(i) => self.cells[i],
            None => self.default_cell,
        }
    }

    /// Clear rows `top..=bottom` back to blanks.
    pub fn clear_rows(&mut self, top: i32, bottom: i32) {
        for y in top.max(1)..=bottom.min(self.height) {
            for x in 1..=self.width {
                if let Some(i) = self.index(y, x) {
                    self.cells[i] = self.default_cell;
                }
            }
        }
    }

    /// Resize, keeping whatever content still fits.
    pub fn resize(&mut self, width: i32, height: i32) {
        let width = width.max(0);
        let height = height.max(0);
        let mut cells = vec![self.default_cell; (width * height) as usize];
        for y in 1..=height.min(self.height) {
            for x in 1..=width.min(self.width) {
                if let Some(i) = self.index(y, x) {
                    cells[((y - 1) * width + (x - 1)) as usize] = self.cells[i];
                }
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
    }
}
