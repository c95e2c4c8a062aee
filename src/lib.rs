//! Monospace screen interface layer for Z-Machine interpreters.
//!
//! This crate mediates between an interpreter core, which produces styled
//! text output and requests keyboard input, and a cell-addressed monospace
//! display backend. It implements Z-Machine screen semantics on top of the
//! backend primitives: windows and split screens, the V3 status line,
//! buffered word-wrapped output with \[MORE\] pagination, an input line
//! editor with command-history recall, and scroll-back driven by a
//! replayable output history.
#![crate_name = "zscreen"]

#[macro_use]
extern crate log;

pub mod cmd_history;
pub mod config;
pub mod error;
pub mod history;
pub mod locales;
pub mod screen;
pub mod wordwrap;
pub mod zscii;

#[cfg(test)]
pub mod test_util;
