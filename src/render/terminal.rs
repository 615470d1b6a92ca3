//! Terminal renderer using crossterm.
//!
//! Enters raw mode on an alternate screen for the renderer's lifetime and
//! restores the terminal on drop, including on error paths.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::Print,
    terminal,
};

use super::FrameSink;
use crate::compute::Lattice;

const LIVE_GLYPH: char = '+';
const DEAD_GLYPH: char = '.';

/// Draws generations to stdout and watches for a quit key.
pub struct TerminalRenderer {
    out: Stdout,
    quit_key: char,
}

impl TerminalRenderer {
    /// Take over the terminal. `q` requests quit.
    pub fn new() -> io::Result<Self> {
        Self::with_quit_key('q')
    }

    pub fn with_quit_key(quit_key: char) -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(
            out,
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide
        ) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self { out, quit_key })
    }
}

impl FrameSink for TerminalRenderer {
    fn quit_requested(&mut self) -> io::Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && key.code == KeyCode::Char(self.quit_key) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn draw(&mut self, lattice: &Lattice, tick: u64) -> io::Result<()> {
        write_frame(&mut self.out, lattice, tick, self.quit_key)
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Queue one frame: row `r` of the lattice at terminal row `r`, followed by a
/// status line.
fn write_frame<W: Write>(out: &mut W, lattice: &Lattice, tick: u64, quit_key: char) -> io::Result<()> {
    let side = lattice.side();
    let mut line = String::with_capacity(side);

    for row in 0..side {
        line.clear();
        line.extend((0..side).map(|col| {
            if lattice.get(col, row) {
                LIVE_GLYPH
            } else {
                DEAD_GLYPH
            }
        }));
        queue!(out, cursor::MoveTo(0, terminal_row(row)?), Print(&line))?;
    }

    let status_row = terminal_row(side + 1)?;
    queue!(
        out,
        cursor::MoveTo(0, status_row),
        terminal::Clear(terminal::ClearType::CurrentLine),
        Print(format!(
            "tick {}  live {}  ({} to quit)",
            tick,
            lattice.live_cells(),
            quit_key
        ))
    )?;
    out.flush()
}

/// Terminal row for a lattice row; crossterm addresses rows as `u16`.
fn terminal_row(row: usize) -> io::Result<u16> {
    u16::try_from(row).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("row {} does not fit the terminal", row),
        )
    })
}
