//! Progress table printed while the maximizer runs.
//!
//! ```text
//! =================================================
//! |   iter    |  target   |     x     |     y     |
//! -------------------------------------------------
//! | 1         | -54.3217  | -6.6595   | 3.1044    |
//! ```

use std::io::{self, Write};

use bl_types::Params;

const CELL_WIDTH: usize = 9;
const PRECISION: usize = 4;

/// How much of the run is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    /// Only rows that set a new maximum.
    NewMaxima = 1,
    /// Every row.
    All = 2,
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::NewMaxima,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressTable {
    keys: Vec<String>,
    verbosity: Verbosity,
    rows_written: usize,
}

impl ProgressTable {
    pub fn new(keys: Vec<String>, verbosity: Verbosity) -> Self {
        Self {
            keys,
            verbosity,
            rows_written: 0,
        }
    }

    /// Number of data rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn header_line(&self) -> String {
        let mut cells = vec![center("iter"), center("target")];
        cells.extend(self.keys.iter().map(|k| center(k)));
        format!("| {} |", cells.join(" | "))
    }

    pub fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.verbosity == Verbosity::Silent {
            return Ok(());
        }
        let header = self.header_line();
        let width = header.chars().count();
        writeln!(out, "{}", "=".repeat(width))?;
        writeln!(out, "{header}")?;
        writeln!(out, "{}", "-".repeat(width))
    }

    pub fn write_row<W: Write>(
        &mut self,
        out: &mut W,
        iteration: usize,
        target: f64,
        params: &Params,
        is_new_max: bool,
    ) -> io::Result<()> {
        let show = match self.verbosity {
            Verbosity::Silent => false,
            Verbosity::NewMaxima => is_new_max,
            Verbosity::All => true,
        };
        if !show {
            return Ok(());
        }
        let mut cells = vec![
            format!("{:<width$}", iteration, width = CELL_WIDTH),
            format_number(target),
        ];
        cells.extend(
            self.keys
                .iter()
                .map(|k| params.get(k).map_or_else(|| center("-"), format_number)),
        );
        writeln!(out, "| {} |", cells.join(" | "))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_footer<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.verbosity == Verbosity::Silent {
            return Ok(());
        }
        writeln!(out, "{}", "=".repeat(self.header_line().chars().count()))
    }
}

fn center(text: &str) -> String {
    let text: String = text.chars().take(CELL_WIDTH).collect();
    format!("{text:^width$}", width = CELL_WIDTH)
}

/// Fixed precision, cut to the cell width.
fn format_number(value: f64) -> String {
    let s = format!("{value:.prec$}", prec = PRECISION);
    let s = if s.len() > CELL_WIDTH {
        if s[..CELL_WIDTH].contains('.') {
            s[..CELL_WIDTH].to_string()
        } else {
            format!("{}...", &s[..CELL_WIDTH - 3])
        }
    } else {
        s
    };
    format!("{s:<width$}", width = CELL_WIDTH)
}
