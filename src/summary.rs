//! Per-run summary table: one row per subreddit, one column per chunk.

use crate::chunk::DateChunk;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of one (subreddit, chunk) unit of work. `Partial` means exactly
/// one of the two content-kind fetches was dropped, `Failed` means both were,
/// so a `0` count is never silently ambiguous in the rendered table. The
/// outcome travels with the chunk's checkpoint so a resumed cell keeps its
/// original tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkOutcome {
    Complete,
    Partial,
    Failed,
}

/// One summary cell: document count plus the outcome tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCell {
    pub count: usize,
    pub outcome: ChunkOutcome,
}

/// Ephemeral run summary, assembled in deterministic subreddit/chunk order
/// and rendered once at the end of a run. Never persisted.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub chunks: Vec<DateChunk>,
    pub rows: Vec<(String, Vec<ChunkCell>)>,
}

impl RunSummary {
    pub fn new(chunks: Vec<DateChunk>) -> Self {
        Self { chunks, rows: Vec::new() }
    }

    pub fn push_row(&mut self, subreddit: impl Into<String>, cells: Vec<ChunkCell>) {
        self.rows.push((subreddit.into(), cells));
    }

    pub fn total_docs(&self) -> usize {
        self.rows.iter().flat_map(|(_, cells)| cells).map(|c| c.count).sum()
    }

    /// Plain-text table. Partial cells are suffixed `*`, failed cells `!`;
    /// a legend line is added only when either marker appears.
    pub fn render(&self) -> String {
        let headers: Vec<String> = self.chunks.iter().map(|c| c.to_string()).collect();
        let cell_strings: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|(_, cells)| cells.iter().map(render_cell).collect())
            .collect();

        let mut sub_width = "Subreddit".len();
        for (sub, _) in &self.rows {
            sub_width = sub_width.max(sub.len());
        }
        let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
        for row in &cell_strings {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.len());
                }
            }
        }

        let mut out = String::new();
        let _ = write!(out, "{:<sub_width$}", "Subreddit");
        for (h, w) in headers.iter().zip(widths.iter().copied()) {
            let _ = write!(out, " | {h:>w$}");
        }
        out.push('\n');
        let _ = write!(out, "{}", "-".repeat(sub_width));
        for w in &widths {
            let _ = write!(out, "-+-{}", "-".repeat(*w));
        }
        out.push('\n');
        for ((sub, _), row) in self.rows.iter().zip(&cell_strings) {
            let _ = write!(out, "{sub:<sub_width$}");
            for (cell, w) in row.iter().zip(widths.iter().copied()) {
                let _ = write!(out, " | {cell:>w$}");
            }
            out.push('\n');
        }

        let any_marker = self
            .rows
            .iter()
            .flat_map(|(_, cells)| cells)
            .any(|c| c.outcome != ChunkOutcome::Complete);
        if any_marker {
            out.push_str("(* one content kind dropped, ! both dropped)\n");
        }
        out
    }
}

fn render_cell(cell: &ChunkCell) -> String {
    match cell.outcome {
        ChunkOutcome::Complete => cell.count.to_string(),
        ChunkOutcome::Partial => format!("{}*", cell.count),
        ChunkOutcome::Failed => format!("{}!", cell.count),
    }
}
