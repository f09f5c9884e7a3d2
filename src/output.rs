//! Columned and CSV row writer
//!
//! Renders the per-kernel rows produced by the engine. Three modes, chosen
//! by configuration: CSV (every field double-quoted), fixed-width columns
//! (strings left-justified and truncated, numbers right-justified), and
//! plain space-separated output when no width is given.

use std::io::Write;

use crate::engine::Row;
use crate::error::{PerfilarError, Result};

/// One selectable output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Record ordinal
    Idx,
    /// Sequence ids
    Seq,
    /// Alternate sequence ids
    AltSeq,
    /// Thread id
    Tid,
    /// Layer annotation path
    Layer,
    /// Call trace
    Trace,
    /// Launch direction
    Dir,
    /// Sub-index
    Sub,
    /// Attributed module
    Mod,
    /// Attributed operation
    Op,
    /// Kernel name
    Kernel,
    /// Operator parameters
    Params,
    /// Duration in nanoseconds
    Sil,
    /// Tensor-core usage
    Tc,
    /// Device ordinal
    Device,
    /// Stream ordinal
    Stream,
    /// Launch grid
    Grid,
    /// Launch block
    Block,
    /// Computed FLOPs
    Flops,
    /// Computed bytes
    Bytes,
}

impl Column {
    /// All columns, in canonical report order
    pub const ALL: &'static [Column] = &[
        Self::Idx,
        Self::Seq,
        Self::AltSeq,
        Self::Tid,
        Self::Layer,
        Self::Trace,
        Self::Dir,
        Self::Sub,
        Self::Mod,
        Self::Op,
        Self::Kernel,
        Self::Params,
        Self::Sil,
        Self::Tc,
        Self::Device,
        Self::Stream,
        Self::Grid,
        Self::Block,
        Self::Flops,
        Self::Bytes,
    ];

    /// Parse a column from its selection key
    ///
    /// # Errors
    ///
    /// [`PerfilarError::UnknownColumn`] for keys outside the column table.
    pub fn parse(key: &str) -> Result<Self> {
        match key {
            "idx" => Ok(Self::Idx),
            "seq" => Ok(Self::Seq),
            "altseq" => Ok(Self::AltSeq),
            "tid" => Ok(Self::Tid),
            "layer" => Ok(Self::Layer),
            "trace" => Ok(Self::Trace),
            "dir" => Ok(Self::Dir),
            "sub" => Ok(Self::Sub),
            "mod" => Ok(Self::Mod),
            "op" => Ok(Self::Op),
            "kernel" => Ok(Self::Kernel),
            "params" => Ok(Self::Params),
            "sil" => Ok(Self::Sil),
            "tc" => Ok(Self::Tc),
            "device" => Ok(Self::Device),
            "stream" => Ok(Self::Stream),
            "grid" => Ok(Self::Grid),
            "block" => Ok(Self::Block),
            "flops" => Ok(Self::Flops),
            "bytes" => Ok(Self::Bytes),
            other => Err(PerfilarError::UnknownColumn(other.to_string())),
        }
    }

    /// Parse a comma-separated column selection
    ///
    /// # Errors
    ///
    /// Propagates [`PerfilarError::UnknownColumn`] for any bad key.
    pub fn parse_list(keys: &str) -> Result<Vec<Self>> {
        keys.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Selection key for this column
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Idx => "idx",
            Self::Seq => "seq",
            Self::AltSeq => "altseq",
            Self::Tid => "tid",
            Self::Layer => "layer",
            Self::Trace => "trace",
            Self::Dir => "dir",
            Self::Sub => "sub",
            Self::Mod => "mod",
            Self::Op => "op",
            Self::Kernel => "kernel",
            Self::Params => "params",
            Self::Sil => "sil",
            Self::Tc => "tc",
            Self::Device => "device",
            Self::Stream => "stream",
            Self::Grid => "grid",
            Self::Block => "block",
            Self::Flops => "flops",
            Self::Bytes => "bytes",
        }
    }

    /// Column header text
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Idx => "Idx",
            Self::Seq => "SeqId",
            Self::AltSeq => "AltSeqId",
            Self::Tid => "TId",
            Self::Layer => "Layer",
            Self::Trace => "Trace",
            Self::Dir => "Direction",
            Self::Sub => "Sub",
            Self::Mod => "Module",
            Self::Op => "Op",
            Self::Kernel => "Kernel",
            Self::Params => "Params",
            Self::Sil => "Sil(ns)",
            Self::Tc => "TC",
            Self::Device => "Device",
            Self::Stream => "Stream",
            Self::Grid => "Grid",
            Self::Block => "Block",
            Self::Flops => "FLOPs",
            Self::Bytes => "Bytes",
        }
    }

    /// Minimum width in columned mode
    #[must_use]
    pub fn min_width(self) -> usize {
        match self {
            Self::Tc => 2,
            Self::Sub | Self::Device | Self::Stream => 3,
            Self::Dir => 5,
            Self::Idx | Self::Seq | Self::AltSeq => 7,
            Self::Layer | Self::Sil => 10,
            Self::Tid | Self::Grid | Self::Block | Self::Flops | Self::Bytes => 12,
            Self::Mod | Self::Op => 15,
            Self::Trace => 25,
            Self::Kernel | Self::Params => 0,
        }
    }

    /// Whether values are right-justified numbers in columned mode
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Idx
                | Self::Tid
                | Self::Sub
                | Self::Sil
                | Self::Device
                | Self::Stream
                | Self::Flops
                | Self::Bytes
        )
    }
}

fn join_or_dash<T: ToString>(items: &[T], sep: &str) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

fn or_na(s: &str) -> String {
    if s.is_empty() {
        "na".to_string()
    } else {
        s.to_string()
    }
}

/// Row writer over a configurable column selection
#[derive(Debug)]
pub struct Writer {
    columns: Vec<Column>,
    csv: bool,
    /// Per-column widths; empty when not in columned mode
    widths: Vec<usize>,
}

impl Writer {
    /// Build a writer
    ///
    /// `width == 0` selects plain space-separated output; a positive width
    /// selects columned mode, with the slack beyond the minimum column
    /// widths split between the `kernel` and `params` columns.
    ///
    /// # Errors
    ///
    /// [`PerfilarError::WidthTooSmall`] when a positive width cannot fit
    /// the selected columns' minimum widths.
    pub fn new(columns: Vec<Column>, csv: bool, width: usize) -> Result<Self> {
        let mut widths = Vec::new();
        if !csv && width > 0 {
            let required: usize = columns.iter().map(|c| c.min_width()).sum();
            if required > width {
                return Err(PerfilarError::WidthTooSmall {
                    columns: columns.iter().map(|c| c.key()).collect::<Vec<_>>().join(","),
                    required,
                    width,
                });
            }
            let stretchy = columns
                .iter()
                .filter(|c| matches!(c, Column::Kernel | Column::Params))
                .count();
            let share = if stretchy > 0 {
                (width - required) / stretchy
            } else {
                0
            };
            widths = columns
                .iter()
                .map(|c| match c {
                    Column::Kernel | Column::Params => c.min_width() + share,
                    _ => c.min_width(),
                })
                .collect();
        }
        Ok(Self {
            columns,
            csv,
            widths,
        })
    }

    /// Selected columns
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Write the header line
    ///
    /// # Errors
    ///
    /// I/O errors from the sink.
    pub fn header(&self, out: &mut impl Write) -> Result<()> {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.header().to_string())
            .collect();
        self.emit(out, &fields, true)
    }

    /// Write one data row
    ///
    /// # Errors
    ///
    /// I/O errors from the sink.
    pub fn row(&self, out: &mut impl Write, row: &Row) -> Result<()> {
        let columned = !self.widths.is_empty();
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|c| self.field(*c, row, columned))
            .collect();
        self.emit(out, &fields, false)
    }

    fn field(&self, column: Column, row: &Row, columned: bool) -> String {
        match column {
            Column::Idx => row.index.to_string(),
            Column::Seq => join_or_dash(&row.seq_id, ","),
            Column::AltSeq => join_or_dash(&row.alt_seq_id, ","),
            Column::Tid => row.tid.to_string(),
            Column::Layer => join_or_dash(&row.layer, ":"),
            Column::Trace => {
                // Columned output keeps only the innermost frame's file name.
                if columned {
                    match row.trace.last() {
                        Some(frame) => frame.rsplit('/').next().unwrap_or(frame).to_string(),
                        None => "-".to_string(),
                    }
                } else {
                    join_or_dash(&row.trace, ",")
                }
            },
            Column::Dir => row.dir.to_string(),
            Column::Sub => row.sub.to_string(),
            Column::Mod => or_na(&row.module),
            Column::Op => or_na(&row.op),
            Column::Kernel => row.kernel.clone(),
            Column::Params => row.params.to_string(),
            Column::Sil => row.sil.to_string(),
            Column::Tc => row.tc.to_string(),
            Column::Device => row.device.to_string(),
            Column::Stream => row.stream.to_string(),
            Column::Grid => row.grid.clone(),
            Column::Block => row.block.clone(),
            Column::Flops => row.flops.to_string(),
            Column::Bytes => row.bytes.to_string(),
        }
    }

    fn emit(&self, out: &mut impl Write, fields: &[String], header: bool) -> Result<()> {
        let line = if self.csv {
            fields
                .iter()
                .map(|f| format!("\"{f}\""))
                .collect::<Vec<_>>()
                .join(",")
        } else if self.widths.is_empty() {
            fields.join(" ")
        } else {
            let mut line = String::new();
            for ((field, column), &w) in fields.iter().zip(&self.columns).zip(&self.widths) {
                if !header && column.is_numeric() {
                    line.push_str(&format!("{field:>w$} "));
                } else {
                    line.push_str(&format!("{field:<w$.w$} "));
                }
            }
            line.trim_end().to_string()
        };
        writeln!(out, "{line}")?;
        Ok(())
    }
}

/// Default column selection for the report
#[must_use]
pub fn default_columns() -> Vec<Column> {
    vec![
        Column::Idx,
        Column::Dir,
        Column::Sub,
        Column::Mod,
        Column::Op,
        Column::Kernel,
        Column::Params,
        Column::Sil,
        Column::Tc,
        Column::Flops,
        Column::Bytes,
    ]
}
