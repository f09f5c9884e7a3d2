//! Kernel-launch record schema
//!
//! One `KernelRecord` per input line: a single GPU kernel launch annotated
//! with the call-site context captured when it was recorded. Records are
//! immutable once appended to the [`SequenceIndex`](crate::index::SequenceIndex).

use serde::{Deserialize, Deserializer};

use crate::error::{PerfilarError, Result};

/// Launch direction of a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Forward pass
    Fprop,
    /// Backward pass
    Bprop,
    /// Direction not recorded
    #[default]
    Unknown,
}

impl Direction {
    /// Parse a direction from its recorded string form
    ///
    /// The recorder emits `"fprop"`, `"bprop"`, or an empty string; anything
    /// else is treated as unknown rather than rejected.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "fprop" => Self::Fprop,
            "bprop" => Self::Bprop,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fprop => write!(f, "fprop"),
            Self::Bprop => write!(f, "bprop"),
            Self::Unknown => write!(f, "na"),
        }
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// One recorded GPU kernel launch
///
/// Field names mirror the recorded JSON-lines schema. List-valued fields
/// default to empty and scalar fields to zero so that sparsely recorded
/// lines still decode.
#[derive(Debug, Clone, Deserialize)]
pub struct KernelRecord {
    /// Sequence ids linking this launch to its originating call
    #[serde(rename = "seqId", default)]
    pub seq_id: Vec<u64>,
    /// Alternate sequence ids (fallback linkage)
    #[serde(rename = "altSeqId", default)]
    pub alt_seq_id: Vec<u64>,
    /// Thread id of the launching CPU thread
    #[serde(default)]
    pub tid: i64,
    /// GPU kernel name
    #[serde(default)]
    pub name: String,
    /// Launch direction
    #[serde(default)]
    pub dir: Direction,
    /// Sub-index disambiguating multiple kernels launched by one call
    #[serde(default)]
    pub sub: u64,
    /// Launch grid dimensions, recorded as `"x,y,z"`
    #[serde(default)]
    pub grid: String,
    /// Launch block dimensions, recorded as `"x,y,z"`
    #[serde(default)]
    pub block: String,
    /// Kernel duration (silicon time) in nanoseconds
    #[serde(default)]
    pub sil: u64,
    /// GPU device ordinal
    #[serde(default)]
    pub device: i64,
    /// CUDA stream ordinal
    #[serde(default)]
    pub stream: i64,
    /// Raw argument-marker annotation strings
    #[serde(default)]
    pub marker: Vec<String>,
    /// Object-repr markers captured alongside the argument markers
    #[serde(rename = "reprMarkers", default)]
    pub repr_markers: Vec<String>,
    /// Module-name candidates from the call-site context
    #[serde(rename = "mod", default)]
    pub module: Vec<String>,
    /// Operation-name candidates from the call-site context
    #[serde(default)]
    pub op: Vec<String>,
    /// Layer annotation path
    #[serde(default)]
    pub layer: Vec<String>,
    /// Call trace (file:line frames)
    #[serde(default)]
    pub trace: Vec<String>,
    /// Sequence markers, present on backward-pass records
    #[serde(rename = "seqMarker", default)]
    pub seq_marker: Vec<String>,
}

impl KernelRecord {
    /// Decode one input line into a record
    ///
    /// # Errors
    ///
    /// Returns [`PerfilarError::MalformedRecord`] when the line is not a
    /// valid record object. `line` is the 1-based input line number, used
    /// only for the error message.
    pub fn from_json_line(raw: &str, line: usize) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| PerfilarError::MalformedRecord { line, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Direction Tests ===

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("fprop"), Direction::Fprop);
        assert_eq!(Direction::parse("bprop"), Direction::Bprop);
        assert_eq!(Direction::parse(""), Direction::Unknown);
        assert_eq!(Direction::parse("sideways"), Direction::Unknown);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Fprop.to_string(), "fprop");
        assert_eq!(Direction::Unknown.to_string(), "na");
    }

    // === KernelRecord Tests ===

    #[test]
    fn test_record_decode_full() {
        let line = r#"{"seqId":[42],"altSeqId":[7],"tid":123,"name":"volta_sgemm_128x64_nn",
            "dir":"fprop","sub":1,"grid":"2,3,1","block":"256,1,1","sil":1500,
            "marker":["{\"mod\": \"LSTMCell\", \"op\": \"forward\", \"args\": []}"],
            "reprMarkers":[],"mod":["LSTMCell"],"op":["forward"],
            "layer":["encoder"],"trace":["model.py:10"],"seqMarker":[]}"#;
        let rec = KernelRecord::from_json_line(line, 1).unwrap();
        assert_eq!(rec.seq_id, vec![42]);
        assert_eq!(rec.dir, Direction::Fprop);
        assert_eq!(rec.sub, 1);
        assert_eq!(rec.grid, "2,3,1");
        assert_eq!(rec.module, vec!["LSTMCell"]);
    }

    #[test]
    fn test_record_decode_sparse_defaults() {
        let rec = KernelRecord::from_json_line(r#"{"name":"memcpy"}"#, 3).unwrap();
        assert_eq!(rec.dir, Direction::Unknown);
        assert!(rec.seq_id.is_empty());
        assert!(rec.marker.is_empty());
        assert_eq!(rec.sil, 0);
    }

    #[test]
    fn test_record_decode_error_carries_line() {
        let err = KernelRecord::from_json_line("not json", 17).unwrap_err();
        assert!(err.to_string().contains("line 17"));
    }
}
