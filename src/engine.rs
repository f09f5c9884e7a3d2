//! Per-record classification pipeline
//!
//! One deterministic, single-threaded fold over the input stream: link
//! backward-pass records to their forward-pass origin, decode the
//! annotation, dispatch to a cost model, and assemble the output row.
//! The sequence index is consulted before the current record is appended,
//! so the linker always observes records that arrived strictly earlier.

use crate::error::{PerfilarError, Result};
use crate::index::SequenceIndex;
use crate::marker;
use crate::model::{self, ModelInput, Params, TensorCore};
use crate::record::{Direction, KernelRecord};

/// Final per-kernel output fields
#[derive(Debug, Clone)]
pub struct Row {
    /// 1-based ordinal of the record in the input stream
    pub index: usize,
    /// Sequence ids
    pub seq_id: Vec<u64>,
    /// Alternate sequence ids
    pub alt_seq_id: Vec<u64>,
    /// Launching thread id
    pub tid: i64,
    /// Layer annotation path
    pub layer: Vec<String>,
    /// Call trace frames
    pub trace: Vec<String>,
    /// Launch direction
    pub dir: Direction,
    /// Sub-index within the originating call
    pub sub: u64,
    /// Attributed module name (empty when unclassified)
    pub module: String,
    /// Attributed operation name (empty when unclassified)
    pub op: String,
    /// GPU kernel name
    pub kernel: String,
    /// Canonical operator parameters
    pub params: Params,
    /// Kernel duration in nanoseconds
    pub sil: u64,
    /// Tensor-core usage verdict
    pub tc: TensorCore,
    /// GPU device ordinal
    pub device: i64,
    /// CUDA stream ordinal
    pub stream: i64,
    /// Launch grid string
    pub grid: String,
    /// Launch block string
    pub block: String,
    /// Computed floating-point operations
    pub flops: u64,
    /// Computed bytes moved
    pub bytes: u64,
}

/// Streaming classifier: owns the sequence index and processes records in
/// arrival order
#[derive(Debug, Default)]
pub struct Engine {
    index: SequenceIndex,
}

impl Engine {
    /// Create an engine with an empty sequence index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records processed so far
    #[must_use]
    pub fn records_seen(&self) -> usize {
        self.index.len()
    }

    /// Classify one record and append it to the sequence index
    ///
    /// # Errors
    ///
    /// Structural contract violations are fatal: a backward-pass record
    /// with an empty sequence-id or sequence-marker list, a recognized
    /// annotation with a malformed body, or a recognized GEMM name with
    /// malformed tile/grid sub-structure. A failed forward linkage is not
    /// an error; the record is emitted unclassified with zeroed cost.
    pub fn process(&mut self, record: KernelRecord) -> Result<Row> {
        let index = self.index.len() + 1;
        let mut record = record;

        if record.dir == Direction::Bprop {
            let seq = record.seq_id.first().copied().ok_or_else(|| {
                PerfilarError::BpropContract {
                    index,
                    reason: "empty seqId".to_string(),
                }
            })?;
            if record.seq_marker.is_empty() {
                return Err(PerfilarError::BpropContract {
                    index,
                    reason: "empty seqMarker".to_string(),
                });
            }
            // No call-site annotation of its own: borrow the forward
            // pass's context through the sequence index.
            if record.marker.is_empty() {
                if let Some(fwd) = self
                    .index
                    .find_forward_kernel(seq)
                    .and_then(|i| self.index.get(i))
                {
                    record.marker = fwd.marker.clone();
                    record.repr_markers = fwd.repr_markers.clone();
                    record.module = fwd.module.clone();
                    record.op = fwd.op.clone();
                    record.layer = fwd.layer.clone();
                    record.trace = fwd.trace.clone();
                }
            }
        }

        let (module, op, params, tc, flops, bytes) =
            match marker::parse(&record.marker)? {
                Some(annotation) => {
                    let input = ModelInput {
                        annotation: &annotation,
                        name: &record.name,
                        dir: record.dir,
                        sub: record.sub,
                        grid: &record.grid,
                    };
                    let cost = model::dispatch(&record.module, &record.op, &input)?;
                    (
                        cost.module().to_string(),
                        cost.op().to_string(),
                        cost.params(),
                        cost.tensor_core(),
                        cost.flops(),
                        cost.bytes(),
                    )
                },
                None => (
                    record.module.first().cloned().unwrap_or_default(),
                    record.op.first().cloned().unwrap_or_default(),
                    Params::new(),
                    TensorCore::NotApplicable,
                    0,
                    0,
                ),
            };

        let row = Row {
            index,
            seq_id: record.seq_id.clone(),
            alt_seq_id: record.alt_seq_id.clone(),
            tid: record.tid,
            layer: record.layer.clone(),
            trace: record.trace.clone(),
            dir: record.dir,
            sub: record.sub,
            module,
            op,
            kernel: record.name.clone(),
            params,
            sil: record.sil,
            tc,
            device: record.device,
            stream: record.stream,
            grid: record.grid.clone(),
            block: record.block.clone(),
            flops,
            bytes,
        };

        self.index.push(record);
        Ok(row)
    }
}
