//! Cost-model contract and operator dispatch
//!
//! Every annotated kernel record is routed to exactly one cost model through
//! an explicit registration table, keyed on the first operation-name
//! candidate with two-level checks against the first module-name candidate.
//! Dispatch is a total function: records matching no route fall through to a
//! zero-cost [`Unclassified`] model rather than failing.

use crate::error::Result;
use crate::marker::CallAnnotation;
use crate::record::Direction;
use crate::recurrent::RecurrentCell;

/// Tensor-core usage verdict for one kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorCore {
    /// Kernel ran on tensor-core hardware
    Used,
    /// GEMM kernel that did not use tensor cores
    NotUsed,
    /// Not a GEMM kernel; the question does not apply
    NotApplicable,
}

impl std::fmt::Display for TensorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Used => write!(f, "1"),
            Self::NotUsed => write!(f, "0"),
            Self::NotApplicable => write!(f, "-"),
        }
    }
}

/// Ordered operator-specific parameter set, rendered as `k=v` pairs
///
/// Keys containing `type` render as the bare value (the short dtype form),
/// matching the recorded-profile report convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one `key=value` entry, preserving insertion order
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.0.push((key.to_string(), value.to_string()));
    }

    /// Entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }

    /// Whether no entries have been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "-");
        }
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| {
                if k.contains("type") {
                    v.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// Everything a cost-model constructor may consult: the decoded annotation
/// plus the kernel-level metadata of the record being classified
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    /// Decoded call annotation (own or borrowed from the linked fprop record)
    pub annotation: &'a CallAnnotation,
    /// GPU kernel name
    pub name: &'a str,
    /// Launch direction
    pub dir: Direction,
    /// Sub-index within the originating call
    pub sub: u64,
    /// Launch grid string `"x,y,z"`
    pub grid: &'a str,
}

/// Analytical cost model for one classified kernel
pub trait CostModel {
    /// Module or class name this kernel is attributed to
    fn module(&self) -> &str;
    /// Operation name this kernel is attributed to
    fn op(&self) -> &str;
    /// Floating-point operations performed
    fn flops(&self) -> u64;
    /// Bytes moved to and from memory
    fn bytes(&self) -> u64;
    /// Tensor-core usage verdict
    fn tensor_core(&self) -> TensorCore;
    /// Canonical operator parameters
    fn params(&self) -> Params;
}

/// Zero-cost model for operators outside the classification catalog
#[derive(Debug)]
pub struct Unclassified {
    module: String,
    op: String,
}

impl Unclassified {
    /// Build from the annotation being dispatched
    #[must_use]
    pub fn new(annotation: &CallAnnotation) -> Self {
        Self {
            module: annotation.module.clone(),
            op: annotation.op.clone(),
        }
    }
}

impl CostModel for Unclassified {
    fn module(&self) -> &str {
        &self.module
    }

    fn op(&self) -> &str {
        &self.op
    }

    fn flops(&self) -> u64 {
        0
    }

    fn bytes(&self) -> u64 {
        0
    }

    fn tensor_core(&self) -> TensorCore {
        TensorCore::NotApplicable
    }

    fn params(&self) -> Params {
        Params::new()
    }
}

/// One dispatch route: a match predicate over `(module, op)` plus the
/// constructor it selects
struct Route {
    matches: fn(module: &str, op: &str) -> bool,
    build: fn(&ModelInput<'_>) -> Result<Box<dyn CostModel>>,
}

fn is_recurrent_cell(module: &str, op: &str) -> bool {
    matches!(module, "RNNCell" | "LSTMCell" | "GRUCell") && op == "forward"
}

fn build_recurrent(input: &ModelInput<'_>) -> Result<Box<dyn CostModel>> {
    Ok(Box::new(RecurrentCell::new(input)?))
}

/// The registration table. Routes are tried in order; the first predicate
/// hit wins.
const ROUTES: &[Route] = &[Route {
    matches: is_recurrent_cell,
    build: build_recurrent,
}];

/// Select a cost model for an annotated record
///
/// Keyed on the first operation-name candidate and (for two-level routes)
/// the first module-name candidate of the record. Total: unmatched names
/// yield the zero-cost [`Unclassified`] model.
///
/// # Errors
///
/// Only a selected constructor can fail, and only on structural contract
/// violations in its input.
pub fn dispatch(
    module_names: &[String],
    op_names: &[String],
    input: &ModelInput<'_>,
) -> Result<Box<dyn CostModel>> {
    let module = module_names.first().map_or("", String::as_str);
    let op = op_names.first().map_or("", String::as_str);
    for route in ROUTES {
        if (route.matches)(module, op) {
            return (route.build)(input);
        }
    }
    Ok(Box::new(Unclassified::new(input.annotation)))
}
