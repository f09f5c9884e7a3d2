//! Recurrent-cell cost model: RNNCell, LSTMCell, GRUCell
//!
//! A forward cell step launches three kernels: the layer GEMM (input
//! projection), the recurrent GEMM (hidden projection), and a pointwise
//! kernel over the gate activations. Backward-pass kernels arrive without a
//! sub-index contract, so they are classified from the GEMM shape
//! reconstructed out of the kernel name's CTA tile and the launch grid.
//! Each cell type fixes a gate multiplier (GRU 3, LSTM 4, plain RNN 1):
//! every gate needs its own weight GEMM.

use crate::error::{PerfilarError, Result};
use crate::marker::Dtype;
use crate::model::{CostModel, ModelInput, Params, TensorCore};
use crate::record::Direction;
use crate::tile;

/// Which of the two cell GEMMs a kernel was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemmKind {
    /// Input projection `W_i @ x`
    Layer,
    /// Hidden projection `W_h @ h`
    Recur,
}

impl std::fmt::Display for GemmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Layer => write!(f, "layer"),
            Self::Recur => write!(f, "recur"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Gemm {
    kind: GemmKind,
    m: u64,
    n: u64,
    k: u64,
}

/// Analytical cost model for one recurrent-cell kernel launch
#[derive(Debug)]
pub struct RecurrentCell {
    cell: String,
    op: String,
    inp: u64,
    hid: u64,
    batch: u64,
    dtype: Dtype,
    name: String,
    gemm: Option<Gemm>,
    elems: u64,
}

impl RecurrentCell {
    /// Build and classify from a dispatched model input
    ///
    /// # Errors
    ///
    /// Structural violations of the annotation contract (argument count,
    /// shape rank, batch or dtype mismatch between `x` and `h`) and
    /// tile/grid sub-structure violations inside a recognized GEMM name are
    /// fatal.
    pub fn new(input: &ModelInput<'_>) -> Result<Self> {
        let ann = input.annotation;
        let contract = |reason: &str| PerfilarError::MalformedAnnotation(reason.to_string());

        if ann.op != "forward" {
            return Err(contract(&format!(
                "recurrent cell expects op \"forward\", got {:?}",
                ann.op
            )));
        }
        if !matches!(ann.module.as_str(), "RNNCell" | "LSTMCell" | "GRUCell") {
            return Err(contract(&format!(
                "unknown recurrent cell module {:?}",
                ann.module
            )));
        }
        if !(ann.args.len() == 2 || ann.args.len() == 3) {
            return Err(contract(&format!(
                "recurrent cell expects 2 or 3 args, got {}",
                ann.args.len()
            )));
        }

        let x = &ann.args[0];
        let h = &ann.args[1];
        let [bx, inp] = x.shape[..] else {
            return Err(contract(&format!("x is not rank 2: {:?}", x.shape)));
        };
        let [bh, hid] = h.shape[..] else {
            return Err(contract(&format!("h is not rank 2: {:?}", h.shape)));
        };
        if bx != bh {
            return Err(contract(&format!("batch mismatch: x={bx}, h={bh}")));
        }
        if x.dtype != h.dtype {
            return Err(contract(&format!(
                "dtype mismatch: x={}, h={}",
                x.dtype, h.dtype
            )));
        }

        let mut model = Self {
            cell: ann.module.clone(),
            op: ann.op.clone(),
            inp,
            hid,
            batch: bx,
            dtype: x.dtype,
            name: input.name.to_string(),
            gemm: None,
            elems: 0,
        };
        model.classify(input.dir, input.sub, input.grid)?;
        Ok(model)
    }

    /// Number of internal gates, each requiring its own weight GEMM
    #[must_use]
    pub fn multiplier(&self) -> u64 {
        match self.cell.as_str() {
            "GRUCell" => 3,
            "LSTMCell" => 4,
            _ => 1,
        }
    }

    fn classify(&mut self, dir: Direction, sub: u64, grid: &str) -> Result<()> {
        let mult = self.multiplier();
        let (x, h, b) = (self.inp, self.hid, self.batch);

        match dir {
            Direction::Fprop => match sub % 3 {
                0 => {
                    self.gemm = Some(Gemm {
                        kind: GemmKind::Layer,
                        m: mult * h,
                        n: b,
                        k: x,
                    });
                },
                1 => {
                    self.gemm = Some(Gemm {
                        kind: GemmKind::Recur,
                        m: mult * h,
                        n: b,
                        k: h,
                    });
                },
                _ => {
                    // Pointwise gate kernel: touches both GEMM outputs plus
                    // the cell and hidden state buffers.
                    self.elems = 2 * mult * h * b + 2 * h * b;
                },
            },
            Direction::Bprop if self.name.contains("gemm") && tile::has_tile_size(&self.name) => {
                self.classify_bprop_gemm(grid)?;
            },
            _ => {},
        }
        Ok(())
    }

    /// Reconstruct the backward GEMM identity from CTA tile and launch grid
    fn classify_bprop_gemm(&mut self, grid: &str) -> Result<()> {
        let mult = self.multiplier();
        let (x, h, b) = (self.inp, self.hid, self.batch);

        let (tile_x, tile_y) = tile::cta_tile(&self.name)?;
        let (grid_x, grid_y, _grid_z) = tile::grid_dims(grid)?;
        let gemm_m = tile_x * grid_x;
        let gemm_n = tile_y * grid_y;

        if self.name.ends_with("_nn") {
            // Data gradient.
            if gemm_m == h {
                self.gemm = Some(Gemm {
                    kind: GemmKind::Recur,
                    m: h,
                    n: b,
                    k: mult * h,
                });
            } else if gemm_m == x {
                self.gemm = Some(Gemm {
                    kind: GemmKind::Layer,
                    m: x,
                    n: gemm_n,
                    k: mult * h,
                });
            }
        } else if self.name.ends_with("_nt") {
            // Weight gradient: N must cover all gate weights.
            if gemm_m == h || gemm_m == x {
                if gemm_n != mult * h {
                    return Err(PerfilarError::InconsistentGemm {
                        name: self.name.clone(),
                        reason: format!(
                            "wgrad N={gemm_n} does not equal multiplier*H={}",
                            mult * h
                        ),
                    });
                }
                let kind = if gemm_m == h {
                    GemmKind::Recur
                } else {
                    GemmKind::Layer
                };
                self.gemm = Some(Gemm {
                    kind,
                    m: gemm_m,
                    n: mult * h,
                    k: b,
                });
            }
        }
        // Any other suffix/shape combination stays unclassified, cost zero.
        Ok(())
    }
}

impl CostModel for RecurrentCell {
    fn module(&self) -> &str {
        &self.cell
    }

    fn op(&self) -> &str {
        &self.op
    }

    fn flops(&self) -> u64 {
        self.gemm.map_or(0, |g| 2 * g.m * g.n * g.k)
    }

    fn bytes(&self) -> u64 {
        let size = self.dtype.size_bytes();
        if let Some(g) = self.gemm {
            (g.m * g.k + g.k * g.n + g.m * g.n) * size
        } else if self.elems != 0 {
            self.elems * size
        } else {
            0
        }
    }

    fn tensor_core(&self) -> TensorCore {
        if self.name.contains("gemm") {
            if self.name.contains("884gemm") {
                TensorCore::Used
            } else {
                TensorCore::NotUsed
            }
        } else {
            TensorCore::NotApplicable
        }
    }

    fn params(&self) -> Params {
        let mut p = Params::new();
        if let Some(g) = self.gemm {
            p.push("gemm", g.kind);
            p.push("M", g.m);
            p.push("N", g.n);
            p.push("K", g.k);
        } else {
            p.push("cell", &self.cell);
            p.push("X", self.inp);
            p.push("H", self.hid);
            p.push("B", self.batch);
        }
        p.push("type", self.dtype.short_name());
        p
    }
}
