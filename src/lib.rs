//! # Perfilar
//!
//! Post-processor for recorded GPU kernel-launch profiles.
//!
//! Perfilar (Spanish: "to profile, to outline") reads a stream of recorded
//! kernel-launch records (one JSON object per line, each annotated with a
//! textual marker describing the originating high-level tensor operation)
//! and produces one report row per kernel: inferred operation identity,
//! analytical FLOP count, byte-traffic estimate, tensor-core usage, and the
//! reconstructed operation parameters (e.g. GEMM M/N/K).
//!
//! ## Pipeline
//!
//! 1. **Marker parser** decodes the call-site annotation attached to a
//!    record ([`marker`]).
//! 2. **Fprop linker** attributes unannotated backward-pass kernels to the
//!    forward-pass record sharing their sequence id ([`index`]).
//! 3. **Operator dispatch** routes the annotated record to a cost model
//!    ([`model`]).
//! 4. The **cost model** computes FLOPs, bytes, and tensor-core usage from
//!    recorded shapes, kernel names, and launch geometry ([`recurrent`]).
//!
//! ## Example
//!
//! ```rust
//! use perfilar::{Engine, KernelRecord};
//!
//! let line = r#"{"seqId":[1],"dir":"fprop","sub":0,"grid":"1,1,1",
//!     "name":"volta_sgemm_128x64_nn",
//!     "marker":["{\"mod\":\"LSTMCell\",\"op\":\"forward\",\"args\":[{\"shape\":[4,10],\"dtype\":\"float16\"},{\"shape\":[4,20],\"dtype\":\"float16\"}]}"],
//!     "mod":["LSTMCell"],"op":["forward"]}"#;
//!
//! let mut engine = Engine::new();
//! let row = engine.process(KernelRecord::from_json_line(line, 1)?)?;
//! assert_eq!(row.flops, 6400);
//! assert_eq!(row.params.to_string(), "gemm=layer,M=80,N=4,K=10,fp16");
//! # Ok::<(), perfilar::PerfilarError>(())
//! ```
//!
//! No GPU is touched: everything is static arithmetic over the recorded
//! profile. Processing is a single-threaded, deterministic fold in arrival
//! order; the only shared structure is the append-only sequence index owned
//! by the [`Engine`].

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections

/// Per-record classification pipeline and the output row type
pub mod engine;
/// Error types and the crate-wide `Result` alias
pub mod error;
/// Append-only sequence index and forward-pass linker
pub mod index;
/// Argument-marker annotation parsing
pub mod marker;
/// Cost-model contract and operator dispatch table
pub mod model;
/// Columned and CSV report writer
pub mod output;
/// Kernel-launch record schema
pub mod record;
/// Recurrent-cell (RNNCell/LSTMCell/GRUCell) cost model
pub mod recurrent;
/// Kernel-name CTA-tile and launch-grid parsing
pub mod tile;

pub use engine::{Engine, Row};
pub use error::{PerfilarError, Result};
pub use record::{Direction, KernelRecord};
