//! Argument-marker annotation parser
//!
//! Each recorded kernel may carry marker strings describing the high-level
//! call that launched it. A recognized annotation is a JSON object with
//! `mod`, `op`, and `args` keys; anything else is silently ignored and
//! classification falls back to the module/op strings already attached to
//! the raw record. A marker that *passes* the recognition predicate but has
//! a malformed body is an upstream contract violation and fails hard.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PerfilarError, Result};

/// Semantic element datatype of a tensor argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    /// 16-bit IEEE float
    Float16,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float
    Float64,
    /// bfloat16
    Bfloat16,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Boolean
    Bool,
}

impl Dtype {
    /// Parse a dtype from its recorded tag
    ///
    /// # Errors
    ///
    /// Returns [`PerfilarError::UnknownDtype`] for tags outside the
    /// recorded vocabulary; an unknown tag inside a recognized annotation
    /// is a contract violation, not a soft miss.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "float16" | "fp16" | "half" => Ok(Self::Float16),
            "float32" | "fp32" | "float" => Ok(Self::Float32),
            "float64" | "fp64" | "double" => Ok(Self::Float64),
            "bfloat16" | "bf16" => Ok(Self::Bfloat16),
            "int8" => Ok(Self::Int8),
            "uint8" | "byte" => Ok(Self::Uint8),
            "int16" | "short" => Ok(Self::Int16),
            "int32" | "int" => Ok(Self::Int32),
            "int64" | "long" => Ok(Self::Int64),
            "bool" => Ok(Self::Bool),
            other => Err(PerfilarError::UnknownDtype(other.to_string())),
        }
    }

    /// Element size in bytes
    #[must_use]
    pub fn size_bytes(self) -> u64 {
        match self {
            Self::Int8 | Self::Uint8 | Self::Bool => 1,
            Self::Float16 | Self::Bfloat16 | Self::Int16 => 2,
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 | Self::Int64 => 8,
        }
    }

    /// Short display form used in output params
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Float16 => "fp16",
            Self::Float32 => "fp32",
            Self::Float64 => "fp64",
            Self::Bfloat16 => "bf16",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Bool => "bool",
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// One argument descriptor inside an annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    /// Tensor shape (ordered, all dimensions positive)
    pub shape: Vec<u64>,
    /// Element datatype
    pub dtype: Dtype,
}

/// Decoded call annotation: the high-level tensor operation that launched
/// the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAnnotation {
    /// Module or class name, e.g. `LSTMCell`
    pub module: String,
    /// Operation name, e.g. `forward`
    pub op: String,
    /// Ordered argument descriptors
    pub args: Vec<Arg>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    #[serde(rename = "mod")]
    module: String,
    op: String,
    args: Vec<RawArg>,
}

#[derive(Deserialize)]
struct RawArg {
    shape: Vec<u64>,
    dtype: String,
}

/// Recognition predicate: is this marker string one of our annotations?
///
/// A structural tag check only; no validation of the body.
#[must_use]
pub fn is_annotation(raw: &str) -> bool {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => {
            map.contains_key("mod") && map.contains_key("op") && map.contains_key("args")
        },
        _ => false,
    }
}

/// Decode the annotation carried by a marker list
///
/// Only the first marker is consulted, and only when it satisfies
/// [`is_annotation`]. A predicate miss (or an empty list) yields `Ok(None)`.
///
/// # Errors
///
/// A marker that passes the predicate but fails structural validation
/// (non-decodable body, unknown dtype tag, zero dimension in a shape)
/// returns a fatal [`PerfilarError`].
pub fn parse(markers: &[String]) -> Result<Option<CallAnnotation>> {
    let Some(first) = markers.first() else {
        return Ok(None);
    };
    if !is_annotation(first) {
        return Ok(None);
    }

    let raw: RawAnnotation = serde_json::from_str(first)
        .map_err(|e| PerfilarError::MalformedAnnotation(e.to_string()))?;

    let mut args = Vec::with_capacity(raw.args.len());
    for arg in raw.args {
        if arg.shape.iter().any(|&d| d == 0) {
            return Err(PerfilarError::MalformedAnnotation(format!(
                "zero dimension in shape {:?}",
                arg.shape
            )));
        }
        args.push(Arg {
            shape: arg.shape,
            dtype: Dtype::parse(&arg.dtype)?,
        });
    }

    Ok(Some(CallAnnotation {
        module: raw.module,
        op: raw.op,
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lstm_marker() -> String {
        r#"{"mod":"LSTMCell","op":"forward","args":[
            {"shape":[4,10],"dtype":"float16"},
            {"shape":[4,20],"dtype":"float16"}]}"#
            .to_string()
    }

    // === Dtype Tests ===

    #[test]
    fn test_dtype_parse_aliases() {
        assert_eq!(Dtype::parse("float16").unwrap(), Dtype::Float16);
        assert_eq!(Dtype::parse("half").unwrap(), Dtype::Float16);
        assert_eq!(Dtype::parse("fp32").unwrap(), Dtype::Float32);
        assert_eq!(Dtype::parse("long").unwrap(), Dtype::Int64);
    }

    #[test]
    fn test_dtype_parse_unknown_is_fatal() {
        assert!(Dtype::parse("quaternion").is_err());
    }

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(Dtype::Float16.size_bytes(), 2);
        assert_eq!(Dtype::Float32.size_bytes(), 4);
        assert_eq!(Dtype::Float64.size_bytes(), 8);
        assert_eq!(Dtype::Bool.size_bytes(), 1);
    }

    #[test]
    fn test_dtype_short_name() {
        assert_eq!(Dtype::Float16.short_name(), "fp16");
        assert_eq!(Dtype::Bfloat16.short_name(), "bf16");
    }

    // === Predicate Tests ===

    #[test]
    fn test_predicate_accepts_annotation() {
        assert!(is_annotation(&lstm_marker()));
    }

    #[test]
    fn test_predicate_rejects_foreign_markers() {
        assert!(!is_annotation("some free-form nvtx range"));
        assert!(!is_annotation(r#"{"mod":"X","op":"y"}"#)); // missing args
        assert!(!is_annotation(r#"[1,2,3]"#));
    }

    // === Parse Tests ===

    #[test]
    fn test_parse_empty_list() {
        assert_eq!(parse(&[]).unwrap(), None);
    }

    #[test]
    fn test_parse_unrecognized_is_silent() {
        let markers = vec!["free-form".to_string()];
        assert_eq!(parse(&markers).unwrap(), None);
    }

    #[test]
    fn test_parse_lstm_annotation() {
        let ann = parse(&[lstm_marker()]).unwrap().unwrap();
        assert_eq!(ann.module, "LSTMCell");
        assert_eq!(ann.op, "forward");
        assert_eq!(ann.args.len(), 2);
        assert_eq!(ann.args[0].shape, vec![4, 10]);
        assert_eq!(ann.args[1].dtype, Dtype::Float16);
    }

    #[test]
    fn test_parse_only_first_marker_consulted() {
        let markers = vec![lstm_marker(), "garbage".to_string()];
        assert!(parse(&markers).unwrap().is_some());
    }

    #[test]
    fn test_parse_malformed_body_is_fatal() {
        // Predicate passes (mod/op/args present) but args entries are junk.
        let markers = vec![r#"{"mod":"X","op":"forward","args":[{"shape":"wat"}]}"#.to_string()];
        assert!(parse(&markers).is_err());
    }

    #[test]
    fn test_parse_zero_dim_is_fatal() {
        let markers =
            vec![r#"{"mod":"X","op":"forward","args":[{"shape":[0,3],"dtype":"fp32"}]}"#
                .to_string()];
        assert!(parse(&markers).is_err());
    }

    #[test]
    fn test_parse_unknown_dtype_is_fatal() {
        let markers =
            vec![r#"{"mod":"X","op":"forward","args":[{"shape":[2,3],"dtype":"mystery"}]}"#
                .to_string()];
        assert!(matches!(
            parse(&markers),
            Err(PerfilarError::UnknownDtype(_))
        ));
    }
}
