//! Structural parsing of GPU kernel names and launch grids
//!
//! GEMM kernel names from cuBLAS/cuDNN encode the CTA tile size as a
//! `<tileX>x<tileY>` token, e.g. `volta_sgemm_128x64_nn`. These parsers are
//! pure and independent of any cost model; a name that matches the
//! recognized GEMM pattern but violates its expected sub-structure is a
//! data-integrity error, not a soft miss.

use crate::error::{PerfilarError, Result};

/// Whether a kernel name carries a recognized CTA-tile-bearing GEMM pattern
#[must_use]
pub fn has_tile_size(name: &str) -> bool {
    name.contains("sgemm") || name.contains("884gemm") || name.contains("hgemm")
}

/// Extract the CTA tile dimensions `(tileX, tileY)` from a kernel name
///
/// Splits on `_`, keeps tokens containing `x` but not `slice`, requires
/// exactly one such token, and splits it on `x` into two integers.
///
/// # Errors
///
/// [`PerfilarError::MalformedTile`] when the name does not contain exactly
/// one well-formed tile token. Callers only invoke this on names for which
/// [`has_tile_size`] holds, so failure is fatal.
pub fn cta_tile(name: &str) -> Result<(u64, u64)> {
    let tokens: Vec<&str> = name
        .split('_')
        .filter(|t| t.contains('x') && !t.contains("slice"))
        .collect();
    if tokens.len() != 1 {
        return Err(PerfilarError::MalformedTile {
            name: name.to_string(),
            reason: format!("expected exactly one tile token, found {}", tokens.len()),
        });
    }
    let parts: Vec<&str> = tokens[0].split('x').collect();
    if parts.len() != 2 {
        return Err(PerfilarError::MalformedTile {
            name: name.to_string(),
            reason: format!("tile token {:?} does not split into two fields", tokens[0]),
        });
    }
    let parse = |s: &str| {
        s.parse::<u64>().map_err(|_| PerfilarError::MalformedTile {
            name: name.to_string(),
            reason: format!("non-integer tile field {s:?}"),
        })
    };
    Ok((parse(parts[0])?, parse(parts[1])?))
}

/// Parse a `"x,y,z"` launch-grid string into its three dimensions
///
/// # Errors
///
/// [`PerfilarError::MalformedGrid`] unless the string is exactly three
/// comma-separated integers.
pub fn grid_dims(grid: &str) -> Result<(u64, u64, u64)> {
    let parts: Vec<&str> = grid.split(',').collect();
    if parts.len() != 3 {
        return Err(PerfilarError::MalformedGrid {
            grid: grid.to_string(),
        });
    }
    let mut dims = [0u64; 3];
    for (slot, part) in dims.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| PerfilarError::MalformedGrid {
                grid: grid.to_string(),
            })?;
    }
    Ok((dims[0], dims[1], dims[2]))
}
