//! Octave response assembly
//!
//! Per-octave responses arrive top octave first. They are cut to a common
//! frame count and stacked bottom-up so that row 0 is the lowest bin.

use ndarray::{s, Array2};
use num_complex::Complex64;

use crate::error::{VqtError, VqtResult};

/// Trim every response to the shortest frame count and stack them into an
/// `(n_bins, n_frames)` matrix.
///
/// Response `i` fills the rows directly below response `i - 1`, starting
/// from row `n_bins`. A response taller than the remaining space keeps
/// only its highest rows.
pub fn trim_stack(responses: &[Array2<Complex64>], n_bins: usize) -> VqtResult<Array2<Complex64>> {
    let n_frames = responses
        .iter()
        .map(|r| r.ncols())
        .min()
        .ok_or_else(|| VqtError::InvalidConfig("no octave responses to stack".into()))?;

    let mut out = Array2::<Complex64>::zeros((n_bins, n_frames));
    let mut end = n_bins;

    for response in responses {
        if end == 0 {
            break;
        }

        let n_oct = response.nrows();
        if end < n_oct {
            out.slice_mut(s![..end, ..])
                .assign(&response.slice(s![n_oct - end.., ..n_frames]));
            end = 0;
        } else {
            out.slice_mut(s![end - n_oct..end, ..])
                .assign(&response.slice(s![.., ..n_frames]));
            end -= n_oct;
        }
    }

    Ok(out)
}

/// Divide row `i` by `sqrt(lengths[i])`
pub fn rescale_rows(matrix: &mut Array2<Complex64>, lengths: &[f64]) -> VqtResult<()> {
    if matrix.nrows() != lengths.len() {
        return Err(VqtError::InvalidConfig(format!(
            "{} rows but {} filter lengths",
            matrix.nrows(),
            lengths.len()
        )));
    }

    for (mut row, &length) in matrix.rows_mut().into_iter().zip(lengths) {
        let norm = length.sqrt();
        row.mapv_inplace(|c| c / norm);
    }

    Ok(())
}
