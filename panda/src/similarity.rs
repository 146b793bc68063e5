use matrix_util::traits::DenseOps;

/// Continuous Tanimoto similarity
/// `u.v / sqrt(|u|^2 + |v|^2 - |u.v|)`
///
/// * `x`: rows are the entities
/// * `y`: `None` compares rows of `x` with each other; otherwise rows
///   of `x` are compared with columns of `y`
///
pub fn tanimoto<D: DenseOps>(x: &D, y: Option<&D>) -> anyhow::Result<D> {
    match y {
        None => {
            let dot = x.dot_with(&x.transposed()?)?;
            let sq = x.row_sq_sums()?;
            let denom = sq.plus(&sq.transposed()?)?.minus(&dot.elem_abs()?)?;
            dot.divide(&denom.elem_sqrt()?)
        }
        Some(y) => {
            let dot = x.dot_with(y)?;
            let denom = y
                .column_sq_sums()?
                .plus(&x.row_sq_sums()?)?
                .minus(&dot.elem_abs()?)?;
            dot.divide(&denom.elem_sqrt()?)
        }
    }
}

/// Replace the diagonal of a square similarity matrix by
/// `sd_i * n * exp(2 * alpha * step)`, where `sd_i` is the population
/// standard deviation of the off-diagonal elements of row `i`
pub fn calibrate_diagonal<D: DenseOps>(sim: &D, alpha: f64, step: usize) -> anyhow::Result<D> {
    let (nn, mm) = sim.shape2()?;
    if nn != mm {
        anyhow::bail!("diagonal calibration on a non-square {} x {} matrix", nn, mm);
    }

    let diag = sim.diagonal_column()?;

    if nn < 2 {
        return sim.with_diagonal(&diag.scale_shift(0.0, 0.0)?);
    }

    let denom = 1.0 / (nn - 1) as f64;

    // mean and variance without the diagonal
    let mu = sim.row_sums()?.minus(&diag)?.scale_shift(denom, 0.0)?;
    let ss = sim
        .minus(&mu)?
        .elem_square()?
        .row_sums()?
        .minus(&diag.minus(&mu)?.elem_square()?)?;
    let sd = ss.scale_shift(denom, 0.0)?.elem_nonneg()?.elem_sqrt()?;

    let fill = sd.scale_shift(nn as f64 * (2.0 * alpha * step as f64).exp(), 0.0)?;
    sim.with_diagonal(&fill)
}
