use log::debug;
use matrix_util::traits::MatOps;
use ndarray::{Array2, Zip};

/// Standardize a network by combining its column-wise and row-wise
/// z-scores, `(z_col + z_row) / sqrt(2)`.
///
/// A square matrix takes the transpose of the column z-scores as its
/// row z-scores. Where a column or row has no variation, the
/// whole-matrix z-score fills in for the missing term.
pub fn normalize_network(x: &Array2<f64>) -> Array2<f64> {
    let (nr, nc) = x.dim();
    if nr == 0 || nc == 0 {
        return x.clone();
    }

    let z_col = x.zscore_columns();
    let z_row = if nr == nc {
        z_col.t().to_owned()
    } else {
        x.zscore_rows()
    };

    let z_tot = if z_col.has_nan() || z_row.has_nan() {
        debug!("degenerate rows/columns in a {} x {} network", nr, nc);
        Some(x.zscore_total())
    } else {
        None
    };

    let sqrt2 = std::f64::consts::SQRT_2;

    match z_tot {
        None => Zip::from(&z_col)
            .and(&z_row)
            .map_collect(|&c, &r| (c + r) / sqrt2),
        Some(z_tot) => Zip::from(&z_col)
            .and(&z_row)
            .and(&z_tot)
            .map_collect(|&c, &r, &t| match (c.is_nan(), r.is_nan()) {
                (false, false) => (c + r) / sqrt2,
                (true, false) => (r + t) / sqrt2,
                (false, true) => (c + t) / sqrt2,
                (true, true) => 2.0 * t / sqrt2,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use matrix_util::traits::SampleOps;
    use ndarray::{array, Axis};

    #[test]
    fn square_matrix_is_symmetrized() {
        let x = Array2::<f64>::runif(7, 7);
        let z = normalize_network(&x);
        assert_abs_diff_eq!(z, z.t().to_owned(), epsilon = 1e-12);
    }

    #[test]
    fn rectangular_matrix() {
        let x = Array2::<f64>::rnorm(5, 9);
        let z = normalize_network(&x);
        let expected = (x.zscore_columns() + x.zscore_rows()) / 2_f64.sqrt();
        assert_abs_diff_eq!(z, expected, epsilon = 1e-12);
        for s in z.sum_axis(Axis(0)).iter() {
            assert!(s.is_finite());
        }
    }

    #[test]
    fn constant_column_falls_back_to_total() {
        let x = array![[1.0, 0.0, 3.0], [1.0, 2.0, 0.0]];
        let z = normalize_network(&x);
        assert!(!z.has_nan());

        let z_row = x.zscore_rows();
        let z_tot = x.zscore_total();
        assert_abs_diff_eq!(
            z[(0, 0)],
            (z_row[(0, 0)] + z_tot[(0, 0)]) / 2_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn identity_stays_symmetric() {
        let z = normalize_network(&Array2::<f64>::eye(4));
        assert!(!z.has_nan());
        assert_abs_diff_eq!(z, z.t().to_owned(), epsilon = 1e-12);
        assert!(z[(0, 0)] > z[(0, 1)]);
    }

    #[test]
    fn constant_matrix_is_zero() {
        let z = normalize_network(&Array2::<f64>::ones((3, 5)));
        assert_eq!(z, Array2::<f64>::zeros((3, 5)));
    }

    #[test]
    fn tiny_scale_column_is_not_degenerate() {
        let x = array![[0.0, 1.0, 5.0], [1e-17, 3.0, 4.0], [0.0, 2.0, 9.0]];
        let z = normalize_network(&x);

        let mut z_col = x.clone();
        for mut col in z_col.axis_iter_mut(Axis(1)) {
            let mu = col.mean().unwrap();
            let sig = col.std(0.0);
            col.mapv_inplace(|v| (v - mu) / sig);
        }
        let expected = (&z_col + &z_col.t()) / 2_f64.sqrt();

        assert!(!z.has_nan());
        assert_abs_diff_eq!(z, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(z_col[(1, 0)], 2_f64.sqrt(), epsilon = 1e-9);
    }
}
