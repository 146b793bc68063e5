use approx::assert_abs_diff_eq;
use matrix_util::traits::{MatOps, SampleOps};
use ndarray::{Array2, Axis};

#[test]
fn zscore_columns_test() {
    let xx = Array2::<f64>::rnorm(100, 10).mapv(|x| 3.0 * x + 1.0);
    let zz = xx.zscore_columns();

    for col in zz.axis_iter(Axis(1)) {
        assert_abs_diff_eq!(col.mean().unwrap(), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(col.std(0.0), 1.0, epsilon = 1e-10);
    }
    assert!(!zz.has_nan());
}

#[test]
fn zscore_rows_is_transposed_columns() {
    let xx = Array2::<f64>::runif(6, 9);
    let a = xx.zscore_rows();
    let b = xx.t().to_owned().zscore_columns().t().to_owned();
    assert_abs_diff_eq!(a, b, epsilon = 1e-12);
}

#[test]
fn correlation_is_symmetric_with_unit_diagonal() {
    let xx = Array2::<f64>::rnorm(8, 30);
    let cc = xx.row_correlation();

    assert_abs_diff_eq!(cc, cc.t(), epsilon = 1e-12);
    for i in 0..8 {
        assert_abs_diff_eq!(cc[(i, i)], 1.0, epsilon = 1e-12);
    }
}
