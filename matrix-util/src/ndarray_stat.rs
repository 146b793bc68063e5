use crate::traits::MatOps;
use ndarray::{Array1, Array2, ArrayView1, Axis, LinalgScalar};
use num_traits::{Float, FromPrimitive};

/// Mean and population standard deviation of a vector. The standard
/// deviation is `None` when all the values are the same.
fn mean_and_std<T>(xx: ArrayView1<T>) -> (T, Option<T>)
where
    T: Float + FromPrimitive,
{
    let nn = T::from_usize(xx.len().max(1)).unwrap_or_else(T::one);
    let mu = xx.fold(T::zero(), |acc, &x| acc + x) / nn;

    let constant = match xx.first() {
        Some(&x0) => xx.iter().all(|&x| x == x0),
        None => true,
    };
    if constant {
        return (mu, None);
    }

    let var = xx.fold(T::zero(), |acc, &x| acc + (x - mu) * (x - mu)) / nn;
    let sig = var.sqrt();

    if sig.is_finite() && sig > T::zero() {
        (mu, Some(sig))
    } else {
        (mu, None)
    }
}

fn zscore_along<T>(xx: &Array2<T>, axis: Axis) -> Array2<T>
where
    T: Float + FromPrimitive,
{
    let mut ret = xx.clone();
    for mut lane in ret.axis_iter_mut(axis) {
        match mean_and_std(lane.view()) {
            (mu, Some(sig)) => lane.mapv_inplace(|x| (x - mu) / sig),
            (_, None) => lane.fill(T::nan()),
        }
    }
    ret
}

impl<T> MatOps for Array2<T>
where
    T: Float + FromPrimitive + LinalgScalar,
{
    type Mat = Self;
    type Scalar = T;

    fn zscore_columns(&self) -> Self::Mat {
        zscore_along(self, Axis(1))
    }

    fn zscore_rows(&self) -> Self::Mat {
        zscore_along(self, Axis(0))
    }

    fn zscore_total(&self) -> Self::Mat {
        match self.as_slice_memory_order() {
            Some(flat) => match mean_and_std(ArrayView1::from(flat)) {
                (mu, Some(sig)) => self.mapv(|x| (x - mu) / sig),
                (_, None) => Array2::zeros(self.dim()),
            },
            None => self.as_standard_layout().to_owned().zscore_total(),
        }
    }

    fn row_correlation(&self) -> Self::Mat {
        let nn = self.nrows();
        let mut centred = self.clone();
        let mut norms = Array1::<T>::zeros(nn);

        for (i, mut row) in centred.axis_iter_mut(Axis(0)).enumerate() {
            match mean_and_std(row.view()) {
                (mu, Some(_)) => {
                    row.mapv_inplace(|x| x - mu);
                    norms[i] = row.fold(T::zero(), |acc, &x| acc + x * x).sqrt();
                }
                (_, None) => {
                    row.fill(T::zero());
                    norms[i] = T::nan();
                }
            }
        }

        let mut corr = centred.dot(&centred.t());
        for ((i, j), r_ij) in corr.indexed_iter_mut() {
            let r = *r_ij / (norms[i] * norms[j]);
            *r_ij = if r.is_nan() {
                r
            } else {
                r.max(-T::one()).min(T::one())
            };
        }
        corr
    }

    fn has_nan(&self) -> bool {
        self.iter().any(|x| x.is_nan())
    }
}
