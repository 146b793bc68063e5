pub use ndarray::prelude::*;
pub use rand::Rng;
pub use rand_distr::StandardNormal;
pub use rayon::prelude::*;

use crate::traits::*;
use ndarray::{LinalgScalar, Zip};
use num_traits::{Float, FromPrimitive};

impl<T> SampleOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive + Send,
{
    type Mat = Self;
    type Scalar = T;

    fn runif(dd: usize, nn: usize) -> Self::Mat {
        let rvec: Vec<T> = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| {
                let x: f64 = rng.random();
                T::from_f64(x).unwrap_or_else(T::zero)
            })
            .collect();

        Array2::from_shape_vec((dd, nn), rvec).expect("runif shape")
    }

    fn rnorm(dd: usize, nn: usize) -> Self::Mat {
        let rvec: Vec<T> = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| {
                let x: f64 = rng.sample(StandardNormal);
                T::from_f64(x).unwrap_or_else(T::zero)
            })
            .collect();

        Array2::from_shape_vec((dd, nn), rvec).expect("rnorm shape")
    }
}

fn broadcast_len(a: usize, b: usize) -> anyhow::Result<usize> {
    match (a, b) {
        _ if a == b => Ok(a),
        (1, _) => Ok(b),
        (_, 1) => Ok(a),
        _ => Err(anyhow::anyhow!("incompatible dimensions {} vs. {}", a, b)),
    }
}

/// Element-wise `f(a, b)` after broadcasting both to a common shape
fn broadcast_zip<T, F>(a: &Array2<T>, b: &Array2<T>, f: F) -> anyhow::Result<Array2<T>>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let (na, ma) = a.dim();
    let (nb, mb) = b.dim();
    let shape = (broadcast_len(na, nb)?, broadcast_len(ma, mb)?);

    let aa = a
        .broadcast(shape)
        .ok_or(anyhow::anyhow!("can't broadcast {:?} to {:?}", a.dim(), shape))?;
    let bb = b
        .broadcast(shape)
        .ok_or(anyhow::anyhow!("can't broadcast {:?} to {:?}", b.dim(), shape))?;

    Ok(Zip::from(&aa).and(&bb).map_collect(|&x, &y| f(x, y)))
}

fn to_scalar<T: FromPrimitive>(x: f64) -> anyhow::Result<T> {
    T::from_f64(x).ok_or(anyhow::anyhow!("{} is not representable", x))
}

impl<T> DenseOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive + LinalgScalar,
{
    fn shape2(&self) -> anyhow::Result<(usize, usize)> {
        Ok(self.dim())
    }

    fn dot_with(&self, other: &Self) -> anyhow::Result<Self> {
        if self.ncols() != other.nrows() {
            anyhow::bail!(
                "can't multiply {:?} and {:?} matrices",
                self.dim(),
                other.dim()
            );
        }
        Ok(self.dot(other))
    }

    fn transposed(&self) -> anyhow::Result<Self> {
        Ok(self.t().as_standard_layout().into_owned())
    }

    fn row_sums(&self) -> anyhow::Result<Self> {
        Ok(self.sum_axis(Axis(1)).insert_axis(Axis(1)))
    }

    fn row_sq_sums(&self) -> anyhow::Result<Self> {
        Ok(self
            .map_axis(Axis(1), |x| x.fold(T::zero(), |acc, &v| acc + v * v))
            .insert_axis(Axis(1)))
    }

    fn column_sq_sums(&self) -> anyhow::Result<Self> {
        Ok(self
            .map_axis(Axis(0), |x| x.fold(T::zero(), |acc, &v| acc + v * v))
            .insert_axis(Axis(0)))
    }

    fn plus(&self, other: &Self) -> anyhow::Result<Self> {
        broadcast_zip(self, other, |x, y| x + y)
    }

    fn minus(&self, other: &Self) -> anyhow::Result<Self> {
        broadcast_zip(self, other, |x, y| x - y)
    }

    fn divide(&self, other: &Self) -> anyhow::Result<Self> {
        broadcast_zip(self, other, |x, y| x / y)
    }

    fn elem_abs(&self) -> anyhow::Result<Self> {
        Ok(self.mapv(|x| x.abs()))
    }

    fn elem_sqrt(&self) -> anyhow::Result<Self> {
        Ok(self.mapv(|x| x.sqrt()))
    }

    fn elem_square(&self) -> anyhow::Result<Self> {
        Ok(self.mapv(|x| x * x))
    }

    fn elem_nonneg(&self) -> anyhow::Result<Self> {
        Ok(self.mapv(|x| x.max(T::zero())))
    }

    fn scale_shift(&self, mul: f64, add: f64) -> anyhow::Result<Self> {
        let (mul, add): (T, T) = (to_scalar(mul)?, to_scalar(add)?);
        Ok(self.mapv(|x| mul * x + add))
    }

    fn grand_mean(&self) -> anyhow::Result<f64> {
        self.mean()
            .and_then(|x| x.to_f64())
            .ok_or(anyhow::anyhow!("mean of an empty matrix"))
    }

    fn diagonal_column(&self) -> anyhow::Result<Self> {
        if self.nrows() != self.ncols() {
            anyhow::bail!("diagonal of a non-square {:?} matrix", self.dim());
        }
        Ok(self.diag().to_owned().insert_axis(Axis(1)))
    }

    fn with_diagonal(&self, diag: &Self) -> anyhow::Result<Self> {
        let nn = self.nrows();
        if self.ncols() != nn || diag.dim() != (nn, 1) {
            anyhow::bail!(
                "can't put a {:?} diagonal on a {:?} matrix",
                diag.dim(),
                self.dim()
            );
        }
        let mut ret = self.clone();
        ret.diag_mut().assign(&diag.column(0));
        Ok(ret)
    }

    fn to_array(&self) -> anyhow::Result<Array2<f64>> {
        Ok(self.mapv(|x| x.to_f64().unwrap_or(f64::NAN)))
    }
}

/// Cast a double precision matrix to the working precision `T`
pub fn cast_array<T>(xx: &Array2<f64>) -> anyhow::Result<Array2<T>>
where
    T: FromPrimitive + Clone,
{
    let data = xx
        .iter()
        .map(|&x| to_scalar::<T>(x))
        .collect::<anyhow::Result<Vec<T>>>()?;
    Ok(Array2::from_shape_vec(xx.dim(), data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn broadcast_row_and_column() -> anyhow::Result<()> {
        let col = array![[1.0], [2.0], [3.0]];
        let row = array![[10.0, 20.0]];
        let xx = col.plus(&row)?;
        assert_eq!(xx, array![[11.0, 21.0], [12.0, 22.0], [13.0, 23.0]]);
        assert!(col.plus(&array![[1.0, 2.0], [3.0, 4.0]]).is_err());
        Ok(())
    }

    #[test]
    fn replace_diagonal() -> anyhow::Result<()> {
        let xx = Array2::<f32>::ones((3, 3));
        let yy = xx.with_diagonal(&array![[5.0], [6.0], [7.0]])?;
        assert_eq!(yy.diag().to_vec(), vec![5.0, 6.0, 7.0]);
        assert_eq!(yy[(0, 1)], 1.0);
        assert_eq!(yy.diagonal_column()?, array![[5.0], [6.0], [7.0]]);
        Ok(())
    }

    #[test]
    fn sums_of_squares() -> anyhow::Result<()> {
        let xx = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(xx.row_sq_sums()?, array![[5.0], [25.0]]);
        assert_eq!(xx.column_sq_sums()?, array![[10.0, 20.0]]);
        assert_abs_diff_eq!(xx.grand_mean()?, 2.5);
        Ok(())
    }
}
