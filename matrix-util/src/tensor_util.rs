use crate::traits::*;
use candle_core::{DType, Device, Tensor};
use ndarray::Array2;

impl DenseOps for Tensor {
    fn shape2(&self) -> anyhow::Result<(usize, usize)> {
        Ok(self.dims2()?)
    }

    fn dot_with(&self, other: &Self) -> anyhow::Result<Self> {
        Ok(self.contiguous()?.matmul(&other.contiguous()?)?)
    }

    fn transposed(&self) -> anyhow::Result<Self> {
        Ok(self.t()?.contiguous()?)
    }

    fn row_sums(&self) -> anyhow::Result<Self> {
        Ok(self.sum_keepdim(1)?)
    }

    fn row_sq_sums(&self) -> anyhow::Result<Self> {
        Ok(self.sqr()?.sum_keepdim(1)?)
    }

    fn column_sq_sums(&self) -> anyhow::Result<Self> {
        Ok(self.sqr()?.sum_keepdim(0)?)
    }

    fn plus(&self, other: &Self) -> anyhow::Result<Self> {
        Ok(self.broadcast_add(other)?)
    }

    fn minus(&self, other: &Self) -> anyhow::Result<Self> {
        Ok(self.broadcast_sub(other)?)
    }

    fn divide(&self, other: &Self) -> anyhow::Result<Self> {
        Ok(self.broadcast_div(other)?)
    }

    fn elem_abs(&self) -> anyhow::Result<Self> {
        Ok(self.abs()?)
    }

    fn elem_sqrt(&self) -> anyhow::Result<Self> {
        Ok(self.sqrt()?)
    }

    fn elem_square(&self) -> anyhow::Result<Self> {
        Ok(self.sqr()?)
    }

    fn elem_nonneg(&self) -> anyhow::Result<Self> {
        Ok(self.relu()?)
    }

    fn scale_shift(&self, mul: f64, add: f64) -> anyhow::Result<Self> {
        Ok(self.affine(mul, add)?)
    }

    fn grand_mean(&self) -> anyhow::Result<f64> {
        Ok(self.mean_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?)
    }

    fn diagonal_column(&self) -> anyhow::Result<Self> {
        let (nn, mm) = self.dims2()?;
        if nn != mm {
            anyhow::bail!("diagonal of a non-square ({}, {}) tensor", nn, mm);
        }
        let eye = Tensor::eye(nn, self.dtype(), self.device())?;
        Ok(self.mul(&eye)?.sum_keepdim(1)?)
    }

    fn with_diagonal(&self, diag: &Self) -> anyhow::Result<Self> {
        let (nn, mm) = self.dims2()?;
        if nn != mm || diag.dims2()? != (nn, 1) {
            anyhow::bail!(
                "can't put a {:?} diagonal on a ({}, {}) tensor",
                diag.dims(),
                nn,
                mm
            );
        }
        let eye = Tensor::eye(nn, self.dtype(), self.device())?;
        let off_diag = self.mul(&eye.affine(-1.0, 1.0)?)?;
        Ok(off_diag.add(&eye.broadcast_mul(diag)?)?)
    }

    fn to_array(&self) -> anyhow::Result<Array2<f64>> {
        Array2::<f64>::from_tensor(self)
    }
}

impl ConvertMatOps for Array2<f64> {
    type Mat = Self;

    fn from_tensor(tensor: &Tensor) -> anyhow::Result<Self::Mat> {
        let (nrows, ncols) = tensor.dims2()?;
        let data = tensor
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?;
        Ok(Array2::from_shape_vec((nrows, ncols), data)?)
    }

    /// Populate on the host in the requested type, then move to `dev`
    /// (some devices can't hold `f64`)
    fn to_tensor(&self, dev: &Device, dtype: DType) -> anyhow::Result<Tensor> {
        let data: Vec<f64> = self.iter().copied().collect();
        Ok(Tensor::from_vec(data, self.dim(), &Device::Cpu)?
            .to_dtype(dtype)?
            .to_device(dev)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn tensor_matches_ndarray() -> anyhow::Result<()> {
        let xx = array![[1.0, -2.0, 3.0], [0.5, 4.0, -1.0], [2.0, 2.0, 2.0]];
        let tt = xx.to_tensor(&Device::Cpu, DType::F64)?;

        let a = xx.dot_with(&xx.transposed()?)?;
        let b = tt.dot_with(&tt.transposed()?)?.to_array()?;
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);

        let a = xx.row_sq_sums()?.plus(&xx.column_sq_sums()?)?;
        let b = tt.row_sq_sums()?.plus(&tt.column_sq_sums()?)?.to_array()?;
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);

        let d = array![[9.0], [8.0], [7.0]];
        let a = xx.with_diagonal(&d)?;
        let b = tt
            .with_diagonal(&d.to_tensor(&Device::Cpu, DType::F64)?)?
            .to_array()?;
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        assert_abs_diff_eq!(xx.grand_mean()?, tt.grand_mean()?, epsilon = 1e-12);
        Ok(())
    }
}
