use crate::common_io::Delimiter;
use candle_core::{DType, Device, Tensor};
use ndarray::Array2;

/// Dense two-dimensional arrays that can take part in message
/// passing. Every operation returns a new array; broadcasting follows
/// numpy rules, so an `n x 1` column and a `1 x m` row combine into
/// an `n x m` matrix.
///
/// Implemented for `ndarray::Array2<T>` (host memory) and
/// `candle_core::Tensor` (any candle device).
pub trait DenseOps: Sized + Clone {
    /// `(rows, columns)`
    fn shape2(&self) -> anyhow::Result<(usize, usize)>;

    /// Matrix product `self * other`
    fn dot_with(&self, other: &Self) -> anyhow::Result<Self>;

    fn transposed(&self) -> anyhow::Result<Self>;

    /// `n x 1` sums over each row
    fn row_sums(&self) -> anyhow::Result<Self>;

    /// `n x 1` sums of squares over each row
    fn row_sq_sums(&self) -> anyhow::Result<Self>;

    /// `1 x m` sums of squares over each column
    fn column_sq_sums(&self) -> anyhow::Result<Self>;

    fn plus(&self, other: &Self) -> anyhow::Result<Self>;
    fn minus(&self, other: &Self) -> anyhow::Result<Self>;
    fn divide(&self, other: &Self) -> anyhow::Result<Self>;

    fn elem_abs(&self) -> anyhow::Result<Self>;
    fn elem_sqrt(&self) -> anyhow::Result<Self>;
    fn elem_square(&self) -> anyhow::Result<Self>;

    /// `max(x, 0)` for each element
    fn elem_nonneg(&self) -> anyhow::Result<Self>;

    /// `mul * x + add` for each element
    fn scale_shift(&self, mul: f64, add: f64) -> anyhow::Result<Self>;

    /// Average over all the elements
    fn grand_mean(&self) -> anyhow::Result<f64>;

    /// `n x 1` column holding the diagonal of a square matrix
    fn diagonal_column(&self) -> anyhow::Result<Self>;

    /// Copy of a square matrix with its diagonal replaced by the
    /// `n x 1` column `diag`
    fn with_diagonal(&self, diag: &Self) -> anyhow::Result<Self>;

    /// Bring the values back to host memory in double precision
    fn to_array(&self) -> anyhow::Result<Array2<f64>>;
}

/// Moving matrices between host arrays and candle tensors
pub trait ConvertMatOps {
    type Mat;

    fn from_tensor(_: &Tensor) -> anyhow::Result<Self::Mat>;
    fn to_tensor(&self, dev: &Device, dtype: DType) -> anyhow::Result<Tensor>;
}

/// Standardize rows, columns, or the whole matrix
pub trait MatOps {
    type Mat;
    type Scalar;

    /// Column-wise z-score with the population standard deviation.
    /// Columns without variation become all `NaN`.
    fn zscore_columns(&self) -> Self::Mat;

    /// Row-wise z-score; rows without variation become all `NaN`.
    fn zscore_rows(&self) -> Self::Mat;

    /// Z-score against the grand mean and standard deviation. A
    /// matrix without any variation maps to zeros.
    fn zscore_total(&self) -> Self::Mat;

    /// Pearson correlation between rows. Rows without variation
    /// produce `NaN` in their row and column.
    fn row_correlation(&self) -> Self::Mat;

    fn has_nan(&self) -> bool;
}

/// Operations to sample random matrices, only works for
/// `ndarray::Array2`
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif(dd: usize, nn: usize) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm(dd: usize, nn: usize) -> Self::Mat;
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat>;

    fn from_tsv(tsv_file: &str, skip: Option<usize>) -> anyhow::Result<Self::Mat> {
        Self::read_file_delim(tsv_file, "\t", skip)
    }

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t")
    }

    fn to_csv(&self, csv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(csv_file, ",")
    }
}
