use candle_core::{DType, Device};
use clap::ValueEnum;
use std::time::Duration;

/// How the gene and TF label sets of the three inputs are reconciled
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Sorted union; entities missing from a source get zero rows/columns
    #[default]
    Union,
    /// Sorted intersection; entities outside it are dropped everywhere
    Intersection,
    /// Genes follow the expression table, TFs follow the motif prior
    Legacy,
}

impl std::str::FromStr for AlignmentMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "intersection" => Ok(Self::Intersection),
            "legacy" => Ok(Self::Legacy),
            _ => anyhow::bail!("Unknown alignment mode: {}", s),
        }
    }
}

/// Where the message passing runs. `Cpu` works on host `ndarray`
/// matrices; the others move the working matrices to a candle device
/// for the duration of the loop.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl ComputeDevice {
    /// Create a candle `Device` from this enum.
    pub fn to_device(&self, device_no: usize) -> anyhow::Result<Device> {
        Ok(match self {
            ComputeDevice::Metal => Device::new_metal(device_no)?,
            ComputeDevice::Cuda => Device::new_cuda(device_no)?,
            ComputeDevice::Cpu => Device::Cpu,
        })
    }
}

impl std::str::FromStr for ComputeDevice {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            _ => anyhow::bail!("Unknown compute device: {}", s),
        }
    }
}

/// Floating point width of the three working matrices
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl Precision {
    pub fn dtype(&self) -> DType {
        match self {
            Precision::Single => DType::F32,
            Precision::Double => DType::F64,
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "single" | "f32" => Ok(Self::Single),
            "double" | "f64" => Ok(Self::Double),
            _ => anyhow::bail!("Unknown precision: {}", s),
        }
    }
}

/// What to do with a motif/PPI triple or an expression row whose
/// label is not part of the aligned gene/TF sets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UnmatchedLabels {
    /// Skip it and report how many were skipped
    #[default]
    Drop,
    /// Attribute it to the first gene/TF
    MapToFirst,
}

#[derive(Debug, Clone)]
pub struct PandaConfig {
    pub mode: AlignmentMode,
    /// learning rate in (0, 1)
    pub alpha: f64,
    pub device: ComputeDevice,
    pub precision: Precision,
    /// dense TF x gene result if set; edge list otherwise
    pub save_memory: bool,
    /// legacy mode only: drop genes/TFs absent from the motif prior
    pub remove_missing: bool,
    /// keep the aligned expression matrix (needed by LIONESS)
    pub keep_expression_matrix: bool,
    pub unmatched_labels: UnmatchedLabels,
    /// stop once the mean absolute change drops to this level
    pub tolerance: f64,
    pub max_iter: usize,
    pub timeout: Option<Duration>,
}

impl Default for PandaConfig {
    fn default() -> Self {
        Self {
            mode: AlignmentMode::Union,
            alpha: 0.1,
            device: ComputeDevice::Cpu,
            precision: Precision::Double,
            save_memory: true,
            remove_missing: false,
            keep_expression_matrix: false,
            unmatched_labels: UnmatchedLabels::Drop,
            tolerance: 1e-3,
            max_iter: 10_000,
            timeout: None,
        }
    }
}

impl PandaConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            anyhow::bail!("learning rate alpha must be in (0, 1): {}", self.alpha);
        }
        if !(self.tolerance > 0.0) {
            anyhow::bail!("tolerance must be positive: {}", self.tolerance);
        }
        if self.max_iter == 0 {
            anyhow::bail!("max_iter must be at least 1");
        }
        if self.remove_missing && self.mode != AlignmentMode::Legacy {
            log::warn!("remove_missing only applies to the legacy mode; ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_options() -> anyhow::Result<()> {
        assert_eq!("Union".parse::<AlignmentMode>()?, AlignmentMode::Union);
        assert_eq!("legacy".parse::<AlignmentMode>()?, AlignmentMode::Legacy);
        assert!("outer".parse::<AlignmentMode>().is_err());
        assert_eq!("gpu".parse::<ComputeDevice>()?, ComputeDevice::Cuda);
        assert_eq!("single".parse::<Precision>()?.dtype(), DType::F32);
        Ok(())
    }

    #[test]
    fn reject_bad_alpha() {
        let mut config = PandaConfig::default();
        assert!(config.validate().is_ok());
        config.alpha = 1.0;
        assert!(config.validate().is_err());
        config.alpha = 0.0;
        assert!(config.validate().is_err());
        config.alpha = f64::NAN;
        assert!(config.validate().is_err());
    }
}
