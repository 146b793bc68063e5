use crate::align::{align_inputs, PandaInput};
use crate::checkpoint::CheckpointSink;
use crate::config::{ComputeDevice, PandaConfig, Precision};
use crate::export::{LabeledMatrix, PandaNetwork};
use crate::message_passing::{Converged, MessagePassing};
use crate::normalize::normalize_network;
use log::info;
use matrix_util::ndarray_util::cast_array;
use matrix_util::traits::{ConvertMatOps, DenseOps};
use ndarray::Array2;

/// Refined TF x gene network and how the loop got there
pub struct Refined {
    pub network: Array2<f64>,
    pub steps: usize,
    pub hamming: Vec<f64>,
}

impl Refined {
    fn from_converged<D: DenseOps>(res: Converged<D>) -> anyhow::Result<Self> {
        Ok(Self {
            network: res.motif.to_array()?,
            steps: res.steps,
            hamming: res.hamming,
        })
    }
}

/// Run the message passing on the configured device and precision,
/// starting from normalized motif, PPI and co-expression matrices
pub fn refine_network(
    motif: &Array2<f64>,
    ppi: &Array2<f64>,
    correlation: &Array2<f64>,
    config: &PandaConfig,
) -> anyhow::Result<Refined> {
    let mp = MessagePassing::from(config);

    match (config.device, config.precision) {
        (ComputeDevice::Cpu, Precision::Double) => Refined::from_converged(mp.run(
            motif.clone(),
            ppi.clone(),
            correlation.clone(),
        )?),
        (ComputeDevice::Cpu, Precision::Single) => Refined::from_converged(mp.run(
            cast_array::<f32>(motif)?,
            cast_array::<f32>(ppi)?,
            cast_array::<f32>(correlation)?,
        )?),
        (dev, precision) => {
            let dev = dev.to_device(0)?;
            let dtype = precision.dtype();
            Refined::from_converged(mp.run(
                motif.to_tensor(&dev, dtype)?,
                ppi.to_tensor(&dev, dtype)?,
                correlation.to_tensor(&dev, dtype)?,
            )?)
        }
    }
}

/// Result of a PANDA run
pub struct Panda {
    pub network: PandaNetwork,
    pub genes: Vec<Box<str>>,
    pub tfs: Vec<Box<str>>,
    pub samples: Vec<Box<str>>,
    /// aligned genes x samples, kept on request
    pub expression: Option<Array2<f64>>,
    /// normalized motif prior, kept along with the expression
    pub motif: Option<Array2<f64>>,
    /// normalized PPI prior, kept along with the expression
    pub ppi: Option<Array2<f64>>,
    pub steps: usize,
    pub hamming: Vec<f64>,
    pub config: PandaConfig,
}

impl Panda {
    /// Align the inputs, normalize them and refine the motif prior into
    /// a TF x gene network. Without a motif prior the gene x gene
    /// co-expression matrix is the result.
    ///
    /// * `checkpoint`: receives `expression`, `motif.normalized` and
    ///   `ppi.normalized` as they become available
    ///
    pub fn run(
        input: PandaInput,
        config: &PandaConfig,
        mut checkpoint: Option<&mut dyn CheckpointSink>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let data = align_inputs(input, config)?;

        if let (Some(sink), Some(expr)) = (checkpoint.as_deref_mut(), data.expression.as_ref()) {
            sink.save("expression", expr)?;
        }

        let expression = if config.keep_expression_matrix {
            data.expression
        } else {
            None
        };

        let (Some(motif_raw), Some(ppi_raw)) = (data.motif, data.ppi) else {
            let coexpression = LabeledMatrix::new(data.genes.clone(), data.genes.clone(), data.correlation)?;
            let network = if config.save_memory {
                PandaNetwork::Dense(coexpression)
            } else {
                PandaNetwork::Edges(coexpression.melt(None)?)
            };
            return Ok(Self {
                network,
                genes: data.genes,
                tfs: data.tfs,
                samples: data.samples,
                expression,
                motif: None,
                ppi: None,
                steps: 0,
                hamming: vec![],
                config: config.clone(),
            });
        };

        info!("Normalizing networks ...");
        let correlation = normalize_network(&data.correlation);
        let motif = normalize_network(&motif_raw);
        let ppi = normalize_network(&ppi_raw);
        drop(ppi_raw);

        if let Some(sink) = checkpoint.as_deref_mut() {
            sink.save("motif.normalized", &motif)?;
            sink.save("ppi.normalized", &ppi)?;
        }

        let refined = if motif.is_empty() {
            log::warn!("empty motif network; nothing to refine");
            Refined {
                network: motif.clone(),
                steps: 0,
                hamming: vec![],
            }
        } else {
            refine_network(&motif, &ppi, &correlation, config)?
        };

        let result = LabeledMatrix::new(data.tfs.clone(), data.genes.clone(), refined.network)?;
        let network = if config.save_memory {
            PandaNetwork::Dense(result)
        } else {
            PandaNetwork::Edges(result.melt(Some(&motif_raw))?)
        };

        let keep = expression.is_some();

        Ok(Self {
            network,
            genes: data.genes,
            tfs: data.tfs,
            samples: data.samples,
            expression,
            motif: keep.then_some(motif),
            ppi: keep.then_some(ppi),
            steps: refined.steps,
            hamming: refined.hamming,
            config: config.clone(),
        })
    }

    /// The result as a dense matrix regardless of its export shape
    pub fn network_matrix(&self) -> anyhow::Result<Array2<f64>> {
        match &self.network {
            PandaNetwork::Dense(m) => Ok(m.data.clone()),
            PandaNetwork::Edges(e) => Ok(e.to_dense()?.data),
        }
    }
}
