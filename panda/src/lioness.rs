use crate::align::coexpression;
use crate::config::ComputeDevice;
use crate::export::LabeledMatrix;
use crate::normalize::normalize_network;
use crate::panda::{refine_network, Panda};
use clap::ValueEnum;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget};
use log::info;
use matrix_util::common_io::{format_extension, mkdir, write_lines};
use matrix_util::parquet::{write_parquet_columns, ParquetColumn};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// What to keep of each sample-specific network
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "kebab-case")]
pub enum LionessOutput {
    /// every edge, flattened gene by gene
    #[default]
    Network,
    /// total incoming force of each gene
    GeneTargeting,
    /// total outgoing force of each TF
    TfTargeting,
}

#[derive(Debug, Clone)]
pub struct LionessConfig {
    /// first sample (1-based)
    pub start: usize,
    /// last sample (1-based, inclusive); all the rest if `None`
    pub end: Option<usize>,
    pub output: LionessOutput,
    /// write each sample's network to `<dir>/lioness.<i>.tsv.gz`
    pub save_dir: Option<Box<str>>,
    pub show_progress: bool,
}

impl Default for LionessConfig {
    fn default() -> Self {
        Self {
            start: 1,
            end: None,
            output: LionessOutput::Network,
            save_dir: None,
            show_progress: false,
        }
    }
}

/// Sample-specific networks, one column per sample
#[derive(Debug, Clone)]
pub struct LionessNetworks {
    pub output: LionessOutput,
    /// TF (or first gene) of each edge; gene or TF names for the
    /// targeting scores
    pub rows: Vec<Box<str>>,
    /// target gene of each edge in the `Network` output
    pub targets: Option<Vec<Box<str>>>,
    pub samples: Vec<Box<str>>,
    pub data: Array2<f64>,
}

/// `N * (network - subset) + subset`
fn lioness_network(network: &Array2<f64>, subset: &Array2<f64>, nsamples: usize) -> Array2<f64> {
    let nn = nsamples as f64;
    network * nn - subset * (nn - 1.0)
}

/// Estimate one network per sample by leaving the sample out of the
/// co-expression and contrasting the result with the aggregate
/// network. Requires a run that kept its expression matrix.
pub fn run_lioness(panda: &Panda, config: &LionessConfig) -> anyhow::Result<LionessNetworks> {
    let expression = panda.expression.as_ref().ok_or(anyhow::anyhow!(
        "LIONESS needs the expression matrix: run PANDA with keep_expression_matrix"
    ))?;

    let nsamples = expression.ncols();
    let end = config.end.unwrap_or(nsamples);
    if config.start < 1 || config.start > end || end > nsamples {
        anyhow::bail!(
            "invalid sample range {}..={} for {} samples",
            config.start,
            end,
            nsamples
        );
    }
    if nsamples < 2 {
        anyhow::bail!("LIONESS needs at least two samples");
    }

    let network = panda.network_matrix()?;

    let (row_names, col_names) = match (&panda.motif, &panda.ppi) {
        (Some(_), Some(_)) => (&panda.tfs, &panda.genes),
        _ => (&panda.genes, &panda.genes),
    };

    if network.dim() != (row_names.len(), col_names.len()) {
        anyhow::bail!(
            "aggregate network {:?} doesn't match {} x {} labels",
            network.dim(),
            row_names.len(),
            col_names.len()
        );
    }

    let jobs: Vec<usize> = ((config.start - 1)..end).collect();

    info!("Running LIONESS on {} samples ...", jobs.len());

    let sample_network = |i: usize| -> anyhow::Result<Array1<f64>> {
        let others: Vec<usize> = (0..nsamples).filter(|&j| j != i).collect();
        let correlation = coexpression(&expression.select(Axis(1), &others));

        let subset = match (&panda.motif, &panda.ppi) {
            (Some(motif), Some(ppi)) => {
                let correlation = normalize_network(&correlation);
                refine_network(motif, ppi, &correlation, &panda.config)?.network
            }
            _ => correlation,
        };

        let lioness = lioness_network(&network, &subset, nsamples);

        if let Some(dir) = config.save_dir.as_deref() {
            let file = format!("{}/lioness.{}.tsv.gz", dir, i + 1);
            LabeledMatrix::new(row_names.clone(), col_names.clone(), lioness.clone())?
                .to_file(&file)?;
        }

        Ok(match config.output {
            LionessOutput::Network => lioness.t().iter().copied().collect(),
            LionessOutput::GeneTargeting => lioness.sum_axis(Axis(0)),
            LionessOutput::TfTargeting => lioness.sum_axis(Axis(1)),
        })
    };

    let columns: Vec<Array1<f64>> = match panda.config.device {
        ComputeDevice::Cpu => {
            let pb = ProgressBar::new(jobs.len() as u64);
            if !config.show_progress {
                pb.set_draw_target(ProgressDrawTarget::hidden());
            }
            jobs.par_iter()
                .progress_with(pb)
                .map(|&i| sample_network(i))
                .collect::<anyhow::Result<Vec<_>>>()?
        }
        _ => {
            // one sample at a time on the accelerator
            let pb = ProgressBar::new(jobs.len() as u64);
            if !config.show_progress {
                pb.set_draw_target(ProgressDrawTarget::hidden());
            }
            let mut columns = Vec::with_capacity(jobs.len());
            for &i in jobs.iter() {
                columns.push(sample_network(i)?);
                pb.inc(1);
            }
            pb.finish_and_clear();
            columns
        }
    };

    let nrows = columns.first().map(|c| c.len()).unwrap_or(0);
    let mut data = Array2::<f64>::zeros((nrows, columns.len()));
    for (mut target, column) in data.axis_iter_mut(Axis(1)).zip(columns.iter()) {
        target.assign(column);
    }

    let samples: Vec<Box<str>> = jobs
        .iter()
        .map(|&i| {
            panda
                .samples
                .get(i)
                .cloned()
                .unwrap_or_else(|| (i + 1).to_string().into_boxed_str())
        })
        .collect();

    let (rows, targets) = match config.output {
        LionessOutput::Network => {
            let edges = LabeledMatrix::new(row_names.clone(), col_names.clone(), network)?.melt(None)?;
            (edges.tf, Some(edges.gene))
        }
        LionessOutput::GeneTargeting => (col_names.clone(), None),
        LionessOutput::TfTargeting => (row_names.clone(), None),
    };

    info!("LIONESS: {} x {} output", data.nrows(), data.ncols());

    Ok(LionessNetworks {
        output: config.output,
        rows,
        targets,
        samples,
        data,
    })
}

impl LionessNetworks {
    fn row_header(&self) -> (&'static str, Option<&'static str>) {
        match self.output {
            LionessOutput::Network => ("tf", Some("gene")),
            LionessOutput::GeneTargeting => ("gene", None),
            LionessOutput::TfTargeting => ("tf", None),
        }
    }

    /// Write `.tsv`/`.csv`/`.txt` (optionally `.gz`) or `.parquet`
    /// with the row labels first and one column per sample
    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        let (first, second) = self.row_header();

        if &*format_extension(file)? == "parquet" {
            let column_data: Vec<Vec<f64>> =
                self.data.columns().into_iter().map(|c| c.to_vec()).collect();
            let mut columns = vec![(first, ParquetColumn::Text(&self.rows))];
            if let (Some(name), Some(targets)) = (second, self.targets.as_ref()) {
                columns.push((name, ParquetColumn::Text(targets)));
            }
            for (s, x) in self.samples.iter().zip(column_data.iter()) {
                columns.push((&**s, ParquetColumn::Real(x)));
            }
            return write_parquet_columns(file, &columns);
        }

        let delim = match &*format_extension(file)? {
            "csv" => ",",
            "txt" => " ",
            _ => "\t",
        };

        let mut header: Vec<&str> = vec![first];
        if self.targets.is_some() {
            header.extend(second);
        }
        header.extend(self.samples.iter().map(|s| &**s));

        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.data.nrows() + 1);
        lines.push(header.join(delim).into_boxed_str());

        for (r, row) in self.data.rows().into_iter().enumerate() {
            let mut words: Vec<String> = vec![self.rows[r].to_string()];
            if let Some(targets) = self.targets.as_ref() {
                words.push(targets[r].to_string());
            }
            words.extend(row.iter().map(|x| x.to_string()));
            lines.push(words.join(delim).into_boxed_str());
        }
        write_lines(&lines, file)?;
        info!("Wrote LIONESS output to {}", file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn contrast_with_aggregate() {
        let network = array![[1.0, 2.0]];
        let subset = array![[0.5, 2.0]];
        let x = lioness_network(&network, &subset, 4);
        assert_eq!(x, array![[4.0 * 0.5 + 0.5, 2.0]]);
    }
}
