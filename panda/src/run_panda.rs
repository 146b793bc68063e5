use crate::align::PandaInput;
use crate::checkpoint::{CheckpointSink, DirCheckpoint};
use crate::config::*;
use crate::export::write_degrees;
use crate::input::{EdgeTable, ExpressionTable};
use crate::panda::Panda;
use clap::Args;
use log::info;
use matrix_util::common_io::format_extension;
use std::time::Duration;

/// Inputs and options shared by `run` and `lioness`
#[derive(Args, Debug)]
pub struct PandaInputArgs {
    /// gene expression file: a gene name followed by sample values on
    /// each line (`.gz` ok)
    #[arg(long, short = 'e')]
    pub expression: Option<Box<str>>,

    /// the expression file starts with a line of sample names
    #[arg(long, default_value_t = false)]
    pub expression_header: bool,

    /// motif prior: `TF gene weight` on each line
    #[arg(long, short = 'm')]
    pub motif: Option<Box<str>>,

    /// protein-protein interactions: `TF TF weight` on each line
    #[arg(long, short = 'p')]
    pub ppi: Option<Box<str>>,

    /// how to reconcile genes and TFs across the inputs
    #[arg(long, value_enum, default_value = "union")]
    pub mode: AlignmentMode,

    /// learning rate in (0, 1)
    #[arg(long, default_value_t = 0.1)]
    pub alpha: f64,

    #[arg(long, value_enum, default_value = "cpu")]
    pub device: ComputeDevice,

    #[arg(long, value_enum, default_value = "double")]
    pub precision: Precision,

    /// legacy mode: drop genes and TFs absent from the motif prior
    #[arg(long, default_value_t = false)]
    pub remove_missing: bool,

    /// put edges with unknown labels on the first gene/TF instead of
    /// dropping them
    #[arg(long, default_value_t = false)]
    pub map_unmatched_to_first: bool,

    /// give up after this many iterations
    #[arg(long, default_value_t = 10_000)]
    pub max_iter: usize,

    /// give up after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// save the aligned expression and normalized priors here
    #[arg(long)]
    pub checkpoint_dir: Option<Box<str>>,

    /// verbosity
    #[arg(long, short)]
    pub verbose: bool,
}

impl PandaInputArgs {
    pub fn to_config(&self, save_memory: bool, keep_expression_matrix: bool) -> PandaConfig {
        PandaConfig {
            mode: self.mode,
            alpha: self.alpha,
            device: self.device,
            precision: self.precision,
            save_memory,
            remove_missing: self.remove_missing,
            keep_expression_matrix,
            unmatched_labels: if self.map_unmatched_to_first {
                UnmatchedLabels::MapToFirst
            } else {
                UnmatchedLabels::Drop
            },
            max_iter: self.max_iter,
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }

    pub fn read_input(&self) -> anyhow::Result<PandaInput> {
        let expression = self
            .expression
            .as_deref()
            .map(|f| ExpressionTable::from_file(f, self.expression_header))
            .transpose()?;
        let motif = self.motif.as_deref().map(EdgeTable::from_file).transpose()?;
        let ppi = self.ppi.as_deref().map(EdgeTable::from_file).transpose()?;

        Ok(PandaInput {
            expression,
            motif,
            ppi,
        })
    }

    /// Run PANDA with an optional checkpoint directory
    pub fn run_panda(&self, config: &PandaConfig) -> anyhow::Result<Panda> {
        let input = self.read_input()?;
        let mut checkpoint = self.checkpoint_dir.as_deref().map(DirCheckpoint::new);

        let panda = Panda::run(
            input,
            config,
            checkpoint.as_mut().map(|c| c as &mut dyn CheckpointSink),
        )?;

        info!(
            "{} TFs x {} genes, {} steps",
            panda.tfs.len(),
            panda.genes.len(),
            panda.steps
        );
        Ok(panda)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: PandaInputArgs,

    /// output file (`.tsv`, `.csv`, `.txt`, optionally `.gz`, or
    /// `.parquet`)
    #[arg(long, short, required = true)]
    pub out: Box<str>,

    /// write an edge list with the prior weights instead of a TF x
    /// gene matrix
    #[arg(long, default_value_t = false)]
    pub edges: bool,

    /// also write in- and out-degrees next to the output
    #[arg(long, default_value_t = false)]
    pub degrees: bool,
}

/// `out.tsv.gz` -> `out.<name>.tsv.gz`
fn sibling_file(out: &str, name: &str) -> anyhow::Result<String> {
    let ext = format_extension(out)?;
    let suffix = if out.ends_with(".gz") {
        format!(".{}.gz", ext)
    } else {
        format!(".{}", ext)
    };
    let stem = out.strip_suffix(suffix.as_str()).unwrap_or(out);
    Ok(format!("{}.{}{}", stem, name, suffix))
}

pub fn run_panda(args: &RunArgs) -> anyhow::Result<()> {
    if args.input.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = args.input.to_config(!args.edges, false);
    let panda = args.input.run_panda(&config)?;

    panda.network.to_file(&args.out)?;

    if args.degrees {
        let indegree_file = sibling_file(&args.out, "indegree")?;
        write_degrees(&indegree_file, &panda.network.in_degree()?, "gene")?;
        let outdegree_file = sibling_file(&args.out, "outdegree")?;
        write_degrees(&outdegree_file, &panda.network.out_degree()?, "tf")?;
        info!("degrees: {}, {}", indegree_file, outdegree_file);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_file_names() -> anyhow::Result<()> {
        assert_eq!(sibling_file("res/out.tsv.gz", "indegree")?, "res/out.indegree.tsv.gz");
        assert_eq!(sibling_file("out.parquet", "outdegree")?, "out.outdegree.parquet");
        Ok(())
    }
}
