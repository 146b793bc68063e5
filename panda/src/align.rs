use crate::config::{AlignmentMode, PandaConfig, UnmatchedLabels};
use crate::input::{sorted_unique, EdgeTable, ExpressionTable};
use log::{info, warn};
use matrix_util::traits::MatOps;
use ndarray::{Array2, Axis};
use std::collections::{HashMap, HashSet};

/// The three raw inputs; any of them may be missing, but not both
/// expression and motif
#[derive(Debug, Clone, Default)]
pub struct PandaInput {
    pub expression: Option<ExpressionTable>,
    pub motif: Option<EdgeTable>,
    pub ppi: Option<EdgeTable>,
}

/// Matrices that share one gene order and one TF order
#[derive(Debug, Clone)]
pub struct AlignedData {
    pub genes: Vec<Box<str>>,
    pub tfs: Vec<Box<str>>,
    pub samples: Vec<Box<str>>,
    /// genes x samples, re-indexed to `genes`
    pub expression: Option<Array2<f64>>,
    /// genes x genes co-expression, no `NaN`
    pub correlation: Array2<f64>,
    /// TFs x genes; `None` if no motif prior was given
    pub motif: Option<Array2<f64>>,
    /// TFs x TFs, symmetric
    pub ppi: Option<Array2<f64>>,
}

/// Name -> position lookup honouring the unmatched-label policy
struct LabelIndex {
    name2index: HashMap<Box<str>, usize>,
    policy: UnmatchedLabels,
    num_names: usize,
}

impl LabelIndex {
    fn new(names: &[Box<str>], policy: UnmatchedLabels) -> Self {
        let name2index = names
            .iter()
            .enumerate()
            .map(|(i, x)| (x.clone(), i))
            .collect();
        Self {
            name2index,
            policy,
            num_names: names.len(),
        }
    }

    fn get(&self, name: &str) -> Option<usize> {
        match (self.name2index.get(name), self.policy) {
            (Some(&i), _) => Some(i),
            (None, UnmatchedLabels::MapToFirst) if self.num_names > 0 => Some(0),
            _ => None,
        }
    }
}

fn union(a: &[Box<str>], b: &[Box<str>]) -> Vec<Box<str>> {
    sorted_unique(a.iter().chain(b.iter()))
}

fn intersection(a: &[Box<str>], b: &[Box<str>]) -> Vec<Box<str>> {
    let b: HashSet<&Box<str>> = b.iter().collect();
    sorted_unique(a.iter().filter(|x| b.contains(x)))
}

fn warn_unmatched(what: &str, nskipped: usize, policy: UnmatchedLabels) {
    if nskipped > 0 {
        match policy {
            UnmatchedLabels::Drop => warn!("dropped {} {} with unknown labels", nskipped, what),
            UnmatchedLabels::MapToFirst => {
                warn!("{} {} with unknown labels had nowhere to go", nskipped, what)
            }
        }
    }
}

/// Keep only genes and TFs supported by the motif prior (legacy mode)
fn remove_missing(
    expression: &mut Option<ExpressionTable>,
    motif: &mut EdgeTable,
    ppi: &mut Option<EdgeTable>,
) -> anyhow::Result<()> {
    let motif_genes: HashSet<Box<str>> = motif.targets().into_iter().collect();

    if let Some(expr) = expression.as_mut() {
        let keep: Vec<usize> = (0..expr.num_genes())
            .filter(|&i| motif_genes.contains(&expr.genes[i]))
            .collect();
        info!(
            "Remove expression not in motif: {} rows removed from the initial {}",
            expr.num_genes() - keep.len(),
            expr.num_genes()
        );
        let genes = keep.iter().map(|&i| expr.genes[i].clone()).collect();
        let data = expr.data.select(Axis(0), &keep);
        *expr = ExpressionTable::new(genes, expr.samples.clone(), data)?;
    }

    let gene_names: HashSet<Box<str>> = match expression.as_ref() {
        Some(expr) => expr.genes.iter().cloned().collect(),
        None => motif_genes,
    };

    let ntot = motif.len();
    motif.retain(|(_, g, _)| gene_names.contains(g));
    info!(
        "Remove motif not in expression data: {} rows removed from the initial {}",
        ntot - motif.len(),
        ntot
    );

    if let Some(ppi) = ppi.as_mut() {
        let motif_tfs: HashSet<Box<str>> = motif.sources().into_iter().collect();
        let ntot = ppi.len();
        ppi.retain(|(a, b, _)| motif_tfs.contains(a) && motif_tfs.contains(b));
        info!(
            "Remove ppi not in motif: {} rows removed from the initial {}",
            ntot - ppi.len(),
            ntot
        );
    }
    Ok(())
}

/// Reconcile the gene and TF sets of the inputs and build expression,
/// co-expression, motif and PPI matrices on them.
///
/// * Without expression data, the co-expression matrix is the
///   identity.
/// * Without a PPI table, the PPI matrix is the identity.
/// * Without a motif prior, `motif` and `ppi` are `None` and the
///   co-expression matrix is the final network.
///
pub fn align_inputs(input: PandaInput, config: &PandaConfig) -> anyhow::Result<AlignedData> {
    let PandaInput {
        mut expression,
        mut motif,
        mut ppi,
    } = input;

    if expression.is_none() && motif.is_none() {
        anyhow::bail!("need expression data or a motif prior");
    }

    let policy = config.unmatched_labels;

    if config.mode == AlignmentMode::Legacy && config.remove_missing {
        if let Some(motif) = motif.as_mut() {
            remove_missing(&mut expression, motif, &mut ppi)?;
        }
    }

    let (motif_tfs, motif_genes) = match motif.as_ref() {
        Some(m) => (m.sources(), m.targets()),
        None => (vec![], vec![]),
    };

    let expression_genes: Vec<Box<str>> = match expression.as_ref() {
        Some(expr) => expr.genes.clone(),
        None => {
            info!(
                "No expression data given: correlation matrix will be an identity matrix of size {}",
                motif_genes.len()
            );
            motif_genes.clone()
        }
    };

    if expression_genes.len() != sorted_unique(expression_genes.iter()).len() {
        warn!("Duplicate gene symbols detected. Consider averaging before running PANDA");
    }

    let ppi_tfs = match ppi.as_ref() {
        Some(ppi) => {
            info!("Number of PPIs: {}", ppi.len());
            ppi.nodes()
        }
        None => {
            info!(
                "No PPI data given: ppi matrix will be an identity matrix of size {}",
                motif_tfs.len()
            );
            motif_tfs.clone()
        }
    };

    let (genes, tfs) = match config.mode {
        AlignmentMode::Legacy => {
            let tfs = if motif.is_some() { motif_tfs } else { ppi_tfs };
            (expression_genes.clone(), tfs)
        }
        AlignmentMode::Union => (
            union(&motif_genes, &expression_genes),
            union(&ppi_tfs, &motif_tfs),
        ),
        AlignmentMode::Intersection => {
            if motif.is_none() {
                (sorted_unique(expression_genes.iter()), sorted_unique(ppi_tfs.iter()))
            } else {
                (
                    intersection(&motif_genes, &expression_genes),
                    intersection(&ppi_tfs, &motif_tfs),
                )
            }
        }
    };

    if genes.is_empty() {
        warn!("no genes left after {:?} alignment", config.mode);
    }
    if motif.is_some() && tfs.is_empty() {
        warn!("no TFs left after {:?} alignment", config.mode);
    }

    info!("{} genes, {} TFs", genes.len(), tfs.len());

    let gene2idx = LabelIndex::new(&genes, policy);
    let tf2idx = LabelIndex::new(&tfs, policy);
    let ngenes = genes.len();

    ////////////////////////////////
    // expression and co-expression //
    ////////////////////////////////

    let samples = expression
        .as_ref()
        .map(|e| e.samples.clone())
        .unwrap_or_default();

    let expression = match expression {
        Some(expr) if config.mode == AlignmentMode::Legacy => Some(expr.data),
        Some(expr) => {
            let mut aligned = Array2::<f64>::zeros((ngenes, expr.num_samples()));
            let mut nskipped = 0;
            for (r, g) in expr.genes.iter().enumerate() {
                match gene2idx.get(g) {
                    Some(i) => aligned.row_mut(i).assign(&expr.data.row(r)),
                    None => nskipped += 1,
                }
            }
            warn_unmatched("expression rows", nskipped, policy);
            Some(aligned)
        }
        None => None,
    };

    info!("Calculating coexpression network ...");
    let correlation = match expression.as_ref() {
        Some(expr) => coexpression(expr),
        None => Array2::eye(ngenes),
    };

    let Some(motif) = motif else {
        info!("No motif prior: the coexpression matrix is the final network");
        return Ok(AlignedData {
            genes,
            tfs,
            samples,
            expression,
            correlation,
            motif: None,
            ppi: None,
        });
    };

    ////////////////////
    // motif and PPI //
    ////////////////////

    info!("Creating motif network ...");
    let mut motif_mat = Array2::<f64>::zeros((tfs.len(), ngenes));
    let mut nskipped = 0;
    for (tf, g, w) in motif.edges.iter() {
        match (tf2idx.get(tf), gene2idx.get(g)) {
            (Some(i), Some(j)) => motif_mat[(i, j)] = *w,
            _ => nskipped += 1,
        }
    }
    warn_unmatched("motif edges", nskipped, policy);

    let mut ppi_mat = Array2::<f64>::eye(tfs.len());
    if let Some(ppi) = ppi {
        info!("Creating PPI network ...");
        let mut nskipped = 0;
        for (a, b, w) in ppi.edges.iter() {
            match (tf2idx.get(a), tf2idx.get(b)) {
                (Some(i), Some(j)) => {
                    ppi_mat[(i, j)] = *w;
                    ppi_mat[(j, i)] = *w;
                }
                _ => nskipped += 1,
            }
        }
        warn_unmatched("PPI edges", nskipped, policy);
    }

    Ok(AlignedData {
        genes,
        tfs,
        samples,
        expression,
        correlation,
        motif: Some(motif_mat),
        ppi: Some(ppi_mat),
    })
}

/// Pearson correlation between genes; genes without variation get
/// 1 on the diagonal and 0 elsewhere
pub fn coexpression(expression: &Array2<f64>) -> Array2<f64> {
    let mut corr = expression.row_correlation();
    if corr.has_nan() {
        warn!("NaN in the coexpression matrix (constant genes?); replaced by 0 and 1 on the diagonal");
        corr.diag_mut().fill(1.0);
        corr.mapv_inplace(|x| if x.is_nan() { 0.0 } else { x });
    }
    corr
}
