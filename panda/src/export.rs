use log::info;
use matrix_util::common_io::{format_extension, mkdir, read_lines_of_words_delim, write_lines, Delimiter};
use matrix_util::parquet::{write_labeled_matrix_parquet, write_parquet_columns, ParquetColumn};
use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};

/// Output formats by file extension (after an optional `.gz`)
enum OutputFormat {
    Delimited(&'static str),
    Parquet,
}

impl OutputFormat {
    fn of(file: &str) -> anyhow::Result<Self> {
        match &*format_extension(file)? {
            "tsv" => Ok(Self::Delimited("\t")),
            "csv" => Ok(Self::Delimited(",")),
            "txt" => Ok(Self::Delimited(" ")),
            "parquet" if !file.ends_with(".gz") => Ok(Self::Parquet),
            ext => anyhow::bail!("unsupported output format {} for {}", ext, file),
        }
    }
}

/// Dense TF x gene network with its labels
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub data: Array2<f64>,
}

/// Melted network, one row per (TF, gene) pair
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    pub tf: Vec<Box<str>>,
    pub gene: Vec<Box<str>>,
    /// prior weight before normalization, if there was a motif prior
    pub motif: Option<Vec<f64>>,
    pub force: Vec<f64>,
}

/// Result of a PANDA run
#[derive(Debug, Clone)]
pub enum PandaNetwork {
    Dense(LabeledMatrix),
    Edges(EdgeList),
}

impl LabeledMatrix {
    pub fn new(rows: Vec<Box<str>>, cols: Vec<Box<str>>, data: Array2<f64>) -> anyhow::Result<Self> {
        if data.dim() != (rows.len(), cols.len()) {
            anyhow::bail!(
                "{:?} matrix with {} row and {} column names",
                data.dim(),
                rows.len(),
                cols.len()
            );
        }
        Ok(Self { rows, cols, data })
    }

    /// Column-major flattening: all rows (TFs) of the first column
    /// (gene), then all rows of the second column, and so on
    ///
    /// * `motif`: prior weights of the same shape to carry along
    ///
    pub fn melt(&self, motif: Option<&Array2<f64>>) -> anyhow::Result<EdgeList> {
        let (nr, nc) = self.data.dim();

        if let Some(m) = motif {
            if m.dim() != (nr, nc) {
                anyhow::bail!("{:?} motif for a {:?} network", m.dim(), (nr, nc));
            }
        }

        let column_major = |x: &Array2<f64>| -> Vec<f64> { x.t().iter().copied().collect() };

        let tf = (0..nc)
            .flat_map(|_| self.rows.iter().cloned())
            .collect();
        let gene = self
            .cols
            .iter()
            .flat_map(|g| std::iter::repeat_n(g.clone(), nr))
            .collect();

        Ok(EdgeList {
            tf,
            gene,
            motif: motif.map(column_major),
            force: column_major(&self.data),
        })
    }

    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        match OutputFormat::of(file)? {
            OutputFormat::Parquet => {
                write_labeled_matrix_parquet(file, &self.data, &self.rows, &self.cols, "tf")?
            }
            OutputFormat::Delimited(delim) => {
                let mut lines = Vec::with_capacity(self.rows.len() + 1);
                let header: Vec<&str> = std::iter::once("tf")
                    .chain(self.cols.iter().map(|x| &**x))
                    .collect();
                lines.push(header.join(delim).into_boxed_str());

                for (name, row) in self.rows.iter().zip(self.data.rows()) {
                    let words: Vec<String> = std::iter::once(name.to_string())
                        .chain(row.iter().map(|x| x.to_string()))
                        .collect();
                    lines.push(words.join(delim).into_boxed_str());
                }
                write_lines(&lines, file)?;
            }
        }
        info!("Wrote a {} x {} network to {}", self.rows.len(), self.cols.len(), file);
        Ok(())
    }
}

/// Distinct names in the order of their first appearance
fn first_appearance(names: &[Box<str>]) -> (Vec<Box<str>>, HashMap<&str, usize>) {
    let mut order = vec![];
    let mut index: HashMap<&str, usize> = HashMap::new();
    for x in names {
        if !index.contains_key(&**x) {
            index.insert(&**x, order.len());
            order.push(x.clone());
        }
    }
    (order, index)
}

fn sum_by(names: &[Box<str>], values: &[f64]) -> Vec<(Box<str>, f64)> {
    let mut acc: BTreeMap<&Box<str>, f64> = BTreeMap::new();
    for (x, v) in names.iter().zip(values) {
        *acc.entry(x).or_insert(0.0) += v;
    }
    acc.into_iter().map(|(k, v)| (k.clone(), v)).collect()
}

impl EdgeList {
    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }

    /// Inverse of [`LabeledMatrix::melt`]. Rows and columns follow
    /// the order in which TFs and genes first appear; missing pairs
    /// are zero.
    pub fn to_dense(&self) -> anyhow::Result<LabeledMatrix> {
        if self.tf.len() != self.len() || self.gene.len() != self.len() {
            anyhow::bail!("ragged edge list");
        }
        let (rows, tf_index) = first_appearance(&self.tf);
        let (cols, gene_index) = first_appearance(&self.gene);

        let mut data = Array2::<f64>::zeros((rows.len(), cols.len()));
        for ((t, g), &f) in self.tf.iter().zip(&self.gene).zip(&self.force) {
            data[(tf_index[&**t], gene_index[&**g])] = f;
        }
        LabeledMatrix::new(rows, cols, data)
    }

    /// Sum of `force` by gene, sorted by gene
    pub fn in_degree(&self) -> Vec<(Box<str>, f64)> {
        sum_by(&self.gene, &self.force)
    }

    /// Sum of `force` by TF, sorted by TF
    pub fn out_degree(&self) -> Vec<(Box<str>, f64)> {
        sum_by(&self.tf, &self.force)
    }

    /// The `k` strongest edges between distinct TF and gene names
    pub fn top_edges(&self, k: usize) -> EdgeList {
        let mut order: Vec<usize> = (0..self.len())
            .filter(|&i| self.tf[i] != self.gene[i])
            .collect();
        order.sort_by(|&i, &j| self.force[j].total_cmp(&self.force[i]));
        order.truncate(k);

        EdgeList {
            tf: order.iter().map(|&i| self.tf[i].clone()).collect(),
            gene: order.iter().map(|&i| self.gene[i].clone()).collect(),
            motif: self
                .motif
                .as_ref()
                .map(|m| order.iter().map(|&i| m[i]).collect()),
            force: order.iter().map(|&i| self.force[i]).collect(),
        }
    }

    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        match OutputFormat::of(file)? {
            OutputFormat::Parquet => {
                let mut columns = vec![
                    ("tf", ParquetColumn::Text(&self.tf)),
                    ("gene", ParquetColumn::Text(&self.gene)),
                ];
                if let Some(motif) = self.motif.as_ref() {
                    columns.push(("motif", ParquetColumn::Real(motif)));
                }
                columns.push(("force", ParquetColumn::Real(&self.force)));
                write_parquet_columns(file, &columns)?;
            }
            OutputFormat::Delimited(delim) => {
                let mut lines = Vec::with_capacity(self.len() + 1);
                let header = match self.motif {
                    Some(_) => ["tf", "gene", "motif", "force"].join(delim),
                    None => ["tf", "gene", "force"].join(delim),
                };
                lines.push(header.into_boxed_str());

                for i in 0..self.len() {
                    let line = match self.motif.as_ref() {
                        Some(m) => format!(
                            "{}{d}{}{d}{}{d}{}",
                            self.tf[i],
                            self.gene[i],
                            m[i],
                            self.force[i],
                            d = delim
                        ),
                        None => format!(
                            "{}{d}{}{d}{}",
                            self.tf[i],
                            self.gene[i],
                            self.force[i],
                            d = delim
                        ),
                    };
                    lines.push(line.into_boxed_str());
                }
                write_lines(&lines, file)?;
            }
        }
        info!("Wrote {} edges to {}", self.len(), file);
        Ok(())
    }

    /// Read back a delimited edge list with a `tf gene [motif] force`
    /// header
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let delim = match OutputFormat::of(file)? {
            OutputFormat::Delimited(",") => Delimiter::from(","),
            OutputFormat::Delimited(_) => Delimiter::Whitespace,
            OutputFormat::Parquet => anyhow::bail!("can't read parquet edges: {}", file),
        };
        let read = read_lines_of_words_delim(file, delim, Some(0))?;

        let column = |name: &str| read.header.iter().position(|h| &**h == name);
        let (tf_col, gene_col, force_col) = match (column("tf"), column("gene"), column("force")) {
            (Some(t), Some(g), Some(f)) => (t, g, f),
            _ => anyhow::bail!("{}: expected tf, gene and force columns", file),
        };
        let motif_col = column("motif");

        let parse = |i: usize, w: &str| -> anyhow::Result<f64> {
            w.parse::<f64>()
                .map_err(|e| anyhow::anyhow!("{}: line {}: can't parse {}: {}", file, i + 2, w, e))
        };

        let mut edges = EdgeList {
            motif: motif_col.map(|_| vec![]),
            ..Default::default()
        };

        for (i, words) in read.lines.iter().enumerate() {
            if words.len() != read.header.len() {
                anyhow::bail!("{}: line {} has {} columns", file, i + 2, words.len());
            }
            edges.tf.push(words[tf_col].clone());
            edges.gene.push(words[gene_col].clone());
            edges.force.push(parse(i, &words[force_col])?);
            if let (Some(m), Some(c)) = (edges.motif.as_mut(), motif_col) {
                m.push(parse(i, &words[c])?);
            }
        }
        Ok(edges)
    }
}

/// Write `name value` pairs, e.g., in- or out-degrees
pub fn write_degrees(file: &str, degrees: &[(Box<str>, f64)], name_column: &str) -> anyhow::Result<()> {
    mkdir(file)?;
    match OutputFormat::of(file)? {
        OutputFormat::Parquet => {
            let names: Vec<Box<str>> = degrees.iter().map(|(x, _)| x.clone()).collect();
            let values: Vec<f64> = degrees.iter().map(|(_, v)| *v).collect();
            write_parquet_columns(
                file,
                &[
                    (name_column, ParquetColumn::Text(&names)),
                    ("force", ParquetColumn::Real(&values)),
                ],
            )
        }
        OutputFormat::Delimited(delim) => {
            let lines: Vec<Box<str>> = std::iter::once(format!("{}{}force", name_column, delim))
                .chain(degrees.iter().map(|(x, v)| format!("{}{}{}", x, delim, v)))
                .map(|s| s.into_boxed_str())
                .collect();
            write_lines(&lines, file)
        }
    }
}

impl PandaNetwork {
    pub fn to_dense(&self) -> anyhow::Result<LabeledMatrix> {
        match self {
            PandaNetwork::Dense(m) => Ok(m.clone()),
            PandaNetwork::Edges(e) => e.to_dense(),
        }
    }

    pub fn to_edges(&self) -> anyhow::Result<EdgeList> {
        match self {
            PandaNetwork::Dense(m) => m.melt(None),
            PandaNetwork::Edges(e) => Ok(e.clone()),
        }
    }

    pub fn in_degree(&self) -> anyhow::Result<Vec<(Box<str>, f64)>> {
        match self {
            PandaNetwork::Dense(m) => Ok(m
                .cols
                .iter()
                .cloned()
                .zip(m.data.columns().into_iter().map(|c| c.sum()))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect()),
            PandaNetwork::Edges(e) => Ok(e.in_degree()),
        }
    }

    pub fn out_degree(&self) -> anyhow::Result<Vec<(Box<str>, f64)>> {
        match self {
            PandaNetwork::Dense(m) => Ok(m
                .rows
                .iter()
                .cloned()
                .zip(m.data.rows().into_iter().map(|r| r.sum()))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect()),
            PandaNetwork::Edges(e) => Ok(e.out_degree()),
        }
    }

    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        match self {
            PandaNetwork::Dense(m) => m.to_file(file),
            PandaNetwork::Edges(e) => e.to_file(file),
        }
    }
}
