use log::info;
use matrix_util::common_io::{read_lines_of_words_delim, Delimiter};
use ndarray::Array2;
use std::collections::BTreeSet;

/// Gene expression: genes (rows) x samples (columns)
#[derive(Debug, Clone)]
pub struct ExpressionTable {
    pub genes: Vec<Box<str>>,
    pub samples: Vec<Box<str>>,
    pub data: Array2<f64>,
}

impl ExpressionTable {
    pub fn new(
        genes: Vec<Box<str>>,
        samples: Vec<Box<str>>,
        data: Array2<f64>,
    ) -> anyhow::Result<Self> {
        if data.nrows() != genes.len() || data.ncols() != samples.len() {
            anyhow::bail!(
                "expression data {:?} doesn't match {} genes x {} samples",
                data.dim(),
                genes.len(),
                samples.len()
            );
        }
        Ok(Self {
            genes,
            samples,
            data,
        })
    }

    /// Read a tab/space-separated table: gene name followed by
    /// sample values on each line. With `header`, the first line
    /// names the samples (a leading corner label is ignored).
    pub fn from_file(file: &str, header: bool) -> anyhow::Result<Self> {
        let hdr_line = if header { Some(0) } else { None };
        let read = read_lines_of_words_delim(file, Delimiter::Whitespace, hdr_line)?;

        let ncols = read
            .lines
            .first()
            .map(|w| w.len().saturating_sub(1))
            .ok_or(anyhow::anyhow!("no expression data in {}", file))?;

        if ncols == 0 {
            anyhow::bail!("{}: expected a gene name followed by samples", file);
        }

        let mut genes = Vec::with_capacity(read.lines.len());
        let mut data = Vec::with_capacity(read.lines.len() * ncols);

        for (i, words) in read.lines.iter().enumerate() {
            if words.len() != ncols + 1 {
                anyhow::bail!(
                    "{}: line {} has {} samples, expected {}",
                    file,
                    i + 1,
                    words.len().saturating_sub(1),
                    ncols
                );
            }
            genes.push(words[0].clone());
            for w in &words[1..] {
                let x = w.parse::<f64>().map_err(|e| {
                    anyhow::anyhow!("{}: line {}: can't parse {}: {}", file, i + 1, w, e)
                })?;
                data.push(x);
            }
        }

        let samples: Vec<Box<str>> = match read.header.len() {
            n if n == ncols => read.header,
            n if n == ncols + 1 => read.header[1..].to_vec(),
            0 => (1..=ncols).map(|j| j.to_string().into_boxed_str()).collect(),
            n => anyhow::bail!("{}: {} header names for {} samples", file, n, ncols),
        };

        let data = Array2::from_shape_vec((genes.len(), ncols), data)?;
        info!("Read expression data {} x {} from {}", genes.len(), ncols, file);
        Self::new(genes, samples, data)
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Weighted directed pairs, e.g., TF -> gene motif hits or TF - TF
/// protein interactions
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    pub edges: Vec<(Box<str>, Box<str>, f64)>,
}

impl EdgeTable {
    pub fn new(edges: Vec<(Box<str>, Box<str>, f64)>) -> anyhow::Result<Self> {
        if let Some((s, t, w)) = edges.iter().find(|(_, _, w)| !w.is_finite()) {
            anyhow::bail!("non-finite weight {} on {} -> {}", w, s, t);
        }
        Ok(Self { edges })
    }

    /// Read three columns `source target weight`; no header line.
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let read = read_lines_of_words_delim(file, Delimiter::Whitespace, None)?;

        let edges = read
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, words)| {
                if words.len() != 3 {
                    anyhow::bail!(
                        "{}: line {} has {} columns, expected source, target, weight",
                        file,
                        i + 1,
                        words.len()
                    );
                }
                let w = words[2].parse::<f64>().map_err(|e| {
                    anyhow::anyhow!("{}: line {}: can't parse {}: {}", file, i + 1, words[2], e)
                })?;
                let mut words = words.into_iter();
                match (words.next(), words.next()) {
                    (Some(s), Some(t)) => Ok((s, t, w)),
                    _ => anyhow::bail!("{}: line {} is incomplete", file, i + 1),
                }
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        info!("Read {} edges from {}", edges.len(), file);
        Self::new(edges)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sorted unique names in the first column
    pub fn sources(&self) -> Vec<Box<str>> {
        sorted_unique(self.edges.iter().map(|(s, _, _)| s))
    }

    /// Sorted unique names in the second column
    pub fn targets(&self) -> Vec<Box<str>> {
        sorted_unique(self.edges.iter().map(|(_, t, _)| t))
    }

    /// Sorted unique names in either column
    pub fn nodes(&self) -> Vec<Box<str>> {
        sorted_unique(self.edges.iter().flat_map(|(s, t, _)| [s, t]))
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&(Box<str>, Box<str>, f64)) -> bool,
    {
        self.edges.retain(keep);
    }
}

pub(crate) fn sorted_unique<'a, I>(names: I) -> Vec<Box<str>>
where
    I: IntoIterator<Item = &'a Box<str>>,
{
    names
        .into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(s: &str, t: &str, w: f64) -> (Box<str>, Box<str>, f64) {
        (s.into(), t.into(), w)
    }

    #[test]
    fn edge_table_names() -> anyhow::Result<()> {
        let tab = EdgeTable::new(vec![
            edge("TF2", "g3", 1.0),
            edge("TF1", "g1", 0.5),
            edge("TF2", "g1", 1.0),
        ])?;
        assert_eq!(tab.sources(), vec!["TF1".into(), "TF2".into()]);
        assert_eq!(tab.targets(), vec!["g1".into(), "g3".into()]);
        assert_eq!(tab.nodes().len(), 4);
        assert!(EdgeTable::new(vec![edge("a", "b", f64::NAN)]).is_err());
        Ok(())
    }

    #[test]
    fn expression_shape_mismatch() {
        let genes = vec!["g1".into(), "g2".into()];
        let samples = vec!["s1".into()];
        assert!(ExpressionTable::new(genes, samples, Array2::zeros((2, 3))).is_err());
    }
}
