use crate::common_io::{read_lines_of_words_delim, write_lines, Delimiter};
use crate::traits::IoOps;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::fmt::{Debug, Display};
use std::str::FromStr;

impl<T> IoOps for Array2<T>
where
    T: FromStr + Send + Sync + Display,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let lines_of_words = read_lines_of_words_delim(file, delim, skip)?.lines;

        if lines_of_words.is_empty() {
            return Err(anyhow::anyhow!("No data in file {}", file));
        }

        let nrows = lines_of_words.len();
        let ncols = lines_of_words[0].len();

        let data = lines_of_words
            .par_iter()
            .enumerate()
            .map(|(i, words)| {
                if words.len() != ncols {
                    return Err(anyhow::anyhow!(
                        "{}: line {} has {} fields, expected {}",
                        file,
                        i + 1,
                        words.len(),
                        ncols
                    ));
                }
                words
                    .iter()
                    .map(|v| {
                        v.parse::<T>()
                            .map_err(|e| anyhow::anyhow!("{}: can't parse {}: {:?}", file, v, e))
                    })
                    .collect::<anyhow::Result<Vec<T>>>()
            })
            .collect::<anyhow::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        Ok(Array2::from_shape_vec((nrows, ncols), data)?)
    }

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()> {
        let lines: Vec<Box<str>> = self
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|x| format!("{}", *x))
                    .collect::<Vec<String>>()
                    .join(delim)
                    .into_boxed_str()
            })
            .collect();
        write_lines(&lines, file)?;
        Ok(())
    }
}
