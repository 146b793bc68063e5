use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

/// Define a Delimiter enum to handle both &str and `Vec<char>`
pub enum Delimiter {
    Str(String),
    Chars(Vec<char>),
    Whitespace,
}

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter::Str(s.to_string())
    }
}

impl From<Vec<char>> for Delimiter {
    fn from(chars: Vec<char>) -> Self {
        Delimiter::Chars(chars)
    }
}

impl<const N: usize> From<&[char; N]> for Delimiter {
    fn from(chars: &[char; N]) -> Self {
        Delimiter::Chars(chars.to_vec())
    }
}

impl Delimiter {
    /// Split a line into words. Tabs and spaces are treated alike by
    /// `Whitespace`; other delimiters keep empty fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Str(s) => line.split(s.as_str()).collect(),
            Delimiter::Chars(chars) => line.split(chars.as_slice()).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines(lines: &[Box<str>], output_file_path: &str) -> anyhow::Result<()> {
    write_types(lines, output_file_path)
}

///
/// Write every displayable item as one line of the output_file
///
pub fn write_types<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

pub struct ReadLinesOut {
    pub lines: Vec<Vec<Box<str>>>,
    pub header: Vec<Box<str>>,
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('%')
}

///
/// Read lines of words from a (possibly gzipped) file. Empty lines
/// and comment lines (`#`, `%`) are skipped.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `hdr_line` - location of a header line (`None` = no header line)
///
pub fn read_lines_of_words_delim(
    input_file: &str,
    delim: impl Into<Delimiter>,
    hdr_line: Option<usize>,
) -> anyhow::Result<ReadLinesOut> {
    let delim: Delimiter = delim.into();
    let buf_reader: Box<dyn BufRead> = open_buf_reader(input_file)?;

    let mut lines_raw: Vec<Box<str>> = vec![];
    for line in buf_reader.lines() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || is_comment_line(line) {
            continue;
        }
        lines_raw.push(line.to_string().into_boxed_str());
    }

    let to_words = |s: &str| -> Vec<Box<str>> {
        delim
            .split(s)
            .into_iter()
            .map(|w| w.trim().to_string().into_boxed_str())
            .collect()
    };

    let (header, body) = match hdr_line {
        Some(n_skip) => {
            if lines_raw.len() < n_skip + 1 {
                return Err(anyhow::anyhow!("not enough data in {}", input_file));
            }
            (to_words(&lines_raw[n_skip]), &lines_raw[(n_skip + 1)..])
        }
        None => (vec![], &lines_raw[..]),
    };

    // Splitting takes more time, so split them into parallel jobs
    let lines: Vec<Vec<Box<str>>> = body.par_iter().map(|s| to_words(s)).collect();

    Ok(ReadLinesOut { lines, header })
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;
    match extension(input_file).as_deref() {
        Ok("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn std::io::Write>> {
    // we can simply override with stdout
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let file = File::create(output_file)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file, e))?;
    match extension(output_file).as_deref() {
        Ok("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create a parent directory if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    if let Some(dir) = Path::new(file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

///
/// Take the extension of a file
/// * `file` - file name
///
pub fn extension(file: &str) -> anyhow::Result<Box<str>> {
    Path::new(file)
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_string().into_boxed_str())
        .ok_or(anyhow::anyhow!("failed to extract extension: {}", file))
}

///
/// The extension that decides the format, looking through a `.gz`
/// suffix, e.g., `out.tsv.gz` gives `tsv`
///
pub fn format_extension(file: &str) -> anyhow::Result<Box<str>> {
    let stem = file.strip_suffix(".gz").unwrap_or(file);
    extension(stem)
}

///
/// Create a temporary directory and suggest a file name
/// * `suffix` - suffix of the file name
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}
