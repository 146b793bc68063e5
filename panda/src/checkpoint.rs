use log::info;
use matrix_util::common_io::mkdir;
use matrix_util::traits::IoOps;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Receives intermediate matrices of a run, e.g., the aligned
/// expression and the normalized priors
pub trait CheckpointSink {
    fn save(&mut self, name: &str, mat: &Array2<f64>) -> anyhow::Result<()>;
}

/// Write each checkpoint as `<dir>/<name>.tsv.gz`
pub struct DirCheckpoint {
    dir: PathBuf,
}

impl DirCheckpoint {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.tsv.gz", name))
    }
}

impl CheckpointSink for DirCheckpoint {
    fn save(&mut self, name: &str, mat: &Array2<f64>) -> anyhow::Result<()> {
        let path = self.file_path(name);
        let file = path
            .to_str()
            .ok_or(anyhow::anyhow!("invalid checkpoint path {:?}", path))?;
        mkdir(file)?;
        mat.to_tsv(file)?;
        info!("checkpoint {} {:?} -> {}", name, mat.dim(), file);
        Ok(())
    }
}

/// Keep checkpoints in memory
#[derive(Default)]
pub struct MemoryCheckpoint {
    pub saved: Vec<(Box<str>, Array2<f64>)>,
}

impl MemoryCheckpoint {
    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        self.saved
            .iter()
            .find(|(x, _)| &**x == name)
            .map(|(_, m)| m)
    }
}

impl CheckpointSink for MemoryCheckpoint {
    fn save(&mut self, name: &str, mat: &Array2<f64>) -> anyhow::Result<()> {
        self.saved.push((name.into(), mat.clone()));
        Ok(())
    }
}
