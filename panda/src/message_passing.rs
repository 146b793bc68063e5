use crate::config::PandaConfig;
use crate::similarity::{calibrate_diagonal, tanimoto};
use log::{debug, info};
use matrix_util::traits::DenseOps;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StopReason {
    #[error("iteration cap")]
    IterationCap,
    #[error("timeout")]
    Timeout,
}

/// The loop hit its iteration or wall-clock ceiling before the mean
/// absolute change dropped to the tolerance
#[derive(Debug, Clone, Error)]
#[error("PANDA did not converge: {reason} after {steps} steps (hamming: {hamming})")]
pub struct NotConverged {
    pub steps: usize,
    pub hamming: f64,
    pub reason: StopReason,
}

/// Refined matrices after the loop halted
#[derive(Debug, Clone)]
pub struct Converged<D> {
    /// TF x gene regulatory network
    pub motif: D,
    pub ppi: D,
    pub correlation: D,
    pub steps: usize,
    /// mean absolute change of the motif matrix at each step
    pub hamming: Vec<f64>,
}

/// Message passing between the motif, PPI and co-expression networks
#[derive(Debug, Clone)]
pub struct MessagePassing {
    pub alpha: f64,
    pub tolerance: f64,
    pub max_iter: usize,
    pub timeout: Option<Duration>,
}

impl From<&PandaConfig> for MessagePassing {
    fn from(config: &PandaConfig) -> Self {
        Self {
            alpha: config.alpha,
            tolerance: config.tolerance,
            max_iter: config.max_iter,
            timeout: config.timeout,
        }
    }
}

impl Default for MessagePassing {
    fn default() -> Self {
        Self::from(&PandaConfig::default())
    }
}

fn blend<D: DenseOps>(old: &D, new: &D, alpha: f64) -> anyhow::Result<D> {
    old.scale_shift(1.0 - alpha, 0.0)?
        .plus(&new.scale_shift(alpha, 0.0)?)
}

impl MessagePassing {
    /// Iterate until the mean absolute change of the motif matrix
    /// drops to the tolerance.
    ///
    /// * `motif`: TF x gene
    /// * `ppi`: TF x TF
    /// * `correlation`: gene x gene
    ///
    /// Returns [`NotConverged`] wrapped in `anyhow::Error` once
    /// `max_iter` steps or the timeout pass.
    pub fn run<D: DenseOps>(&self, motif: D, ppi: D, correlation: D) -> anyhow::Result<Converged<D>> {
        let (ntf, ngene) = motif.shape2()?;
        if ppi.shape2()? != (ntf, ntf) || correlation.shape2()? != (ngene, ngene) {
            anyhow::bail!(
                "incompatible shapes: motif {:?}, ppi {:?}, correlation {:?}",
                (ntf, ngene),
                ppi.shape2()?,
                correlation.shape2()?
            );
        }

        let alpha = self.alpha;
        let (mut motif, mut ppi, mut correlation) = (motif, ppi, correlation);
        let mut trace = vec![];
        let mut hamming = f64::INFINITY;
        let mut step = 0;

        info!("Computing network ...");
        let start = Instant::now();

        while hamming > self.tolerance {
            // consensus of the PPI and co-expression views
            let w = tanimoto(&ppi, Some(&motif))?
                .plus(&tanimoto(&motif, Some(&correlation))?)?
                .scale_shift(0.5, 0.0)?;

            hamming = motif.minus(&w)?.elem_abs()?.grand_mean()?;

            if !hamming.is_finite() {
                anyhow::bail!("non-finite change {} at step {}", hamming, step);
            }

            motif = blend(&motif, &w, alpha)?;

            if hamming > self.tolerance {
                let tf_sim = calibrate_diagonal(&tanimoto(&motif, None)?, alpha, step)?;
                ppi = blend(&ppi, &tf_sim, alpha)?;

                let gene_sim =
                    calibrate_diagonal(&tanimoto(&motif.transposed()?, None)?, alpha, step)?;
                correlation = blend(&correlation, &gene_sim, alpha)?;
            }

            debug!("step: {}, hamming: {}", step, hamming);
            trace.push(hamming);
            step += 1;

            if hamming > self.tolerance {
                let reason = if step >= self.max_iter {
                    Some(StopReason::IterationCap)
                } else if self.timeout.is_some_and(|t| start.elapsed() > t) {
                    Some(StopReason::Timeout)
                } else {
                    None
                };

                if let Some(reason) = reason {
                    return Err(NotConverged {
                        steps: step,
                        hamming,
                        reason,
                    }
                    .into());
                }
            }
        }

        info!(
            "Running PANDA took {:.2} seconds ({} steps)",
            start.elapsed().as_secs_f64(),
            step
        );

        Ok(Converged {
            motif,
            ppi,
            correlation,
            steps: step,
            hamming: trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn iteration_cap_is_an_error() {
        let motif = Array2::<f64>::from_shape_fn((3, 4), |(i, j)| ((i + 2 * j) % 3) as f64 - 1.0);
        let ppi = Array2::<f64>::eye(3);
        let corr = Array2::<f64>::eye(4);

        let mp = MessagePassing {
            max_iter: 2,
            ..Default::default()
        };

        let err = mp.run(motif, ppi, corr).unwrap_err();
        let nc = err.downcast_ref::<NotConverged>().expect("NotConverged");
        assert_eq!(nc.steps, 2);
        assert_eq!(nc.reason, StopReason::IterationCap);
        assert!(nc.hamming.is_finite());
    }

    #[test]
    fn not_converged_message() {
        let nc = NotConverged {
            steps: 7,
            hamming: 0.5,
            reason: StopReason::Timeout,
        };
        assert_eq!(
            nc.to_string(),
            "PANDA did not converge: timeout after 7 steps (hamming: 0.5)"
        );
        let err: anyhow::Error = nc.into();
        assert!(err.downcast_ref::<NotConverged>().is_some());
    }

    #[test]
    fn shape_mismatch() {
        let mp = MessagePassing::default();
        let res = mp.run(
            Array2::<f64>::ones((2, 3)),
            Array2::<f64>::eye(3),
            Array2::<f64>::eye(3),
        );
        assert!(res.is_err());
    }

    #[test]
    fn zero_timeout() {
        let motif = Array2::<f64>::from_shape_fn((2, 3), |(i, j)| (i * 3 + j) as f64 - 2.5);
        let mp = MessagePassing {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        match mp.run(motif, Array2::eye(2), Array2::eye(3)) {
            Ok(res) => assert!(res.steps >= 1),
            Err(err) => {
                let nc = err.downcast_ref::<NotConverged>().expect("NotConverged");
                assert_eq!(nc.reason, StopReason::Timeout);
                assert!(nc.steps >= 1);
            }
        }
    }
}
