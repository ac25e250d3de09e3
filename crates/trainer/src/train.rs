use anyhow::Result;
use std::path::PathBuf;
use tch::{nn, nn::OptimizerConfig, Device};

use muse_core::{checkpoint, ModelConfig, MuseLstm};

use crate::dataset::NoteDataset;
use crate::job::JobTable;
use crate::TrainerConfig;

/// Drives the model through the configured epoch budget for one job.
///
/// Checkpoints are best-loss-wins: weights are persisted after any epoch
/// whose mean loss improves on the best seen for this job, overwriting the
/// previous file. A stop request is honored at the next epoch boundary,
/// never mid-epoch; terminal job status is the caller's decision.
pub struct Trainer {
    config: TrainerConfig,
    model: MuseLstm,
    optimizer: nn::Optimizer,
    vs: nn::VarStore,
}

impl Trainer {
    pub fn new(
        model_config: ModelConfig,
        trainer_config: TrainerConfig,
        device: Device,
    ) -> Result<Self> {
        let vs = nn::VarStore::new(device);
        let model = MuseLstm::new(&vs.root(), &model_config);
        let optimizer = nn::RmsProp::default().build(&vs, trainer_config.learning_rate)?;

        Ok(Self {
            config: trainer_config,
            model,
            optimizer,
            vs,
        })
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model.config
    }

    /// Runs the training loop. Returns the number of epochs completed,
    /// which is below the budget only when a stop request cut it short.
    pub fn train(&mut self, dataset: &NoteDataset, job_id: &str, jobs: &JobTable) -> Result<usize> {
        let batch_size = self.config.batch_size as i64;
        let num_batches = dataset.num_batches(batch_size);
        let checkpoint_dir = PathBuf::from(&self.config.checkpoint_dir);

        checkpoint::save_config(&self.model.config, &checkpoint_dir, job_id)?;

        log::info!(
            "Starting training for job {}: {} pairs, {} batches/epoch, {} epochs",
            job_id,
            dataset.len(),
            num_batches,
            self.config.epochs
        );

        let mut best_loss = f64::INFINITY;
        let mut epochs_run = 0;

        for epoch in 0..self.config.epochs {
            let mut epoch_loss = 0.0;

            for batch_idx in 0..num_batches {
                let (input, target) = dataset.batch(batch_idx, batch_size);
                let logits = self.model.forward(&input, true);
                let loss = logits.cross_entropy_for_logits(&target);
                self.optimizer.backward_step(&loss);
                epoch_loss += loss.double_value(&[]);
            }

            let avg_loss = epoch_loss / num_batches as f64;
            epochs_run = epoch + 1;
            log::info!(
                "Job {} | Epoch {}/{} | Loss: {:.4}",
                job_id,
                epochs_run,
                self.config.epochs,
                avg_loss
            );

            if avg_loss < best_loss {
                best_loss = avg_loss;
                checkpoint::save(&self.vs, &checkpoint_dir, job_id)?;
            }

            if jobs.stop_requested(job_id) {
                log::info!(
                    "Training for job {} stopped by user after epoch {}",
                    job_id,
                    epochs_run
                );
                break;
            }
        }

        Ok(epochs_run)
    }
}
