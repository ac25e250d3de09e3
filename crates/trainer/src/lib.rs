pub mod dataset;
pub mod job;
pub mod train;

pub use dataset::NoteDataset;
pub use job::{JobRecord, JobStatus, JobTable, StopOutcome};
pub use train::Trainer;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub sequence_length: usize,
    pub epochs: usize,
    pub checkpoint_dir: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            batch_size: 64,
            sequence_length: notation::sequence::SEQUENCE_LENGTH,
            epochs: 50,
            checkpoint_dir: "./checkpoints".to_string(),
        }
    }
}
