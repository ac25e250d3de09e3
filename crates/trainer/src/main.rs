use anyhow::Result;
use std::fs;
use std::path::Path;
use tch::Device;

use muse_core::ModelConfig;
use notation::{elements, midi, sequence, NotesData};
use trainer::{JobStatus, JobTable, NoteDataset, Trainer, TrainerConfig};

fn main() -> Result<()> {
    env_logger::init();

    let dataset_path = "data/midi";
    let notes_path = "data/notes_data.json";

    // 1. Parse the corpus into a token stream and persist it
    println!("Parsing MIDI files in {}", dataset_path);
    let parsed = midi::parse_midi_folder(Path::new(dataset_path))?;
    let notes = elements::extract_tokens(&parsed);
    let data = NotesData::new(notes)?;
    data.save(notes_path)?;
    println!(
        "Token stream: {} tokens, vocabulary size {}",
        data.notes.len(),
        data.n_vocab
    );

    // 2. Load configs from configs/
    let model_config_path = "configs/model_config.yaml";
    let training_config_path = "configs/training_config.yaml";

    let mut model_config: ModelConfig = if Path::new(model_config_path).exists() {
        let content = fs::read_to_string(model_config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        ModelConfig::default()
    };

    let trainer_config: TrainerConfig = if Path::new(training_config_path).exists() {
        let content = fs::read_to_string(training_config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        TrainerConfig::default()
    };

    // Ensure the model matches the corpus vocabulary and window length
    model_config.n_vocab = data.n_vocab as i64;
    model_config.sequence_length = trainer_config.sequence_length as i64;

    // 3. Window the stream into training pairs
    let vocab = data.vocab();
    let (network_input, network_output) =
        sequence::prepare_sequences(&data.notes, &vocab, trainer_config.sequence_length)?;

    let device = Device::cuda_if_available();
    println!("Using device: {:?}", device);

    let dataset = NoteDataset::new(&network_input, &network_output, data.n_vocab as i64, device);

    // 4. Train under a local job record
    let job_id = "local";
    let jobs = JobTable::new();
    jobs.insert(job_id, JobStatus::Training, "Training in progress");

    let mut trainer = Trainer::new(model_config, trainer_config, device)?;
    let epochs = trainer.train(&dataset, job_id, &jobs)?;
    jobs.set(job_id, JobStatus::Complete, "Training complete");

    println!("Training complete after {} epochs!", epochs);

    Ok(())
}
