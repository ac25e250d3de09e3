//! Corpus -> vocabulary -> windows -> training -> checkpoint -> greedy
//! generation -> rendered MIDI, with a tiny model on CPU.

use std::path::PathBuf;
use std::sync::Arc;
use tch::Device;

use muse_core::ModelConfig;
use notation::{elements, midi, sequence, NotesData};
use trainer::{JobStatus, JobTable, NoteDataset, Trainer, TrainerConfig};

fn work_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("muse-e2e-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("midi")).unwrap();
    dir
}

fn corpus_tokens() -> Vec<String> {
    let phrase = ["C4", "C4", "D4", "E4", "4.7.11", "G4", "E4", "D4"];
    (0..5).flat_map(|_| phrase).map(str::to_string).collect()
}

#[test]
fn test_corpus_to_generated_midi() {
    let dir = work_dir();
    let job_id = "e2e";

    // Corpus: one rendered MIDI file re-parsed into a token stream.
    midi::write_midi(&corpus_tokens(), &dir.join("midi/corpus.mid")).unwrap();
    let parsed = midi::parse_midi_folder(&dir.join("midi")).unwrap();
    let notes = elements::extract_tokens(&parsed);
    assert_eq!(notes, corpus_tokens());

    let data = NotesData::new(notes).unwrap();
    data.save(dir.join("notes_data.json")).unwrap();

    // Window with a small L so the 40-token stream yields plenty of pairs.
    let sequence_length = 5;
    let vocab = data.vocab();
    let (input, output) =
        sequence::prepare_sequences(&data.notes, &vocab, sequence_length).unwrap();
    assert_eq!(input.len(), data.notes.len() - sequence_length);

    let model_config = ModelConfig {
        n_vocab: data.n_vocab as i64,
        sequence_length: sequence_length as i64,
        lstm_units: [8, 8, 8],
        dense_units: 8,
        dropout: 0.0,
    };
    let trainer_config = TrainerConfig {
        epochs: 2,
        batch_size: 8,
        sequence_length,
        checkpoint_dir: dir.to_string_lossy().into_owned(),
        ..TrainerConfig::default()
    };

    let dataset = NoteDataset::new(&input, &output, data.n_vocab as i64, Device::Cpu);

    let jobs = JobTable::new();
    jobs.insert(job_id, JobStatus::Training, "Training in progress");
    let mut trainer = Trainer::new(model_config, trainer_config, Device::Cpu).unwrap();
    let epochs = trainer.train(&dataset, job_id, &jobs).unwrap();
    jobs.set(job_id, JobStatus::Complete, "Training complete");

    assert_eq!(epochs, 2);
    assert_eq!(jobs.get(job_id).unwrap().status, JobStatus::Complete);

    // Reload the checkpointed model and decode greedily from the stream.
    let reloaded = NotesData::load(dir.join("notes_data.json")).unwrap();
    let model = inference::load_model(&dir, job_id, Device::Cpu).unwrap();
    let generator = inference::Generator::new(Arc::new(model), Device::Cpu);
    let tokens = generator
        .generate_from(&reloaded.notes, &reloaded.vocab(), 12, 0)
        .unwrap();
    assert_eq!(tokens.len(), 12);

    // Rendered output places token k at 0.5 quarter-note units, 240 ticks.
    let bytes = midi::render_tokens(&tokens).unwrap();
    let rendered = midi::parse_midi(&bytes).unwrap();
    let rendered_tokens = elements::extract_tokens(&rendered);
    assert_eq!(rendered_tokens, tokens);

    std::fs::remove_dir_all(&dir).ok();
}
