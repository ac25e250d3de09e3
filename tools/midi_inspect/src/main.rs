use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use notation::elements::pitch_name;
use notation::MusicalElement;

/// Print the musical elements found in a MIDI file.
#[derive(Parser)]
struct Cli {
    /// MIDI file to inspect
    file: PathBuf,

    /// Maximum number of elements to print
    #[arg(short, long, default_value_t = 20)]
    limit: usize,

    /// Print the token stream instead of the raw elements
    #[arg(short, long)]
    tokens: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    println!("--- Inspecting {:?} ---", cli.file);
    let elements = notation::midi::parse_midi_file(&cli.file)?;
    println!("Found {} notes, chords and rests.", elements.len());

    if cli.tokens {
        let tokens = notation::elements::extract_tokens(&elements);
        for token in tokens.iter().take(cli.limit) {
            println!("{}", token);
        }
        return Ok(());
    }

    for element in elements.iter().take(cli.limit) {
        match element {
            MusicalElement::Note { pitch } => println!("  Note: {}", pitch_name(*pitch)),
            MusicalElement::Chord { .. } => {
                println!("  Chord: {}", element.token().unwrap_or_default())
            }
            MusicalElement::Rest => println!("  Rest"),
        }
    }

    Ok(())
}
