pub mod elements;
pub mod error;
pub mod midi;
pub mod sequence;
pub mod vocab;

pub use elements::MusicalElement;
pub use error::NotationError;
pub use vocab::{NotesData, Vocab};
