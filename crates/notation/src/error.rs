use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error("corpus produced no note or chord tokens")]
    EmptyCorpus,

    #[error("token stream of length {len} is too short for window length {window}")]
    StreamTooShort { len: usize, window: usize },

    #[error("token not in vocabulary: {0}")]
    UnknownToken(String),

    #[error("unparseable pitch token: {0}")]
    BadPitch(String),
}

pub type Result<T> = std::result::Result<T, NotationError>;
