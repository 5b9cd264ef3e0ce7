// Voice layer: speech-to-text, text-to-speech and the query front end

pub mod processor;
pub mod speech;
pub mod transcriber;

pub use processor::VoiceProcessor;
pub use speech::{GoogleTts, SpeechSynthesizer};
pub use transcriber::{Transcriber, WhisperServerTranscriber};
