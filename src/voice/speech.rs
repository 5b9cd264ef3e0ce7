// 🔊 Text-to-speech - the Google Translate TTS endpoint, one request per chunk

use crate::config::VoiceSettings;
use crate::error::{AdvisorError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The endpoint rejects longer texts
pub const MAX_CHUNK_CHARS: usize = 100;

pub trait SpeechSynthesizer {
    /// Write spoken `text` to `output_file` and return its path
    fn synthesize(&self, text: &str, output_file: &Path) -> Result<PathBuf>;
}

pub struct GoogleTts {
    http: reqwest::blocking::Client,
    endpoint: String,
    language: String,
    slow: bool,
}

impl GoogleTts {
    pub fn new(settings: &VoiceSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(GoogleTts {
            http,
            endpoint: settings.tts_endpoint.clone(),
            language: settings.language.clone(),
            slow: settings.slow,
        })
    }

    fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let speed = if self.slow { "0.3" } else { "1" };
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", speed),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(AdvisorError::Speech(format!(
                "chunk {} returned {}",
                idx,
                resp.status()
            )));
        }
        Ok(resp.bytes()?.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str, output_file: &Path) -> Result<PathBuf> {
        let preview: String = text.chars().take(100).collect();
        info!("Converting text to speech: {}", preview);

        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AdvisorError::Speech("nothing to speak".to_string()));
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(idx, chars = chunk.len(), "Fetching speech chunk");
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len())?);
        }

        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_file, &audio)?;
        info!("Audio file saved: {}", output_file.display());
        Ok(output_file.to_path_buf())
    }
}

// ============================================================================
// CHUNKING
// ============================================================================

fn is_break(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?')
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Cuts fall after whitespace or punctuation; a word is only split when it
/// alone is longer than `max_chars`. Chunks are trimmed and always hold
/// something speakable; punctuation cut off on its own is dropped.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => byte_idx,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let next_is_break = rest[limit..].chars().next().map(char::is_whitespace).unwrap_or(true);
        let cut = if next_is_break {
            limit
        } else {
            rest[..limit]
                .char_indices()
                .rev()
                .find(|(_, c)| is_break(*c))
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(limit)
        };

        let chunk = rest[..cut].trim();
        if chunk.chars().any(char::is_alphanumeric) {
            chunks.push(chunk.to_string());
        } else if let Some(last) = chunks.last_mut() {
            // Stray punctuation joins the previous chunk when it fits
            if last.chars().count() + chunk.chars().count() <= max_chars {
                last.push_str(chunk);
            }
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("  Hello there.  ", 100), vec!["Hello there."]);
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn test_words_are_not_split() {
        let text = "The Active Cash card earns two percent on every purchase, \
                    with no annual fee and an introductory rate for fifteen months. \
                    It suits steady everyday spending.";
        let chunks = split_text(text, 40);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40, "too long: {:?}", chunk);
            assert_eq!(chunk, chunk.trim());
        }
        let rejoined = chunks.join(" ");
        let words: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined.split_whitespace().collect::<Vec<_>>(), words);
    }

    #[test]
    fn test_punctuation_is_a_break() {
        assert_eq!(split_text("alpha,beta,gamma", 12), vec!["alpha,beta,", "gamma"]);
    }

    #[test]
    fn test_overlong_word_is_hard_split() {
        let word = "x".repeat(150);
        let chunks = split_text(&word, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 50);
    }

    #[test]
    fn test_exact_fit_before_space() {
        assert_eq!(split_text("abcd efgh", 4), vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_punctuation_never_stands_alone() {
        assert_eq!(split_text("abcd, efgh", 4), vec!["abcd", "efgh"]);
        assert_eq!(split_text("abcd, efgh", 5), vec!["abcd,", "efgh"]);
        assert_eq!(split_text("abcdefgh?! ok", 4), vec!["abcd", "efgh", "ok"]);
    }

    #[test]
    fn test_multibyte_text() {
        let chunks = split_text("héllo wörld ñandú", 6);
        assert_eq!(chunks, vec!["héllo", "wörld", "ñandú"]);
    }
}
