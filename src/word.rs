use std::fmt;
use std::path::Path;

use crate::error::{Result, WordloopError};
use crate::random::RandomSource;

/// Words rolled when no word list is configured
pub const BUILTIN_WORDS: &[&str] = &["apple", "banana", "cat", "dog", "elephant"];

/// A word to teach. Doubles as the file key for everything staged in a
/// workspace, so it must be safe to embed in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word(String);

impl Word {
    pub fn new<S: AsRef<str>>(raw: S) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(WordloopError::InvalidWord("word must not be empty".to_string()));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_control() || matches!(c, '/' | '\\' | ':'))
        {
            return Err(WordloopError::InvalidWord(format!(
                "'{}' contains unsupported character {:?}",
                trimmed, bad
            )));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(WordloopError::InvalidWord(format!("'{}' is not a usable file key", trimmed)));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The word escaped for use as SVG text content
    pub fn escaped(&self) -> String {
        escape_xml(&self.0)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Read a word list: one word per line, blank lines and `#` comments skipped
pub fn load_word_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WordloopError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_word_list(&content))
}

fn parse_word_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Pick a uniformly random word from `words`
pub fn roll_word<S: AsRef<str>>(words: &[S], rng: &mut RandomSource) -> Result<Word> {
    let picked = rng
        .choose(words)
        .ok_or_else(|| WordloopError::Config("word list is empty".to_string()))?;
    Word::new(picked)
}

/// Roll from the list at `word_list`, or from [`BUILTIN_WORDS`] when unset
pub fn roll_from_list(word_list: Option<&Path>, rng: &mut RandomSource) -> Result<Word> {
    match word_list {
        Some(path) => roll_word(&load_word_list(path)?, rng),
        None => roll_word(BUILTIN_WORDS, rng),
    }
}
