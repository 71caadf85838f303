use std::collections::HashSet;
use std::path::Path;

use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::game_trait::Difficulty;

/// Every ladder word has exactly this many letters.
pub const LADDER_WORD_LEN: usize = 4;

/// Used when no ladder words are loaded.
pub const FALLBACK_LADDER_PAIR: (&str, &str) = ("WORD", "GAME");

/// Used when no hangman words are loaded for any tier.
pub const FALLBACK_WORD: &str = "PUZZLE";

/// On-disk layout of `words.json`.
#[derive(Debug, Default, Deserialize)]
struct WordFile {
    #[serde(default)]
    ladder_words: Vec<String>,
    #[serde(default)]
    hangman_words: Vec<String>,
}

/// Word lists for Word Ladder, Hangman and Anagram, upper-cased on load.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    ladder: Vec<String>,
    dictionary: HashSet<String>,
    easy: Vec<String>,
    medium: Vec<String>,
    hard: Vec<String>,
}

impl WordBank {
    pub fn from_lists<L, H, S1, S2>(ladder_words: L, hangman_words: H) -> Self
    where
        L: IntoIterator<Item = S1>,
        H: IntoIterator<Item = S2>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let mut bank = Self::default();
        for word in ladder_words {
            let word = word.as_ref().trim().to_uppercase();
            if word.chars().count() == LADDER_WORD_LEN && bank.dictionary.insert(word.clone()) {
                bank.ladder.push(word);
            }
        }
        for word in hangman_words {
            let word = word.as_ref().trim().to_uppercase();
            if word.is_empty() {
                continue;
            }
            match Difficulty::for_word_len(word.chars().count()) {
                Difficulty::Easy => bank.easy.push(word),
                Difficulty::Medium => bank.medium.push(word),
                Difficulty::Hard => bank.hard.push(word),
            }
        }
        bank
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: WordFile = serde_json::from_str(json)?;
        Ok(Self::from_lists(file.ladder_words, file.hangman_words))
    }

    /// Load the word file. A missing or malformed file yields an empty bank,
    /// so every game falls back to its built-in words.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Word file not readable");
                return Self::default();
            },
        };
        match Self::from_json(&content) {
            Ok(bank) => {
                tracing::info!(
                    path = %path.display(),
                    ladder = bank.ladder.len(),
                    hangman = bank.easy.len() + bank.medium.len() + bank.hard.len(),
                    "Loaded word lists"
                );
                bank
            },
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Word file is malformed");
                Self::default()
            },
        }
    }

    pub fn is_ladder_word(&self, word: &str) -> bool {
        self.dictionary.contains(word)
    }

    pub fn ladder_len(&self) -> usize {
        self.ladder.len()
    }

    /// Two distinct ladder words, or the fallback pair when fewer than two
    /// are loaded.
    pub fn ladder_pair(&self, rng: &mut dyn RngCore) -> (String, String) {
        let picked: Vec<&String> = self.ladder.choose_multiple(rng, 2).collect();
        match picked.as_slice() {
            [start, end] => ((*start).clone(), (*end).clone()),
            _ => (
                FALLBACK_LADDER_PAIR.0.to_string(),
                FALLBACK_LADDER_PAIR.1.to_string(),
            ),
        }
    }

    pub fn words_for(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    /// Random word for a difficulty tier. Easy and hard fall back to the
    /// medium tier when empty; medium falls back to [`FALLBACK_WORD`].
    pub fn pick_word(&self, difficulty: Difficulty, rng: &mut dyn RngCore) -> String {
        self.pick_word_where(difficulty, rng, |_| true)
    }

    /// Like [`pick_word`](Self::pick_word), restricted to words accepted by
    /// `filter`.
    pub fn pick_word_where(
        &self,
        difficulty: Difficulty,
        rng: &mut dyn RngCore,
        filter: impl Fn(&str) -> bool,
    ) -> String {
        let candidates = |tier: Difficulty| -> Vec<&String> {
            self.words_for(tier)
                .iter()
                .filter(|w| filter(w.as_str()))
                .collect()
        };

        let mut pool = candidates(difficulty);
        if pool.is_empty() && difficulty != Difficulty::Medium {
            pool = candidates(Difficulty::Medium);
        }
        pool.choose(rng)
            .map(|w| (*w).clone())
            .unwrap_or_else(|| FALLBACK_WORD.to_string())
    }
}
