//! Seeded Prompt Generation
//!
//! Builds round prompts from a [`WordBank`]. Transformations unlock
//! cumulatively by difficulty level:
//!
//! | Level | Adds                          |
//! |-------|-------------------------------|
//! | 1     | common words                  |
//! | 2     | long-word substitution        |
//! | 3     | capitalization                |
//! | 4     | trailing punctuation          |
//! | 5     | numerals                      |
//! | 6     | symbol prefix / suffix        |
//!
//! Every random choice is drawn from the caller's [`SeededRng`], in a fixed
//! order, so a seed always yields the same prompt sequence.

use crate::core::rng::SeededRng;
use crate::game::config::PromptConfig;
use crate::game::words::{WordBank, PUNCTUATION, SYMBOLS};

/// Chance of swapping in a long word (level 2+).
pub const LONG_WORD_CHANCE: f64 = 0.3;
/// Chance of capitalizing a word (level 3+).
pub const CAPITALIZE_CHANCE: f64 = 0.25;
/// Chance of trailing punctuation (level 4+).
pub const PUNCTUATION_CHANCE: f64 = 0.2;
/// Chance of replacing a word with a number (level 5+).
pub const NUMERAL_CHANCE: f64 = 0.15;
/// Chance of a symbol prefix or suffix (level 6+).
pub const SYMBOL_CHANCE: f64 = 0.12;

/// Upper bound on words drawn per prompt.
const MAX_WORD_DRAWS: usize = 64;

/// Source of round prompts.
///
/// The engine calls this once per round. Implementations must draw any
/// randomness from `rng` to keep runs replayable.
pub trait PromptSource {
    fn next_prompt(&mut self, level: u8, rng: &mut SeededRng) -> String;
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Default prompt source over a word bank.
#[derive(Clone, Debug, Default)]
pub struct PromptGenerator {
    bank: WordBank,
    config: PromptConfig,
}

impl PromptGenerator {
    pub fn new(bank: WordBank, config: PromptConfig) -> Self {
        Self { bank, config }
    }

    pub fn with_config(config: PromptConfig) -> Self {
        Self::new(WordBank::default(), config)
    }
}

impl PromptSource for PromptGenerator {
    fn next_prompt(&mut self, level: u8, rng: &mut SeededRng) -> String {
        generate_prompt(rng, level, &self.bank, &self.config)
    }
}

/// Generate one prompt.
///
/// Draws a target length in `[min_chars, max_chars]` and appends words until
/// the target is reached. A word that would push the prompt past `max_chars`
/// ends generation once at least one word is present.
pub fn generate_prompt(
    rng: &mut SeededRng,
    level: u8,
    bank: &WordBank,
    config: &PromptConfig,
) -> String {
    let max_chars = config.max_chars.max(1) as usize;
    let min_chars = (config.min_chars as usize).min(max_chars);
    let target = rng.next_range(min_chars as u32, max_chars as u32) as usize;

    let mut prompt = String::new();
    let mut len = 0usize;
    let mut words = 0usize;

    for _ in 0..MAX_WORD_DRAWS {
        let word = draw_word(rng, level, bank);
        let word_len = word.chars().count();
        let next_len = if words == 0 { word_len } else { len + 1 + word_len };

        if words > 0 && next_len > max_chars {
            break;
        }

        if words > 0 {
            prompt.push(' ');
        }
        prompt.push_str(&word);
        len = next_len;
        words += 1;

        if len >= target {
            break;
        }
    }

    prompt
}

/// Draw one word and apply the level's transformations.
fn draw_word(rng: &mut SeededRng, level: u8, bank: &WordBank) -> String {
    let use_long = level >= 2 && rng.chance(LONG_WORD_CHANCE);
    let list = if use_long { bank.long() } else { bank.common() };
    let mut word = rng
        .choose(list)
        .cloned()
        .unwrap_or_else(|| "type".to_string());

    if level >= 3 && rng.chance(CAPITALIZE_CHANCE) {
        word = capitalize(&word);
    }

    if level >= 5 && rng.chance(NUMERAL_CHANCE) {
        word = rng.next_range(1, 9_999).to_string();
    }

    if level >= 4 && rng.chance(PUNCTUATION_CHANCE) {
        if let Some(p) = rng.choose(PUNCTUATION) {
            word.push(*p);
        }
    }

    if level >= 6 && rng.chance(SYMBOL_CHANCE) {
        let prefix = rng.chance(0.5);
        if let Some(s) = rng.choose(SYMBOLS) {
            if prefix {
                word.insert(0, *s);
            } else {
                word.push(*s);
            }
        }
    }

    word
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// SCRIPTED PROMPTS
// =============================================================================

/// Fixed prompt sequence, cycled. Consumes no randomness.
#[derive(Clone, Debug)]
pub struct ScriptedPrompts {
    prompts: Vec<String>,
    next: usize,
}

impl ScriptedPrompts {
    /// Empty input falls back to a single `"type"` prompt.
    pub fn new<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prompts: Vec<String> = prompts
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        if prompts.is_empty() {
            prompts.push("type".to_string());
        }
        Self { prompts, next: 0 }
    }
}

impl PromptSource for ScriptedPrompts {
    fn next_prompt(&mut self, _level: u8, _rng: &mut SeededRng) -> String {
        let prompt = self.prompts[self.next % self.prompts.len()].clone();
        self.next += 1;
        prompt
    }
}

// =============================================================================
// TESTS
// =============================================================================
