//! Built-in word lists.
//!
//! Hosts with their own content pass lists through [`WordBank::with_lists`].

/// Short, common words used at every level.
pub const COMMON_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old",
    "see", "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use",
    "time", "word", "that", "with", "have", "this", "will", "your", "from", "they", "know",
    "want", "been", "good", "much", "some", "very", "when", "come", "here", "just", "like",
    "long", "make", "many", "over", "such", "take", "than", "them", "well", "only", "year",
    "fast", "keys", "type", "rush", "spark", "quick", "light", "river", "stone", "green",
    "cloud", "water", "sound", "place", "small", "great", "still", "where", "after", "round",
];

/// Longer words substituted in from level 2.
pub const LONG_WORDS: &[&str] = &[
    "keyboard", "practice", "accuracy", "momentum", "velocity", "language", "rhythm",
    "distance", "mountain", "question", "remember", "together", "children", "business",
    "national", "possible", "problem", "special", "history", "morning", "picture", "thought",
    "student", "example", "between", "another", "because", "through", "important", "different",
    "sentence", "paragraph", "challenge", "precision", "character", "direction", "knowledge",
];

/// Trailing punctuation, from level 4.
pub const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Prefix/suffix symbols, from level 6.
pub const SYMBOLS: &[char] = &[
    '@', '#', '$', '%', '&', '*', '+', '=', '-', '_', '/', '~', '^', '<', '>', '(', ')', '[', ']',
];

/// Word source for prompt generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordBank {
    common: Vec<String>,
    long: Vec<String>,
}

impl Default for WordBank {
    fn default() -> Self {
        Self {
            common: COMMON_WORDS.iter().map(|w| w.to_string()).collect(),
            long: LONG_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl WordBank {
    /// Bank over caller-supplied lists.
    ///
    /// Blank entries are dropped. An empty list falls back to the built-in
    /// one so generation always has something to draw from.
    pub fn with_lists<I, J, S, T>(common: I, long: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let builtin = Self::default();

        let clean = |words: Vec<String>| -> Vec<String> {
            words
                .into_iter()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty() && !w.contains(char::is_whitespace))
                .collect()
        };

        let common = clean(common.into_iter().map(Into::into).collect());
        let long = clean(long.into_iter().map(Into::into).collect());

        Self {
            common: if common.is_empty() { builtin.common } else { common },
            long: if long.is_empty() { builtin.long } else { long },
        }
    }

    pub fn common(&self) -> &[String] {
        &self.common
    }

    pub fn long(&self) -> &[String] {
        &self.long
    }
}
