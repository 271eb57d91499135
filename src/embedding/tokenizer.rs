//! Tokenizer and fixed vocabulary.
//!
//! Tokenization is lossy and deterministic: lower-case, every
//! non-alphanumeric character becomes whitespace, split, drop empties.
//! The vocabulary is built once and never grows.

use std::collections::HashMap;

use crate::risk::{BUSINESS_TERMS, SECURITY_TERMS};

/// Padding id. Also the row used for inputs with no real tokens.
pub const PAD_ID: u32 = 0;
/// Id of every out-of-vocabulary token.
pub const UNK_ID: u32 = 1;

const PAD_TOKEN: &str = "<pad>";
const UNK_TOKEN: &str = "<unk>";

/// Keywords across the languages the parser stage supports.
pub const LANGUAGE_KEYWORDS: &[&str] = &[
    "abstract", "async", "await", "break", "case", "catch", "class", "const", "constructor",
    "continue", "def", "default", "delete", "do", "else", "enum", "export", "extends", "false",
    "final", "finally", "fn", "for", "from", "func", "function", "if", "impl", "implements",
    "import", "in", "instanceof", "interface", "let", "match", "mod", "module", "mut", "new",
    "null", "package", "private", "protected", "pub", "public", "return", "self", "static",
    "struct", "super", "switch", "this", "throw", "trait", "true", "try", "type", "typeof",
    "undefined", "use", "var", "void", "while", "yield",
];

/// Split text into lower-case alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut normalized = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            normalized.extend(c.to_lowercase());
        } else {
            normalized.push(' ');
        }
    }
    normalized
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Token to id table. Ids 0 and 1 are reserved for `<pad>` and `<unk>`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Vocabulary {
    /// Language keywords, security terms and business-domain terms.
    pub fn builtin() -> Self {
        Self::from_terms(
            LANGUAGE_KEYWORDS
                .iter()
                .chain(SECURITY_TERMS)
                .chain(BUSINESS_TERMS)
                .copied(),
        )
    }

    /// Build from arbitrary terms. Terms are lower-cased, sorted and deduplicated
    /// so the same term set always yields the same ids.
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let mut words: Vec<String> = terms
            .into_iter()
            .flat_map(tokenize)
            .filter(|t| t != PAD_TOKEN && t != UNK_TOKEN)
            .collect();
        words.sort();
        words.dedup();

        let mut all = vec![PAD_TOKEN.to_string(), UNK_TOKEN.to_string()];
        all.extend(words);
        let ids = all
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self { terms: all, ids }
    }

    /// Number of ids including the reserved ones.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.len() <= 2
    }

    pub fn id(&self, token: &str) -> u32 {
        self.ids.get(token).copied().unwrap_or(UNK_ID)
    }

    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    /// Tokenize, map to ids, then right-pad with [`PAD_ID`] or truncate to `max_len`.
    pub fn encode(&self, text: &str, max_len: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = tokenize(text)
            .iter()
            .take(max_len)
            .map(|t| self.id(t))
            .collect();
        ids.resize(max_len, PAD_ID);
        ids
    }

    /// Space-joined terms for the non-padding ids.
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter(|&&id| id != PAD_ID)
            .map(|&id| self.term(id).unwrap_or(UNK_TOKEN))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
