use indexmap::IndexMap;
use serde::Serialize;

use crate::parser::dialogue::DialogueGroup;

/// Characters whose vocabulary is included in a full analysis.
pub const TOP_CHARACTERS: usize = 5;
/// Words kept per character in a full analysis.
pub const TOP_WORDS: usize = 10;

/// `(key, count)` pairs, highest count first.
pub type Ranking = Vec<(String, usize)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayAnalysis {
    pub characters: Vec<String>,
    pub characters_lines: Ranking,
    pub total_characters: usize,
    pub total_lines: usize,
    pub word_analysis: IndexMap<String, Ranking>,
}

/// Distinct character names in order of first appearance. Names are compared
/// byte for byte: "HAMLET" and "Hamlet " are two characters.
pub fn roster(groups: &[DialogueGroup]) -> Vec<String> {
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for g in groups {
        seen.entry(g.character.as_str()).or_default();
    }
    seen.into_keys().map(str::to_string).collect()
}

/// Total lines per character, keyed in order of first appearance.
pub fn line_counts(groups: &[DialogueGroup]) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for g in groups {
        *counts.entry(g.character.clone()).or_insert(0) += g.lines.len();
    }
    counts
}

/// Order counts highest first.
///
/// Stable ascending sort over insertion order, then reversed: among equal
/// counts the key inserted last comes first.
pub fn rank(counts: IndexMap<String, usize>) -> Ranking {
    let mut ranked: Ranking = counts.into_iter().collect();
    ranked.sort_by_key(|(_, count)| *count);
    ranked.reverse();
    ranked
}

/// Whitespace split, lowercased. Punctuation stays attached to its word.
pub fn tokenize(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split_whitespace().map(str::to_lowercase)
}

/// Token counts across every line spoken under exactly `character`.
pub fn word_frequency(groups: &[DialogueGroup], character: &str) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for g in groups.iter().filter(|g| g.character == character) {
        for word in g.lines.iter().flat_map(|l| tokenize(l)) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    counts
}

/// Full word ranking for one character. Unknown names rank nothing.
pub fn words_by_character(groups: &[DialogueGroup], character: &str) -> Ranking {
    rank(word_frequency(groups, character))
}

pub fn analyze(groups: impl IntoIterator<Item = DialogueGroup>) -> PlayAnalysis {
    let groups: Vec<DialogueGroup> = groups.into_iter().collect();

    let characters = roster(&groups);
    let characters_lines = rank(line_counts(&groups));
    let total_lines = characters_lines.iter().map(|(_, n)| n).sum();

    let word_analysis = characters_lines
        .iter()
        .take(TOP_CHARACTERS)
        .map(|(name, _)| {
            let mut words = words_by_character(&groups, name);
            words.truncate(TOP_WORDS);
            (name.clone(), words)
        })
        .collect();

    PlayAnalysis {
        total_characters: characters.len(),
        characters,
        characters_lines,
        total_lines,
        word_analysis,
    }
}
