//! Keyword presence check over the raw source text.

use super::lexer::Keyword;

/// Section keywords that never occur as a free-standing word in `source`.
///
/// A free-standing occurrence is bounded on both sides by whitespace or the
/// start/end of the text, so `DEVICESX` or `G1;END` do not count.
pub fn missing_keywords(source: &str) -> Vec<Keyword> {
    Keyword::ALL
        .into_iter()
        .filter(|keyword| !occurs_free_standing(source, keyword.as_str()))
        .collect()
}

fn occurs_free_standing(source: &str, word: &str) -> bool {
    source.match_indices(word).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + word.len()..].chars().next();
        before.map_or(true, char::is_whitespace) && after.map_or(true, char::is_whitespace)
    })
}
