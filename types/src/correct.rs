//! Applying suggested corrections to text.

use crate::matches::Match;

/// Apply the best replacement of each match to `text`.
///
/// Matches without replacements are discarded. The remaining matches are
/// applied in their original order in a single left-to-right pass: each
/// match's offset is recomputed from the running length delta of prior
/// replacements, and the span at the recomputed offset must still equal
/// the originally flagged text — otherwise the match is skipped. This
/// guards against overlapping or stale matches corrupting the output.
///
/// Offsets count characters, matching the server's code-point semantics.
#[must_use]
pub fn correct(text: &str, matches: &[Match]) -> String {
    let mut chars: Vec<char> = text.chars().collect();

    let applicable: Vec<&Match> = matches
        .iter()
        .filter(|m| !m.replacements.is_empty())
        .collect();
    let flagged: Vec<Vec<char>> = applicable
        .iter()
        .map(|m| clamped(&chars, m.offset, m.length).to_vec())
        .collect();

    let mut delta: isize = 0;
    for (m, original) in applicable.iter().zip(&flagged) {
        let Ok(from) = usize::try_from(m.offset as isize + delta) else {
            continue;
        };
        if clamped(&chars, from, m.length) != original.as_slice() {
            continue;
        }
        let replacement: Vec<char> = m.replacements[0].value.chars().collect();
        let to = from + original.len();
        delta += replacement.len() as isize - original.len() as isize;
        chars.splice(from..to, replacement);
    }

    chars.into_iter().collect()
}

/// Slice with saturating bounds: ranges past the end shrink to fit.
fn clamped(chars: &[char], offset: usize, length: usize) -> &[char] {
    let from = offset.min(chars.len());
    let to = offset.saturating_add(length).min(chars.len());
    &chars[from..to]
}
