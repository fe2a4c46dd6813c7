//! Sentence segmentation for policy text.
//!
//! Splits raw text into classification units in two passes: first after
//! sentence-terminal punctuation followed by whitespace, then on newline
//! and semicolon runs within each piece. Policy documents are full of
//! list-style clauses separated only by semicolons or line breaks, which
//! is why punctuation alone is not enough.

/// Split policy text into trimmed, non-empty classification units.
///
/// # Algorithm
///
/// 1. Cut after a `.`, `!` or `?` that is directly followed by whitespace;
///    the whitespace run is consumed as the separator.
/// 2. Cut each resulting piece on newline and semicolon runs.
/// 3. Trim every unit and drop the empty ones at both stages.
///
/// If both passes produce nothing but the trimmed input is non-empty, the
/// whole trimmed input is returned as a single unit. Empty or
/// whitespace-only input yields an empty sequence. Pure function; unit
/// order follows text order.
pub fn segment(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    for piece in split_after_terminators(text) {
        for part in piece.split(['\n', ';']) {
            let part = part.trim();
            if !part.is_empty() {
                units.push(part.to_string());
            }
        }
    }

    if units.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            units.push(trimmed.to_string());
        }
    }
    units
}

/// Split into pieces at whitespace runs that directly follow `.`, `!` or `?`.
///
/// The punctuation stays with the preceding piece; the separator run is
/// dropped. Whitespace is Unicode whitespace, so a no-break space after a
/// period separates sentences too. "2.0" does not split (no whitespace
/// after the dot), "Wait... what?" splits once after the ellipsis.
fn split_after_terminators(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut prev = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = c.is_whitespace() && i > start && matches!(prev, Some('.' | '!' | '?'));
        if boundary {
            pieces.push(&text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_whitespace() {
                    break;
                }
                end = j + d.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
        } else {
            prev = Some(c);
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
