//! Text chunking and resume-boundary search.
//!
//! Engines cap the length of a single utterance, so long bodies are cut into
//! chunks no longer than `max_chars`. Cuts prefer, in order:
//!
//! 1. the last sentence terminator (`.` `?` `!`) followed by whitespace,
//! 2. the last whitespace,
//! 3. a hard cut at exactly `max_chars`.
//!
//! Whitespace at a cut point is dropped, so the chunks reproduce the source
//! text modulo that whitespace. Each [`Chunk`] records where it starts in the
//! source, which keeps absolute positions exact regardless of trimming.
//!
//! All offsets and lengths are in `char`s.

use serde::Serialize;

/// One engine-sized piece of the body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Offset of the chunk's first character in the full text.
    pub start: usize,

    /// The chunk text (trailing cut whitespace removed).
    pub text: String,
}

impl Chunk {
    /// Length of the chunk in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset one past the chunk's last character in the full text.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Empty or whitespace-only text yields no chunks. A `max_chars` of zero is
/// treated as one.
#[must_use]
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    split_chars(&chars, 0, max_chars)
}

/// Split the suffix of `chars` starting at `from` into chunks whose `start`
/// offsets are relative to the whole of `chars`.
#[must_use]
pub fn split_chars(chars: &[char], from: usize, max_chars: usize) -> Vec<Chunk> {
    let max = max_chars.max(1);
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut pos = skip_whitespace(chars, from.min(len));

    while pos < len {
        let end = if len - pos <= max {
            len
        } else {
            // `max + 1` chars are available: the char right after the
            // candidate prefix decides whether a terminator ends a sentence.
            let window = &chars[pos..=pos + max];
            pos + sentence_cut(window, max)
                .or_else(|| whitespace_cut(window, max))
                .unwrap_or(max)
        };

        let text: String = chars[pos..end].iter().collect();
        chunks.push(Chunk {
            start: pos,
            text: text.trim_end().to_owned(),
        });

        pos = skip_whitespace(chars, end);
    }

    chunks
}

/// Find where resumed speech should start, at or before `position`.
///
/// Searches the `lookback` characters before `position` for the last sentence
/// terminator followed by whitespace and returns the offset just after that
/// whitespace. Failing that, returns the offset just after the last
/// whitespace. If neither exists within the window, `position` is returned
/// unchanged. The window is fixed; it is never widened.
#[must_use]
pub fn natural_break_before(chars: &[char], position: usize, lookback: usize) -> usize {
    if position == 0 {
        return 0;
    }
    if position >= chars.len() {
        return chars.len();
    }

    let search_start = position.saturating_sub(lookback);
    let window = &chars[search_start..position];

    let sentence_end = window
        .windows(2)
        .rposition(|pair| is_terminator(pair[0]) && pair[1].is_whitespace());
    if let Some(k) = sentence_end {
        return search_start + k + 2;
    }

    if let Some(j) = window.iter().rposition(|c| c.is_whitespace()) {
        return search_start + j + 1;
    }

    position
}

// ── Internal helpers ───────────────────────────────────────────────

const fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

/// Cut length ending right after the last terminator whose following char is
/// whitespace, keeping the chunk within `max` chars.
fn sentence_cut(window: &[char], max: usize) -> Option<usize> {
    (0..max)
        .rev()
        .find(|&i| is_terminator(window[i]) && window[i + 1].is_whitespace())
        .map(|i| i + 1)
}

/// Cut length ending at the last whitespace within the first `max` chars.
/// A whitespace at index 0 would produce an empty chunk and is ignored.
fn whitespace_cut(window: &[char], max: usize) -> Option<usize> {
    (1..max).rev().find(|&j| window[j].is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_into_chunks("", 10).is_empty());
        assert!(split_into_chunks("   \n\t", 10).is_empty());
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_into_chunks("Sentence one. Sentence two.", 3500);
        assert_eq!(texts(&chunks), vec!["Sentence one. Sentence two."]);
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn cuts_after_last_sentence_terminator() {
        let chunks = split_into_chunks("One two. Three four! Five six", 22);
        assert_eq!(texts(&chunks), vec!["One two. Three four!", "Five six"]);
        assert_eq!(chunks[1].start, 21);
    }

    #[test]
    fn question_mark_and_newline_count_as_sentence_end() {
        let chunks = split_into_chunks("Who is it?\nIt is me", 12);
        assert_eq!(texts(&chunks), vec!["Who is it?", "It is me"]);
        assert_eq!(chunks[1].start, 11);
    }

    #[test]
    fn terminator_without_whitespace_is_not_a_sentence_end() {
        // "3.14" must not be treated as a sentence boundary.
        let chunks = split_into_chunks("Pi is 3.14 roughly", 9);
        assert_eq!(texts(&chunks), vec!["Pi is", "3.14", "roughly"]);
    }

    #[test]
    fn falls_back_to_last_space() {
        let chunks = split_into_chunks("alpha beta gamma delta", 12);
        assert_eq!(texts(&chunks), vec!["alpha beta", "gamma delta"]);
        assert_eq!(chunks[1].start, 11);
    }

    #[test]
    fn hard_cuts_unbroken_token() {
        let chunks = split_into_chunks("abcdefghij", 4);
        assert_eq!(texts(&chunks), vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunks[2].start, 8);
    }

    #[test]
    fn zero_max_is_treated_as_one() {
        let chunks = split_into_chunks("abc", 0);
        assert_eq!(texts(&chunks), vec!["a", "b", "c"]);
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let text = "Trời mưa. Đường trơn lắm";
        let chunks = split_into_chunks(text, 12);
        assert_eq!(chunks[0].text, "Trời mưa.");
        let chars: Vec<char> = text.chars().collect();
        let tail: String = chars[chunks[1].start..].iter().collect();
        assert!(tail.starts_with(&chunks[1].text));
    }

    #[test]
    fn ten_thousand_chars_make_three_chunks() {
        let sentence = "The quick brown fox jumps over the dog. ";
        let mut text = sentence.repeat(250);
        text.truncate(10_000);
        assert_eq!(text.chars().count(), 10_000);

        let chunks = split_into_chunks(&text, 3500);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 3500);
        }
        // Every cut lands on a sentence boundary.
        for chunk in &chunks[..2] {
            assert!(chunk.text.ends_with('.'), "cut mid-sentence");
        }
    }

    #[test]
    fn suffix_split_keeps_absolute_offsets() {
        let chars: Vec<char> = "One. Two three. Four".chars().collect();
        let chunks = split_chars(&chars, 5, 100);
        assert_eq!(texts(&chunks), vec!["Two three. Four"]);
        assert_eq!(chunks[0].start, 5);
        assert_eq!(chunks[0].end(), chars.len());
    }

    #[test]
    fn natural_break_prefers_sentence_end() {
        let chars: Vec<char> = "First sentence here. Second sentence runs on".chars().collect();
        // Position inside "runs".
        let pos = 38;
        assert_eq!(natural_break_before(&chars, pos, 100), 21);
    }

    #[test]
    fn natural_break_falls_back_to_word_start() {
        let chars: Vec<char> = "no sentence ends in this text".chars().collect();
        // Position in the middle of "this".
        assert_eq!(natural_break_before(&chars, 22, 100), 20);
    }

    #[test]
    fn natural_break_window_is_fixed() {
        let mut text = String::from("Early end. ");
        text.push_str(&"x".repeat(150));
        let chars: Vec<char> = text.chars().collect();
        // The sentence end is more than 100 chars back and there is no
        // whitespace in the window: position is kept as-is.
        assert_eq!(natural_break_before(&chars, 140, 100), 140);
    }

    #[test]
    fn natural_break_edges() {
        let chars: Vec<char> = "abc def".chars().collect();
        assert_eq!(natural_break_before(&chars, 0, 100), 0);
        assert_eq!(natural_break_before(&chars, 7, 100), 7);
        assert_eq!(natural_break_before(&chars, 99, 100), 7);
    }

    proptest! {
        #[test]
        fn chunking_is_lossless(text in "[a-z .?!\\n]{0,300}", max in 1usize..40) {
            let chunks = split_into_chunks(&text, max);
            let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
            prop_assert_eq!(without_whitespace(&joined), without_whitespace(&text));
        }

        #[test]
        fn chunks_are_bounded_and_located(text in "[a-zA-Zàáảãạơưđ .!\\n]{0,300}", max in 1usize..40) {
            let chars: Vec<char> = text.chars().collect();
            let chunks = split_into_chunks(&text, max);
            prop_assert!(chunks.len() <= chars.len());
            let mut previous_end = 0;
            for chunk in &chunks {
                prop_assert!(!chunk.text.is_empty());
                prop_assert!(chunk.char_len() <= max);
                prop_assert!(chunk.start >= previous_end);
                let located: String = chars[chunk.start..chunk.end()].iter().collect();
                prop_assert_eq!(&located, &chunk.text);
                previous_end = chunk.end();
            }
        }

        #[test]
        fn natural_break_never_moves_forward(text in "[a-z .?!]{1,300}", pos in 0usize..300) {
            let chars: Vec<char> = text.chars().collect();
            let position = pos.min(chars.len());
            let restart = natural_break_before(&chars, position, 100);
            prop_assert!(restart <= position);
            prop_assert!(position - restart <= 101);
        }
    }
}
