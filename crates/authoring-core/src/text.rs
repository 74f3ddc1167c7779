use unicode_segmentation::UnicodeSegmentation;

/// Char offset <-> byte offset mapping for a single block of text.
#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .cloned()
            .unwrap_or(self.text_len)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    pub(crate) fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Substring by char offsets (clamped).
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end.max(start));
    &text[start_byte..end_byte]
}

/// Replace `[start, end)` (char offsets) with `insert`.
pub(crate) fn splice(text: &str, start: usize, end: usize, insert: &str) -> String {
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end.max(start));
    let mut out = String::with_capacity(text.len() - (end_byte - start_byte) + insert.len());
    out.push_str(&text[..start_byte]);
    out.push_str(insert);
    out.push_str(&text[end_byte..]);
    out
}

/// Char offset of the grapheme boundary preceding `char_offset`.
pub(crate) fn prev_grapheme_boundary(text: &str, char_offset: usize) -> usize {
    let mut chars_seen = 0;
    let mut last = 0;
    for grapheme in text.graphemes(true) {
        if chars_seen >= char_offset {
            break;
        }
        last = chars_seen;
        chars_seen += grapheme.chars().count();
    }
    last
}

/// Char offset of the grapheme boundary following `char_offset`.
pub(crate) fn next_grapheme_boundary(text: &str, char_offset: usize) -> usize {
    let mut chars_seen = 0;
    for grapheme in text.graphemes(true) {
        chars_seen += grapheme.chars().count();
        if chars_seen > char_offset {
            return chars_seen;
        }
    }
    chars_seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_multibyte() {
        assert_eq!(splice("héllo", 1, 2, "e"), "hello");
        assert_eq!(char_slice("日本語テキスト", 2, 4), "語テ");
    }

    #[test]
    fn test_grapheme_boundaries() {
        // "e" + combining acute accent forms one grapheme.
        let text = "ae\u{301}b";
        assert_eq!(prev_grapheme_boundary(text, 3), 1);
        assert_eq!(next_grapheme_boundary(text, 1), 3);
        assert_eq!(next_grapheme_boundary(text, 4), 4);
        assert_eq!(prev_grapheme_boundary(text, 0), 0);
    }
}
