//! Character classification and block splitting for mixed Chinese text.

/// CJK Unified Ideographs as covered by the segmentation dictionaries.
pub fn is_han(c: char) -> bool {
    ('\u{4E00}'..='\u{9FD5}').contains(&c)
}

/// Connector symbols that stay attached to a segmentable block.
pub fn is_connector(c: char) -> bool {
    matches!(c, '+' | '#' | '&' | '.' | '_' | '%' | '-')
}

/// Characters that belong to a segmentable block: Han ideographs, ASCII
/// letters and digits, and the connector symbols.
pub fn is_block_char(c: char) -> bool {
    is_han(c) || c.is_ascii_alphanumeric() || is_connector(c)
}

/// A maximal run of characters that share a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block<'a> {
    /// Characters accepted by the classifier.
    Han(&'a str),
    /// Everything between accepted runs.
    Other(&'a str),
}

impl<'a> Block<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Block::Han(s) | Block::Other(s) => s,
        }
    }
}

/// Iterator over alternating classified / unclassified runs of a string.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    rest: &'a str,
    classify: fn(char) -> bool,
}

impl<'a> Blocks<'a> {
    pub fn new(text: &'a str, classify: fn(char) -> bool) -> Self {
        Self {
            rest: text,
            classify,
        }
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Block<'a>> {
        let first = self.rest.chars().next()?;
        let inside = (self.classify)(first);
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| (self.classify)(c) != inside)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(if inside {
            Block::Han(head)
        } else {
            Block::Other(head)
        })
    }
}

impl std::iter::FusedIterator for Blocks<'_> {}

/// Split text into segmentable blocks (Han plus attached alphanumerics)
/// and the runs between them.
pub fn split_blocks(text: &str) -> Blocks<'_> {
    Blocks::new(text, is_block_char)
}

/// Split text into pure Han runs and the runs between them.
pub fn split_han_runs(text: &str) -> Blocks<'_> {
    Blocks::new(text, is_han)
}

/// Tokens of a non-segmentable run: consecutive whitespace stays one
/// token, every other character is a token of its own.
#[derive(Debug, Clone)]
pub struct SkipTokens<'a> {
    rest: &'a str,
}

impl<'a> SkipTokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl<'a> Iterator for SkipTokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let end = if first.is_whitespace() {
            self.rest
                .char_indices()
                .find(|&(_, c)| !c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(self.rest.len())
        } else {
            first.len_utf8()
        };
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(head)
    }
}

impl std::iter::FusedIterator for SkipTokens<'_> {}

/// Pieces of a non-Han stretch: runs matching `[A-Za-z0-9]+(\.[0-9]+)?%?`
/// are kept whole, and the text between them is emitted as-is.
#[derive(Debug, Clone)]
pub struct AlnumPieces<'a> {
    rest: &'a str,
}

impl<'a> AlnumPieces<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl<'a> Iterator for AlnumPieces<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let end = match self.rest.find(|c: char| c.is_ascii_alphanumeric()) {
            Some(0) => alnum_match_len(self.rest),
            Some(start) => start,
            None => self.rest.len(),
        };
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(head)
    }
}

impl std::iter::FusedIterator for AlnumPieces<'_> {}

/// Byte length of the alphanumeric match at the start of `s`.
///
/// `s` must start with an ASCII alphanumeric character. All matched bytes
/// are ASCII, so the result is always a char boundary.
fn alnum_match_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        i += bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    if bytes.get(i) == Some(&b'%') {
        i += 1;
    }
    i
}
