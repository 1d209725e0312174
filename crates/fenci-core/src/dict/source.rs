use std::io::BufRead;

use tracing::debug;

use super::{DictError, DuplicatePolicy, FrequencyTable};

const BOM: char = '\u{FEFF}';

/// Parse a dictionary source: one `word frequency [tag]` entry per line,
/// whitespace-delimited. Blank lines are skipped.
pub fn parse_dictionary<R: BufRead>(
    reader: R,
    policy: DuplicatePolicy,
) -> Result<FrequencyTable, DictError> {
    let mut table = FrequencyTable::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let text = if idx == 0 {
            line.trim_start_matches(BOM)
        } else {
            line.as_str()
        };
        let mut fields = text.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };
        let Some(freq) = fields.next() else {
            return Err(DictError::MalformedEntry {
                line: line_no,
                content: line.clone(),
            });
        };
        let count: u64 = freq.parse().map_err(|_| DictError::InvalidFrequency {
            line: line_no,
            value: freq.to_string(),
        })?;
        table.insert(word, count, policy);
    }
    if table.total() == 0 {
        return Err(DictError::Empty);
    }
    debug!(entries = table.len(), total = table.total());
    Ok(table)
}

/// A line of a user dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWord {
    pub word: String,
    pub frequency: Option<u64>,
    pub tag: Option<String>,
}

/// Parse a user dictionary: lines of `word [frequency] [tag]`, where the
/// word may itself contain spaces, the frequency is decimal and the tag
/// is lower-case ASCII. Blank lines are skipped.
pub fn parse_user_dictionary<R: BufRead>(reader: R) -> Result<Vec<UserWord>, DictError> {
    let mut words = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let text = if idx == 0 {
            line.trim_start_matches(BOM)
        } else {
            line.as_str()
        };
        if text.trim().is_empty() {
            continue;
        }
        let parsed = parse_user_line(text).ok_or_else(|| DictError::MalformedEntry {
            line: idx + 1,
            content: line.clone(),
        })?;
        words.push(parsed);
    }
    Ok(words)
}

fn parse_user_line(line: &str) -> Option<UserWord> {
    let mut rest = line;
    let mut tag = None;
    let mut frequency = None;

    if let Some((head, last)) = rest.rsplit_once(' ') {
        if !head.is_empty() && !last.is_empty() && last.bytes().all(|b| b.is_ascii_lowercase()) {
            tag = Some(last.to_string());
            rest = head;
        }
    }
    if let Some((head, last)) = rest.rsplit_once(' ') {
        if !head.is_empty() && !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            frequency = Some(last.parse().ok()?);
            rest = head;
        }
    }

    let word = rest.trim();
    if word.is_empty() {
        return None;
    }
    Some(UserWord {
        word: word.to_string(),
        frequency,
        tag,
    })
}
