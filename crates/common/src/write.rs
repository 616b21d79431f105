//! Row assembly for write-class query targets
//!
//! Written bytes accumulate until a newline completes a record. Each record
//! is split into fields according to the target's format; the fields are
//! bound, in order, to the `?` placeholders of the query text by the
//! database client. Nothing here touches the database.

use crate::error::{FsError, Result};
use crate::format::OutputFormat;

/// Drain every complete line from `pending`, leaving any partial tail
pub fn take_complete_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let Some(end) = pending.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = pending.drain(..=end).collect();
    split_lines(&complete)
}

/// Drain everything left in `pending` as final lines
pub fn take_remaining_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let rest = std::mem::take(pending);
    split_lines(&rest)
}

/// Put unexecuted lines back in front of whatever is still pending
pub fn restore_lines(pending: &mut Vec<u8>, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let mut restored = Vec::with_capacity(pending.len() + lines.len() * 16);
    for line in lines {
        restored.extend_from_slice(line.as_bytes());
        restored.push(b'\n');
    }
    restored.append(pending);
    *pending = restored;
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Split one record into fields; `None` binds SQL NULL
pub fn parse_record(format: OutputFormat, line: &str) -> Result<Vec<Option<String>>> {
    match format {
        OutputFormat::Csv => parse_csv(line),
        OutputFormat::Json => parse_json(line),
        OutputFormat::Text | OutputFormat::Html | OutputFormat::Xml => Ok(line
            .split_ascii_whitespace()
            .map(|field| Some(field.to_string()))
            .collect()),
    }
}

fn parse_csv(line: &str) -> Result<Vec<Option<String>>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (true, '"') => quoted = false,
            (false, '"') if field.is_empty() => quoted = true,
            (false, ',') => fields.push(Some(std::mem::take(&mut field))),
            (_, c) => field.push(c),
        }
    }

    if quoted {
        return Err(FsError::InvalidArgument(
            "unterminated quoted field".to_string(),
        ));
    }
    fields.push(Some(field));
    Ok(fields)
}

fn parse_json(line: &str) -> Result<Vec<Option<String>>> {
    let mut record = line.trim().trim_end_matches(',').trim();
    // rows copied out of a rendered result carry the outer array brackets
    if let Some(inner) = record.strip_prefix("[[") {
        record = &record[record.len() - inner.len() - 1..];
    }
    if record.ends_with("]]") {
        record = &record[..record.len() - 1];
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(record)
        .map_err(|e| FsError::InvalidArgument(format!("invalid json row: {}", e)))?;

    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_complete_lines_keeps_tail() {
        let mut pending = b"1 a\n2 b\n3".to_vec();
        assert_eq!(take_complete_lines(&mut pending), vec!["1 a", "2 b"]);
        assert_eq!(pending, b"3");

        assert!(take_complete_lines(&mut pending).is_empty());
        pending.extend_from_slice(b" c\r\n\n");
        assert_eq!(take_complete_lines(&mut pending), vec!["3 c"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_take_remaining_lines() {
        let mut pending = b"tail".to_vec();
        assert_eq!(take_remaining_lines(&mut pending), vec!["tail"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_restore_lines_goes_first() {
        let mut pending = b"4 d".to_vec();
        restore_lines(&mut pending, &["2 b".to_string(), "3 c".to_string()]);
        assert_eq!(pending, b"2 b\n3 c\n4 d");

        assert_eq!(take_complete_lines(&mut pending), vec!["2 b", "3 c"]);
        assert_eq!(pending, b"4 d");

        restore_lines(&mut pending, &[]);
        assert_eq!(pending, b"4 d");
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            parse_record(OutputFormat::Text, "1  two\tthree").unwrap(),
            vec![Some("1".into()), Some("two".into()), Some("three".into())]
        );
    }

    #[test]
    fn test_parse_csv() {
        assert_eq!(
            parse_record(OutputFormat::Csv, r#"1,"a, b","say ""hi""",,x"#).unwrap(),
            vec![
                Some("1".into()),
                Some("a, b".into()),
                Some("say \"hi\"".into()),
                Some("".into()),
                Some("x".into()),
            ]
        );
        assert!(parse_record(OutputFormat::Csv, "\"open").is_err());
    }

    #[test]
    fn test_parse_json() {
        assert_eq!(
            parse_record(OutputFormat::Json, r#"[1, "a", null, true]"#).unwrap(),
            vec![Some("1".into()), Some("a".into()), None, Some("true".into())]
        );
        assert_eq!(
            parse_record(OutputFormat::Json, r#"[[1,"a"],"#).unwrap(),
            vec![Some("1".into()), Some("a".into())]
        );
        assert_eq!(
            parse_record(OutputFormat::Json, r#"[2]]"#).unwrap(),
            vec![Some("2".into())]
        );
        assert!(parse_record(OutputFormat::Json, "{}").is_err());
    }
}
