//! Read/write/append classification of raw query text
//!
//! Only the leading keyword is inspected. The rest of the statement is
//! never parsed.

const READ_KEYWORDS: &[&str] = &["SELECT", "DESC", "SHOW"];
const WRITE_KEYWORDS: &[&str] = &["INSERT", "REPLACE", "UPDATE"];
const APPEND_KEYWORDS: &[&str] = &["INSERT"];

/// Capabilities granted to a query by its leading keyword
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Opening for read executes the query
    pub read: bool,
    /// Opening for write accepts row data
    pub write: bool,
    /// Opening with `O_APPEND` is allowed; implies `write`
    pub append: bool,
}

impl Classification {
    pub fn of(query: &str) -> Self {
        let text = query.trim_start();
        Self {
            read: starts_with_any(text, READ_KEYWORDS),
            write: starts_with_any(text, WRITE_KEYWORDS),
            append: starts_with_any(text, APPEND_KEYWORDS),
        }
    }

    /// Neither readable nor writable
    pub fn is_inert(&self) -> bool {
        !self.read && !self.write
    }
}

fn starts_with_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        text.get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
    })
}
