use crate::classify::Classification;
use crate::format::OutputFormat;

/// Handle of a live query in the catalog's query table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u64);

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Open state of a query target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryState {
    #[default]
    Closed,
    /// Validated and reset, execution in flight
    Opening,
    Ready,
}

/// A user-created query shared by its link and target nodes
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub format: OutputFormat,
    pub class: Classification,
    /// Path of the symlink holding the text
    pub link_path: String,
    /// Path of the file yielding the result
    pub target_path: String,
    pub state: QueryState,
    /// Formatted result; only meaningful while `Ready`
    pub buffer: Vec<u8>,
    /// Written bytes not yet forming a complete row
    pub pending: Vec<u8>,
}

impl Query {
    pub fn new(text: &str, link_path: String, target_path: String) -> Self {
        Self {
            text: text.to_string(),
            format: OutputFormat::from_path(&link_path),
            class: Classification::of(text),
            link_path,
            target_path,
            state: QueryState::Closed,
            buffer: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == QueryState::Ready
    }

    /// Drop results and pending input, returning to `state`
    pub fn reset(&mut self, state: QueryState) {
        self.state = state;
        self.buffer.clear();
        self.pending.clear();
    }

    /// Up to `size` bytes of the result starting at `offset`
    pub fn read_at(&self, offset: u64, size: usize) -> &[u8] {
        let len = self.buffer.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(size).min(len);
        &self.buffer[start..end]
    }
}
