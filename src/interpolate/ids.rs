//! Identifier assignment for address documents.

/// Supplies unique document identifiers.
///
/// Callers own the generator, so repeated or concurrent imports never share a
/// counter. Any `FnMut() -> String` closure is a generator.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> String,
{
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Prefixed sequence: "{prefix}:0", "{prefix}:1", ...
///
/// Using the source file stem as prefix keeps ids unique across files.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    pub fn starting_at(prefix: impl Into<String>, next: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next,
        }
    }

    /// Number of ids handed out so far (or the next sequence value)
    pub fn issued(&self) -> u64 {
        self.next
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}:{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
