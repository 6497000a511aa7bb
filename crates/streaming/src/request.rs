/// Identifies one load attempt.
///
/// Tokens are handed out in strictly increasing order and never reused, so a
/// continuation carrying an older token can always be recognised as stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RequestTokens {
    next: u64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Request {
        self.next = self.next.wrapping_add(1);
        Request(self.next)
    }
}
