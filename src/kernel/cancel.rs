/// Identifies one arming of one timer. Re-arming or stopping a timer retires its
/// token, so any event still carrying the old token is recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Default)]
pub struct TokenSource {
    issued: u64,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> TimerToken {
        self.issued += 1;
        TimerToken(self.issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_never_reused() {
        let mut source = TokenSource::new();
        let a = source.issue();
        let b = source.issue();
        assert_ne!(a, b);
    }
}
