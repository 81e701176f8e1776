use regex::Regex;

/// Something the cursor can test against the unread part of the source.
///
/// Implementations report how many bytes of `input` they match when anchored
/// at its first byte. A zero-length match counts as no match, so optional
/// regex fragments never make `eat` succeed without consuming anything.
pub trait Pattern {
    fn match_len(&self, input: &str) -> Option<usize>;
}

impl Pattern for str {
    fn match_len(&self, input: &str) -> Option<usize> {
        (!self.is_empty() && input.starts_with(self)).then_some(self.len())
    }
}

impl Pattern for char {
    fn match_len(&self, input: &str) -> Option<usize> {
        input.starts_with(*self).then_some(self.len_utf8())
    }
}

impl Pattern for Regex {
    fn match_len(&self, input: &str) -> Option<usize> {
        self.find(input)
            .filter(|m| m.start() == 0 && m.end() > 0)
            .map(|m| m.end())
    }
}

impl<P: Pattern + ?Sized> Pattern for &P {
    fn match_len(&self, input: &str) -> Option<usize> {
        (**self).match_len(input)
    }
}
