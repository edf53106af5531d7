/// Nesting depth of open batches. Validation and repaint wait while it is non-zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchCounter {
    depth: u32,
}

impl BatchCounter {
    pub fn begin(&mut self) -> u32 {
        self.depth = self.depth.saturating_add(1);
        self.depth
    }

    /// Returns `true` when the outermost batch closed. Unbalanced ends are ignored.
    pub fn end(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        self.depth == 0
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::BatchCounter;

    #[test]
    fn only_the_outermost_end_closes() {
        let mut batch = BatchCounter::default();
        batch.begin();
        batch.begin();
        assert!(!batch.end());
        assert!(batch.end());
        assert!(!batch.is_open());
    }

    #[test]
    fn extra_end_is_ignored() {
        let mut batch = BatchCounter::default();
        assert!(!batch.end());
        assert_eq!(batch.depth(), 0);
        batch.begin();
        assert!(batch.end());
    }
}
