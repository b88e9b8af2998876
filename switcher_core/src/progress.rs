/// Write-only sink for the human-readable progress lines of long sequences.
pub trait ProgressSink {
    fn report(&self, line: &str);
}

/// Discards every line; progress still reaches `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _line: &str) {}
}

impl<F: Fn(&str)> ProgressSink for F {
    fn report(&self, line: &str) {
        self(line)
    }
}
