use tracing::warn;

/// Non-fatal conditions collected while a job runs.
///
/// Stages and collaborators push into the buffer; the checkpoint manager
/// flushes it into the job log so that warnings are neither lost nor allowed
/// to interrupt the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningBuffer {
    pending: Vec<String>,
}

impl WarningBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.pending.push(message.into());
    }

    pub fn extend<I, S>(&mut self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(messages.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    /// Emits every pending warning into the job log and empties the buffer.
    ///
    /// Returns the number of warnings flushed.
    pub fn flush(&mut self, job: &str) -> usize {
        let drained = self.drain();
        for message in &drained {
            warn!(job, "{}", message);
        }
        drained.len()
    }
}
