use super::RecorderKind;

/// Ordered, append-only chunks produced by one recorder
#[derive(Debug, Clone)]
pub struct ChunkBuffer {
    kind: RecorderKind,
    mime_type: String,
    extension: String,
    chunks: Vec<Vec<u8>>,
}

impl ChunkBuffer {
    pub fn new(kind: RecorderKind, mime_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            kind,
            mime_type: mime_type.into(),
            extension: extension.into(),
            chunks: Vec::new(),
        }
    }

    pub fn kind(&self) -> RecorderKind {
        self.kind
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Append a chunk in arrival order; empty chunks carry nothing and are skipped
    pub fn push(&mut self, data: Vec<u8>) {
        if !data.is_empty() {
            self.chunks.push(data);
        }
    }

    /// Number of chunks held
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenate every chunk into one payload and clear the buffer
    pub fn take_payload(&mut self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.byte_len());
        for chunk in self.chunks.drain(..) {
            payload.extend_from_slice(&chunk);
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_payload_concatenates_in_order_and_clears() {
        let mut buffer = ChunkBuffer::new(RecorderKind::MicAudio, "audio/wav", "wav");
        buffer.push(vec![1, 2]);
        buffer.push(vec![]);
        buffer.push(vec![3]);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.byte_len(), 3);
        assert_eq!(buffer.take_payload(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
        assert!(buffer.take_payload().is_empty());
    }
}
