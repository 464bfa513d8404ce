//! Transfer messages

/// One message of a chunked transfer.
///
/// The end marker is its own variant, so no payload byte sequence can be
/// mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMessage {
    /// One bounded fragment of the payload, in send order.
    Chunk(Vec<u8>),
    /// Sent exactly once after the last chunk.
    End,
}

impl TransferMessage {
    /// Bytes this message adds to a channel's buffered amount.
    pub fn len(&self) -> usize {
        match self {
            TransferMessage::Chunk(data) => data.len(),
            TransferMessage::End => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_end(&self) -> bool {
        matches!(self, TransferMessage::End)
    }
}
