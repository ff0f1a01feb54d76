use std::fmt;
use std::io::{Cursor, Read};

/// Content payload of a document.
///
/// The stream is consumed by whoever sends or stores it (the binding), but
/// closing/dropping the underlying resource stays with the caller that
/// constructed it.
pub struct ContentStream {
    pub file_name: Option<String>,
    pub mime_type: String,
    /// Declared length in bytes, if known up front.
    pub length: Option<u64>,
    stream: Box<dyn Read + Send>,
}

impl ContentStream {
    pub fn new(
        file_name: Option<String>,
        mime_type: impl Into<String>,
        length: Option<u64>,
        stream: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            file_name,
            mime_type: mime_type.into(),
            length,
            stream,
        }
    }

    /// Build a stream over an in-memory buffer.
    pub fn from_bytes(
        file_name: Option<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let length = data.len() as u64;
        Self::new(
            file_name,
            mime_type,
            Some(length),
            Box::new(Cursor::new(data)),
        )
    }

    /// Hand the underlying reader to the consumer.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.stream
    }

    /// Drain the stream into a buffer. Consumes the stream.
    pub fn read_all(self) -> std::io::Result<Vec<u8>> {
        let mut buf = match self.length {
            Some(len) => Vec::with_capacity(len as usize),
            None => Vec::new(),
        };
        let mut reader = self.stream;
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_sets_length() {
        let cs = ContentStream::from_bytes(Some("a.txt".into()), "text/plain", b"hello".to_vec());
        assert_eq!(cs.length, Some(5));
        assert_eq!(cs.mime_type, "text/plain");
    }

    #[test]
    fn read_all_drains_stream() {
        let cs = ContentStream::from_bytes(None, "text/plain", b"payload".to_vec());
        assert_eq!(cs.read_all().unwrap(), b"payload");
    }

    #[test]
    fn debug_does_not_touch_stream() {
        let cs = ContentStream::from_bytes(None, "application/octet-stream", vec![1, 2, 3]);
        let dbg = format!("{cs:?}");
        assert!(dbg.contains("ContentStream"));
        assert!(dbg.contains("octet-stream"));
    }
}
