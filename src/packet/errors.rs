use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum HeaderError {
    #[error("Buffer too small: expected {expected} bytes, found {found} bytes")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("Unsupported IP version {0}")]
    UnsupportedVersion(u8),

    #[error("Not a TCP datagram (protocol {0})")]
    NotTcp(u8),

    #[error("Non-initial IP fragment")]
    Fragment,

    #[error("Bad {field} length: {value}")]
    BadLength { field: &'static str, value: usize },
}
