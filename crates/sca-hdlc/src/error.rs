use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame truncated: {len} bytes, need at least {min}")]
    Truncated { len: usize, min: usize },

    #[error("keepalive packet truncated: {len} bytes, need at least {min}")]
    KeepaliveTruncated { len: usize, min: usize },
}
