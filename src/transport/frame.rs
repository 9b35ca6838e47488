//! Frame encoding and decoding for the LiveSync wire format.
//!
//! Both frame shapes are described by a field schema ([`FieldKind`]) that the
//! encoder and the decoder walk in the same order.
//!
//! Create/update frame:
//! ```text
//! +-----+-----+------------+--------+-----+------------+--------+---------+--------+
//! | Op  | NLL | NameLength | Name   | CLL | ContentLen | MD5    | Content | MD5    |
//! | 1 B | 1 B | NLL bytes  | UTF-8  | 1 B | CLL bytes  | header | bytes   | content|
//! +-----+-----+------------+--------+-----+------------+--------+---------+--------+
//! ```
//!
//! Delete frame:
//! ```text
//! +-----+-----+------------+--------+--------+
//! | Op  | NLL | NameLength | Name   | MD5    |
//! +-----+-----+------------+--------+--------+
//! ```
//!
//! `Op` is a single ASCII digit. `NLL`/`CLL` are raw bytes holding the digit
//! count of the ASCII decimal length that follows. The header digest covers
//! every byte before it; the content digest covers the content only.

use thiserror::Error;

use crate::core::{
    CREATE_FILE_OPERATION, DELETE_FILE_OPERATION, DIGEST_SIZE, OPERATION_SIZE, SIZE_OF_SIZE_BYTES,
};

/// Operation carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create or update a file.
    CreateFile,
    /// Delete a file.
    DeleteFile,
}

impl Operation {
    /// Numeric operation code.
    pub fn code(self) -> u8 {
        match self {
            Self::CreateFile => CREATE_FILE_OPERATION,
            Self::DeleteFile => DELETE_FILE_OPERATION,
        }
    }

    /// The ASCII digit written on the wire.
    pub fn as_byte(self) -> u8 {
        b'0' + self.code()
    }

    /// Parse an operation from its wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte.checked_sub(b'0')? {
            CREATE_FILE_OPERATION => Some(Self::CreateFile),
            DELETE_FILE_OPERATION => Some(Self::DeleteFile),
            _ => None,
        }
    }

    /// Field schema for frames of this operation.
    pub fn layout(self) -> &'static [FieldKind] {
        match self {
            Self::CreateFile => CREATE_LAYOUT,
            Self::DeleteFile => DELETE_LAYOUT,
        }
    }
}

/// One field of a frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Operation digit.
    Operation,
    /// Digit count plus ASCII decimal byte length of the name.
    NameLength,
    /// Relative path bytes.
    Name,
    /// Digit count plus ASCII decimal byte length of the content.
    ContentLength,
    /// MD5 of every byte preceding this field.
    HeaderDigest,
    /// File content bytes.
    Content,
    /// MD5 of the content field.
    ContentDigest,
}

/// Schema of a create/update frame.
pub const CREATE_LAYOUT: &[FieldKind] = &[
    FieldKind::Operation,
    FieldKind::NameLength,
    FieldKind::Name,
    FieldKind::ContentLength,
    FieldKind::HeaderDigest,
    FieldKind::Content,
    FieldKind::ContentDigest,
];

/// Schema of a delete frame.
pub const DELETE_LAYOUT: &[FieldKind] = &[
    FieldKind::Operation,
    FieldKind::NameLength,
    FieldKind::Name,
    FieldKind::HeaderDigest,
];

/// Which digest failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// Digest over the header fields.
    Header,
    /// Digest over the content.
    Content,
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Content => f.write_str("content"),
        }
    }
}

/// A single file operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Create or replace `path` with `content`.
    Create {
        /// Path relative to the sync root, forward-slash separated.
        path: String,
        /// Full file content.
        content: Vec<u8>,
    },
    /// Delete `path`.
    Delete {
        /// Path relative to the sync root, forward-slash separated.
        path: String,
    },
}

impl Frame {
    /// Create frame for a new file.
    pub fn create(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self::Create {
            path: path.into(),
            content,
        }
    }

    /// Update frame. The agent treats updates exactly like creates.
    pub fn update(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self::create(path, content)
    }

    /// Delete frame.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete { path: path.into() }
    }

    /// The operation this frame carries.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::CreateFile,
            Self::Delete { .. } => Operation::DeleteFile,
        }
    }

    /// Relative path of the file.
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. } | Self::Delete { path } => path,
        }
    }

    /// File content, present only for create frames.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Create { content, .. } => Some(content),
            Self::Delete { .. } => None,
        }
    }

    /// Exact number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        let content_len = self.content().map_or(0, <[u8]>::len);
        self.operation()
            .layout()
            .iter()
            .map(|field| match field {
                FieldKind::Operation => OPERATION_SIZE,
                FieldKind::NameLength => length_field_size(self.path().len()),
                FieldKind::Name => self.path().len(),
                FieldKind::ContentLength => length_field_size(content_len),
                FieldKind::HeaderDigest | FieldKind::ContentDigest => DIGEST_SIZE,
                FieldKind::Content => content_len,
            })
            .sum()
    }

    /// Serialize the frame to its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let content = self.content().unwrap_or_default();
        let mut buf = Vec::with_capacity(self.encoded_len());

        for field in self.operation().layout() {
            match field {
                FieldKind::Operation => buf.push(self.operation().as_byte()),
                FieldKind::NameLength => put_length(&mut buf, self.path().len()),
                FieldKind::Name => buf.extend_from_slice(self.path().as_bytes()),
                FieldKind::ContentLength => put_length(&mut buf, content.len()),
                FieldKind::HeaderDigest => {
                    let digest = md5::compute(&buf);
                    buf.extend_from_slice(&digest.0);
                }
                FieldKind::Content => buf.extend_from_slice(content),
                FieldKind::ContentDigest => buf.extend_from_slice(&md5::compute(content).0),
            }
        }

        buf
    }

    /// Parse and verify one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes it occupied, so consecutive
    /// frames can be read from one buffer.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), FrameError> {
        let first = *data.first().ok_or(FrameError::TooShort {
            expected: OPERATION_SIZE,
            actual: 0,
        })?;
        let operation = Operation::from_byte(first).ok_or(FrameError::InvalidOperation(first))?;

        let mut reader = FieldReader { data, pos: 0 };
        let mut name_len = 0;
        let mut content_len = 0;
        let mut path = String::new();
        let mut content: &[u8] = &[];

        for field in operation.layout() {
            match field {
                FieldKind::Operation => {
                    reader.take(OPERATION_SIZE)?;
                }
                FieldKind::NameLength => name_len = reader.length()?,
                FieldKind::Name => {
                    let raw = reader.take(name_len)?;
                    path = std::str::from_utf8(raw)
                        .map_err(|_| FrameError::InvalidName)?
                        .to_owned();
                }
                FieldKind::ContentLength => content_len = reader.length()?,
                FieldKind::HeaderDigest => {
                    let covered = &data[..reader.pos];
                    let digest = reader.take(DIGEST_SIZE)?;
                    verify(covered, digest, DigestKind::Header)?;
                }
                FieldKind::Content => content = reader.take(content_len)?,
                FieldKind::ContentDigest => {
                    let digest = reader.take(DIGEST_SIZE)?;
                    verify(content, digest, DigestKind::Content)?;
                }
            }
        }

        let frame = match operation {
            Operation::CreateFile => Self::Create {
                path,
                content: content.to_vec(),
            },
            Operation::DeleteFile => Self::Delete { path },
        };

        Ok((frame, reader.pos))
    }
}

/// Errors that can occur during frame parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is too short.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum expected size.
        expected: usize,
        /// Actual size received.
        actual: usize,
    },

    /// Unknown operation digit.
    #[error("invalid operation: 0x{0:02x}")]
    InvalidOperation(u8),

    /// Length field is empty, too wide, or not decimal.
    #[error("invalid length field")]
    InvalidLength,

    /// File name is not valid UTF-8.
    #[error("file name is not valid UTF-8")]
    InvalidName,

    /// A digest does not match the bytes it covers.
    #[error("{0} digest mismatch")]
    DigestMismatch(DigestKind),
}

/// Widest decimal length a digit-count byte may announce (`usize::MAX` has 20 digits).
const MAX_LENGTH_DIGITS: usize = 20;

fn length_field_size(len: usize) -> usize {
    SIZE_OF_SIZE_BYTES + decimal_digits(len)
}

fn decimal_digits(mut value: usize) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

fn put_length(buf: &mut Vec<u8>, len: usize) {
    let digits = len.to_string();
    // At most MAX_LENGTH_DIGITS, always fits.
    buf.push(digits.len() as u8);
    buf.extend_from_slice(digits.as_bytes());
}

fn verify(covered: &[u8], digest: &[u8], kind: DigestKind) -> Result<(), FrameError> {
    if md5::compute(covered).0[..] == *digest {
        Ok(())
    } else {
        Err(FrameError::DigestMismatch(kind))
    }
}

struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FrameError> {
        let end = self.pos.checked_add(len).ok_or(FrameError::InvalidLength)?;
        let bytes = self.data.get(self.pos..end).ok_or(FrameError::TooShort {
            expected: end,
            actual: self.data.len(),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    fn length(&mut self) -> Result<usize, FrameError> {
        let count = self.take(SIZE_OF_SIZE_BYTES)?[0] as usize;
        if count == 0 || count > MAX_LENGTH_DIGITS {
            return Err(FrameError::InvalidLength);
        }

        let digits = self.take(count)?;
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(FrameError::InvalidLength);
        }

        digits.iter().try_fold(0usize, |acc, d| {
            acc.checked_mul(10)
                .and_then(|acc| acc.checked_add((d - b'0') as usize))
                .ok_or(FrameError::InvalidLength)
        })
    }
}
