//! Frame codec
//!
//! Wire format: `0|LL|TYPE|field|field|...|` where `LL` is the two-digit,
//! zero-padded byte count of `TYPE|field|...|`. Pure functions, no I/O.

use crate::error::FrameError;
use crate::message::{Frame, MessageType};

/// Bytes in the `0|LL|` envelope header
pub const HEADER_LEN: usize = 5;

/// Largest payload a two-digit length can declare
pub const MAX_PAYLOAD_LEN: usize = 99;

/// Largest field accepted on decode
pub const MAX_FIELD_LEN: usize = 127;

const SEPARATOR: char = '|';

/// Encode a frame
///
/// Fields that would push the payload past [`MAX_PAYLOAD_LEN`] are dropped
/// whole, together with every field after them.
pub fn encode(kind: MessageType, fields: &[String]) -> String {
    let tag = kind.tag();
    let mut remaining = MAX_PAYLOAD_LEN.saturating_sub(tag.len() + 1);
    let mut body = String::new();

    for field in fields {
        let needed = field.len() + 1;
        if needed > remaining {
            break;
        }
        body.push_str(field);
        body.push(SEPARATOR);
        remaining -= needed;
    }

    let length = tag.len() + 1 + body.len();
    format!("0|{:02}|{}|{}", length, tag, body)
}

/// Validate the `0|LL|` envelope of one raw read and return its payload
///
/// Bytes beyond the declared length are discarded; fewer bytes than
/// declared is an error.
pub fn unwrap_envelope(raw: &[u8]) -> Result<&[u8], FrameError> {
    if raw.len() < HEADER_LEN {
        return Err(FrameError::Malformed("short header"));
    }

    let header = &raw[..HEADER_LEN];
    if header[0] != b'0'
        || header[1] != b'|'
        || !header[2].is_ascii_digit()
        || !header[3].is_ascii_digit()
        || header[4] != b'|'
    {
        return Err(FrameError::Malformed("bad header"));
    }

    let declared = usize::from(header[2] - b'0') * 10 + usize::from(header[3] - b'0');
    let available = raw.len() - HEADER_LEN;
    if available < declared {
        return Err(FrameError::Malformed("short payload"));
    }

    Ok(&raw[HEADER_LEN..HEADER_LEN + declared])
}

/// Decode a payload of the form `TYPE|field0|field1|...|`
pub fn decode_payload(payload: &[u8]) -> Result<Frame, FrameError> {
    let text = std::str::from_utf8(payload).map_err(|_| FrameError::Malformed("not utf-8"))?;

    let mut parts = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some(end) = rest.find(SEPARATOR) else {
            return Err(FrameError::Malformed("unterminated field"));
        };
        if end > MAX_FIELD_LEN {
            return Err(FrameError::Malformed("field too long"));
        }
        parts.push(&rest[..end]);
        rest = &rest[end + 1..];
    }

    let Some((tag, fields)) = parts.split_first() else {
        return Err(FrameError::Malformed("missing type"));
    };
    let kind = MessageType::from_inbound_tag(tag).ok_or(FrameError::Malformed("unknown type"))?;

    Ok(Frame {
        kind,
        fields: fields.iter().map(|f| f.to_string()).collect(),
    })
}

/// Decode one complete raw read: envelope, then payload
pub fn decode(raw: &[u8]) -> Result<Frame, FrameError> {
    unwrap_envelope(raw).and_then(decode_payload)
}
