//! RouterOS API wire codec.
//!
//! The API is a sentence-oriented protocol: a sentence is a sequence of words,
//! each word prefixed with a variable-length length field, terminated by a
//! zero-length word. Replies come back as sentences starting with `!re`
//! (a data row), `!done` (end of reply), `!trap` (command-level failure) or
//! `!fatal` (connection-level failure).
//!
//! Everything in this module is pure byte/string manipulation; the actual
//! socket I/O lives in `transport`.

use super::error::DeviceError;

/// Encodes a word length using the RouterOS variable-length scheme.
pub fn encode_length(len: u32) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        let v = len | 0x8000;
        vec![(v >> 8) as u8, v as u8]
    } else if len < 0x20_0000 {
        let v = len | 0xC0_0000;
        vec![(v >> 16) as u8, (v >> 8) as u8, v as u8]
    } else if len < 0x1000_0000 {
        let v = len | 0xE000_0000;
        vec![(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]
    } else {
        vec![
            0xF0,
            (len >> 24) as u8,
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
        ]
    }
}

/// Number of additional bytes that follow `first` in a length prefix.
pub fn length_tail_size(first: u8) -> Result<usize, DeviceError> {
    if first & 0x80 == 0 {
        Ok(0)
    } else if first & 0xC0 == 0x80 {
        Ok(1)
    } else if first & 0xE0 == 0xC0 {
        Ok(2)
    } else if first & 0xF0 == 0xE0 {
        Ok(3)
    } else if first == 0xF0 {
        Ok(4)
    } else {
        Err(DeviceError::Protocol(format!(
            "invalid length prefix byte 0x{first:02x}"
        )))
    }
}

/// Decodes a length prefix whose first byte is `first` and whose remaining
/// bytes (as announced by [`length_tail_size`]) are `tail`.
pub fn decode_length(first: u8, tail: &[u8]) -> Result<u32, DeviceError> {
    let expected = length_tail_size(first)?;
    if tail.len() != expected {
        return Err(DeviceError::Protocol(format!(
            "length prefix expects {expected} continuation bytes, got {}",
            tail.len()
        )));
    }
    let mut value: u32 = match expected {
        0 => first as u32,
        1 => (first & 0x3F) as u32,
        2 => (first & 0x1F) as u32,
        3 => (first & 0x0F) as u32,
        _ => 0,
    };
    for b in tail {
        value = (value << 8) | *b as u32;
    }
    Ok(value)
}

/// Encodes a full sentence: each word length-prefixed, then the terminator.
pub fn encode_sentence(words: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for word in words {
        buf.extend_from_slice(&encode_length(word.len() as u32));
        buf.extend_from_slice(word.as_bytes());
    }
    buf.push(0);
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// One data row; zero or more per command.
    Re,
    /// Command finished.
    Done,
    /// Command failed; the sentence usually carries `=message=`.
    Trap,
    /// The device is closing the connection.
    Fatal,
}

/// A parsed reply sentence: its kind plus the attribute words it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySentence {
    pub kind: ReplyKind,
    pub attributes: Vec<(String, String)>,
}

impl ReplySentence {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `=message=` attribute of a trap, when present.
    pub fn message(&self) -> Option<&str> {
        self.attribute("message")
    }
}

/// Splits an attribute word of the form `=key=value` (value may itself
/// contain `=`). Words that are not attributes return `None`.
pub fn parse_attribute(word: &str) -> Option<(String, String)> {
    let rest = word.strip_prefix('=')?;
    let (key, value) = rest.split_once('=')?;
    Some((key.to_string(), value.to_string()))
}

/// Parses a raw reply sentence into kind + attributes. API tags (`.tag=`)
/// and query words are ignored; this client never sends tagged requests.
pub fn parse_reply(words: &[String]) -> Result<ReplySentence, DeviceError> {
    let first = words
        .first()
        .ok_or_else(|| DeviceError::Protocol("empty reply sentence".to_string()))?;
    let kind = match first.as_str() {
        "!re" => ReplyKind::Re,
        "!done" => ReplyKind::Done,
        "!trap" => ReplyKind::Trap,
        "!fatal" => ReplyKind::Fatal,
        other => {
            return Err(DeviceError::Protocol(format!(
                "unexpected reply word {other:?}"
            )));
        }
    };
    let attributes = words[1..].iter().filter_map(|w| parse_attribute(w)).collect();
    Ok(ReplySentence { kind, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(len: u32) -> u32 {
        let encoded = encode_length(len);
        decode_length(encoded[0], &encoded[1..]).unwrap()
    }

    #[test]
    fn length_encoding_boundaries() {
        assert_eq!(encode_length(0), vec![0x00]);
        assert_eq!(encode_length(0x7F), vec![0x7F]);
        assert_eq!(encode_length(0x80), vec![0x80, 0x80]);
        assert_eq!(encode_length(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(encode_length(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(encode_length(0x1F_FFFF), vec![0xDF, 0xFF, 0xFF]);
        assert_eq!(encode_length(0x20_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(
            encode_length(0x1000_0000),
            vec![0xF0, 0x10, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn length_roundtrips() {
        for len in [0, 1, 0x7F, 0x80, 0x1234, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, 0xFFF_FFFF] {
            assert_eq!(roundtrip(len), len, "len 0x{len:x}");
        }
    }

    #[test]
    fn invalid_prefix_rejected() {
        assert!(length_tail_size(0xF8).is_err());
    }

    #[test]
    fn sentence_encoding_appends_terminator() {
        let buf = encode_sentence(&["/login".to_string(), "=name=admin".to_string()]);
        assert_eq!(buf[0], 6);
        assert_eq!(&buf[1..7], b"/login");
        assert_eq!(buf[7], 11);
        assert_eq!(*buf.last().unwrap(), 0);
    }

    #[test]
    fn attribute_value_may_contain_equals() {
        assert_eq!(
            parse_attribute("=comment=a=b"),
            Some(("comment".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_attribute("!re"), None);
    }

    #[test]
    fn parses_data_row() {
        let words = vec![
            "!re".to_string(),
            "=.id=*1".to_string(),
            "=name=budi".to_string(),
            "=profile=10MB".to_string(),
        ];
        let reply = parse_reply(&words).unwrap();
        assert_eq!(reply.kind, ReplyKind::Re);
        assert_eq!(reply.attribute("name"), Some("budi"));
        assert_eq!(reply.attribute(".id"), Some("*1"));
        assert_eq!(reply.attribute("missing"), None);
    }

    #[test]
    fn parses_trap_message() {
        let words = vec![
            "!trap".to_string(),
            "=message=no such item".to_string(),
        ];
        let reply = parse_reply(&words).unwrap();
        assert_eq!(reply.kind, ReplyKind::Trap);
        assert_eq!(reply.message(), Some("no such item"));
    }

    #[test]
    fn rejects_garbage_reply() {
        assert!(parse_reply(&["hello".to_string()]).is_err());
        assert!(parse_reply(&[]).is_err());
    }
}
