//! Bencode value model used by nREPL framing.
//!
//! nREPL frames are bencoded dictionaries written back to back on the socket
//! with no outer length prefix, so a reader has to parse far enough to know
//! whether a complete value is buffered. [`decode`] reports that distinction
//! through [`DecodeError::Incomplete`].

use std::collections::BTreeMap;
use std::fmt;

use bytes::{BufMut, BytesMut};

/// Upper bound on a single string payload. Anything larger is treated as a
/// corrupt length prefix rather than something worth buffering.
pub const MAX_STRING_LEN: usize = 64 * 1024 * 1024;

/// Maximum nesting of lists/dicts accepted from the wire.
pub const MAX_DEPTH: usize = 64;

/// A decoded bencode value.
///
/// Byte strings are kept as UTF-8 `String`s (lossily converted) since every
/// field nREPL sends to a client is text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Why a buffer could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ends before the value does. More bytes may fix it.
    Incomplete,
    /// The bytes can never form a valid value.
    Malformed { offset: usize, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Incomplete => write!(f, "incomplete bencode value"),
            DecodeError::Malformed { offset, reason } => {
                write!(f, "{} at byte {}", reason, offset)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Append the encoding of `value` to `dst`. Dict keys come out sorted because
/// the map is ordered.
pub fn encode(value: &Value, dst: &mut BytesMut) {
    match value {
        Value::Int(i) => {
            dst.put_u8(b'i');
            dst.put_slice(i.to_string().as_bytes());
            dst.put_u8(b'e');
        }
        Value::Str(s) => encode_bytes(s.as_bytes(), dst),
        Value::List(items) => {
            dst.put_u8(b'l');
            for item in items {
                encode(item, dst);
            }
            dst.put_u8(b'e');
        }
        Value::Dict(map) => {
            dst.put_u8(b'd');
            for (key, item) in map {
                encode_bytes(key.as_bytes(), dst);
                encode(item, dst);
            }
            dst.put_u8(b'e');
        }
    }
}

fn encode_bytes(bytes: &[u8], dst: &mut BytesMut) {
    dst.put_slice(bytes.len().to_string().as_bytes());
    dst.put_u8(b':');
    dst.put_slice(bytes);
}

/// Decode one value from the front of `src`, returning it together with the
/// number of bytes it occupied. Trailing bytes are left for the next call.
pub fn decode(src: &[u8]) -> Result<(Value, usize), DecodeError> {
    let mut parser = Parser { src, pos: 0 };
    let value = parser.value(0)?;
    Ok((value, parser.pos))
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Result<u8, DecodeError> {
        self.src.get(self.pos).copied().ok_or(DecodeError::Incomplete)
    }

    fn malformed(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(self.malformed(format!("nesting deeper than {}", MAX_DEPTH)));
        }
        match self.peek()? {
            b'i' => self.int(),
            b'0'..=b'9' => self.string().map(Value::Str),
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut map = BTreeMap::new();
                while self.peek()? != b'e' {
                    if !self.peek()?.is_ascii_digit() {
                        return Err(self.malformed("dictionary key is not a string"));
                    }
                    let key = self.string()?;
                    let item = self.value(depth + 1)?;
                    map.insert(key, item);
                }
                self.pos += 1;
                Ok(Value::Dict(map))
            }
            other => Err(self.malformed(format!("unexpected byte {:?}", other as char))),
        }
    }

    fn int(&mut self) -> Result<Value, DecodeError> {
        self.pos += 1; // 'i'
        let start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let digits = &self.src[start..self.pos];
        let text = std::str::from_utf8(digits).map_err(|_| self.malformed("non-ascii integer"))?;
        let well_formed = match text.strip_prefix('-') {
            Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
            None => !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()),
        };
        if !well_formed {
            return Err(self.malformed(format!("invalid integer {:?}", text)));
        }
        let parsed = text
            .parse::<i64>()
            .map_err(|e| self.malformed(format!("integer {:?}: {}", text, e)))?;
        self.pos += 1; // 'e'
        Ok(Value::Int(parsed))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        loop {
            match self.peek()? {
                b':' => break,
                b'0'..=b'9' => self.pos += 1,
                other => {
                    return Err(self.malformed(format!(
                        "unexpected byte {:?} in string length",
                        other as char
                    )))
                }
            }
        }
        let len_text = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|_| self.malformed("non-ascii string length"))?;
        let len: usize = len_text
            .parse()
            .map_err(|_| self.malformed(format!("invalid string length {:?}", len_text)))?;
        if len > MAX_STRING_LEN {
            return Err(self.malformed(format!("string length {} exceeds limit", len)));
        }
        self.pos += 1; // ':'
        let end = self.pos + len;
        if end > self.src.len() {
            return Err(DecodeError::Incomplete);
        }
        let text = String::from_utf8_lossy(&self.src[self.pos..end]).into_owned();
        self.pos = end;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: &Value) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(value, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn encodes_dict_with_sorted_keys() {
        let mut map = BTreeMap::new();
        map.insert("op".to_string(), Value::from("eval"));
        map.insert("code".to_string(), Value::from("(+ 1 2)"));
        let bytes = encoded(&Value::Dict(map));
        assert_eq!(bytes, b"d4:code7:(+ 1 2)2:op4:evale".to_vec());
    }

    #[test]
    fn decodes_nested_values() {
        let (value, used) = decode(b"d6:statusl4:donee5:valuei-42ee").unwrap();
        assert_eq!(used, 30);
        let dict = value.as_dict().unwrap();
        let status = dict["status"].as_list().unwrap();
        assert_eq!(status, &[Value::from("done")]);
        assert_eq!(dict["value"].as_int(), Some(-42));
    }

    #[test]
    fn leaves_trailing_bytes_alone() {
        let (value, used) = decode(b"3:abc3:def").unwrap();
        assert_eq!(value, Value::from("abc"));
        assert_eq!(used, 5);
    }

    #[test]
    fn truncated_input_is_incomplete() {
        for partial in [&b"d"[..], b"d3:ou", b"d3:out5:ab", b"li1", b"10:short"] {
            assert_eq!(decode(partial), Err(DecodeError::Incomplete), "{:?}", partial);
        }
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode(b"x"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode(b"di1e3:fooe"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode(b"ie"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode(b"i-e"), Err(DecodeError::Malformed { .. })));
        assert!(matches!(decode(b"3x:abc"), Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn multibyte_text_uses_byte_lengths() {
        let value = Value::from("λx");
        let bytes = encoded(&value);
        assert_eq!(&bytes[..2], b"3:");
        assert_eq!(decode(&bytes).unwrap().0, value);
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut deep = Vec::new();
        deep.extend(std::iter::repeat(b'l').take(MAX_DEPTH + 2));
        deep.extend(std::iter::repeat(b'e').take(MAX_DEPTH + 2));
        assert!(matches!(decode(&deep), Err(DecodeError::Malformed { .. })));
    }
}
