//! Strict decoder for the transaction envelope wire encoding.
//!
//! The format is a small self-describing grammar: `n` null, `t`/`f` booleans,
//! `i<digits>e` integers, `<len>:<bytes>` byte strings, `u<len>:<text>` UTF-8
//! strings, `l...e` lists, and `d...e` dictionaries keyed by strings. Only
//! enough of the envelope is interpreted to reach the signer field; everything
//! else is carried opaquely.

use crate::domain::error::CodecError;

/// Containers nested past this depth are rejected
const MAX_DEPTH: usize = 64;

/// A decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Value>),
    Dict(Vec<(Key, Value)>),
}

/// Dictionary key: byte string or text string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    /// Look up a byte-string key in a dictionary value.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries.iter().find_map(|(k, v)| match k {
                Key::Bytes(bytes) if bytes == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Key, Value)]> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Decode a single value; trailing bytes are an error.
pub fn decode(input: &[u8]) -> Result<Value, CodecError> {
    let mut decoder = Decoder { input, pos: 0 };
    let value = decoder.value(0)?;
    let rest = input.len() - decoder.pos;
    if rest != 0 {
        return Err(CodecError::TrailingBytes(rest));
    }
    Ok(value)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8, CodecError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEnd)
    }

    fn bump(&mut self) -> Result<u8, CodecError> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let available = self.input.len() - self.pos;
        if len > available {
            return Err(CodecError::LengthOverrun {
                wanted: len,
                available,
            });
        }
        let slice = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep(MAX_DEPTH));
        }

        match self.peek()? {
            b'n' => {
                self.pos += 1;
                Ok(Value::Null)
            }
            b't' => {
                self.pos += 1;
                Ok(Value::Bool(true))
            }
            b'f' => {
                self.pos += 1;
                Ok(Value::Bool(false))
            }
            b'i' => {
                self.pos += 1;
                self.integer()
            }
            b'u' => {
                self.pos += 1;
                self.text().map(Value::Text)
            }
            b'0'..=b'9' => self.byte_string().map(Value::Bytes),
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
                let mut entries = Vec::new();
                while self.peek()? != b'e' {
                    let key = self.key()?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                self.pos += 1;
                Ok(Value::Dict(entries))
            }
            other => Err(CodecError::UnknownToken(other)),
        }
    }

    fn key(&mut self) -> Result<Key, CodecError> {
        match self.peek()? {
            b'0'..=b'9' => self.byte_string().map(Key::Bytes),
            b'u' => {
                self.pos += 1;
                self.text().map(Key::Text)
            }
            _ => Err(CodecError::BadKey),
        }
    }

    /// Digits after the opening `i`, terminated by `e`.
    fn integer(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let digits =
            std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| CodecError::BadInteger)?;
        self.pos += 1; // consume 'e'
        let n = digits.parse::<i64>().map_err(|_| CodecError::BadInteger)?;
        Ok(Value::Integer(n))
    }

    /// Decimal length prefix terminated by `:`.
    fn length(&mut self) -> Result<usize, CodecError> {
        let start = self.pos;
        while self.peek()?.is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == start || self.bump()? != b':' {
            return Err(CodecError::BadLength);
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos - 1])
            .map_err(|_| CodecError::BadLength)?;
        digits.parse::<usize>().map_err(|_| CodecError::BadLength)
    }

    fn byte_string(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.length()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Body after the opening `u`.
    fn text(&mut self) -> Result<String, CodecError> {
        let len = self.length()?;
        let bytes = self.take(len)?;
        let text = std::str::from_utf8(bytes)?;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_str(bytes: &[u8]) -> Vec<u8> {
        let mut out = format!("{}:", bytes.len()).into_bytes();
        out.extend_from_slice(bytes);
        out
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(b"n").unwrap(), Value::Null);
        assert_eq!(decode(b"t").unwrap(), Value::Bool(true));
        assert_eq!(decode(b"f").unwrap(), Value::Bool(false));
        assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
        assert_eq!(decode(b"i-7e").unwrap(), Value::Integer(-7));
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_decode_strings() {
        assert_eq!(decode(b"3:abc").unwrap(), Value::Bytes(b"abc".to_vec()));
        assert_eq!(decode(b"0:").unwrap(), Value::Bytes(vec![]));
        assert_eq!(
            decode(b"u5:hello").unwrap(),
            Value::Text("hello".to_string())
        );
    }

    #[test]
    fn test_decode_containers() {
        assert_eq!(
            decode(b"li1ei2ee").unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(decode(b"le").unwrap(), Value::List(vec![]));

        let dict = decode(b"d1:ai1e1:bli2eee").unwrap();
        assert_eq!(dict.get(b"a"), Some(&Value::Integer(1)));
        assert_eq!(
            dict.get(b"b"),
            Some(&Value::List(vec![Value::Integer(2)]))
        );
        assert_eq!(dict.get(b"c"), None);
    }

    #[test]
    fn test_decode_text_keys() {
        let dict = decode(b"du1:xi9ee").unwrap();
        let entries = dict.as_dict().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Key::Text("x".to_string()));
        // Byte-key lookup does not match text keys
        assert_eq!(dict.get(b"x"), None);
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(decode(b""), Err(CodecError::UnexpectedEnd)));
        assert!(matches!(decode(b"i42"), Err(CodecError::UnexpectedEnd)));
        assert!(matches!(decode(b"li1e"), Err(CodecError::UnexpectedEnd)));
        assert!(matches!(
            decode(b"5:abc"),
            Err(CodecError::LengthOverrun {
                wanted: 5,
                available: 3
            })
        ));
    }

    #[test]
    fn test_bad_tokens() {
        assert!(matches!(decode(b"x"), Err(CodecError::UnknownToken(b'x'))));
        assert!(matches!(decode(b"di1ei2ee"), Err(CodecError::BadKey)));
    }

    #[test]
    fn test_bad_numbers() {
        assert!(matches!(decode(b"ie"), Err(CodecError::BadInteger)));
        assert!(matches!(decode(b"iabce"), Err(CodecError::BadInteger)));
        // One past i64::MAX
        assert!(matches!(
            decode(b"i9223372036854775808e"),
            Err(CodecError::BadInteger)
        ));
        assert!(matches!(decode(b":abc"), Err(CodecError::UnknownToken(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert!(matches!(decode(b"i1ei2e"), Err(CodecError::TrailingBytes(3))));
        assert!(matches!(decode(b"n "), Err(CodecError::TrailingBytes(1))));
    }

    #[test]
    fn test_depth_guard() {
        let mut deep = vec![b'l'; 80];
        deep.extend(vec![b'e'; 80]);
        assert!(matches!(
            decode(&deep),
            Err(CodecError::NestingTooDeep(_))
        ));
    }

    #[test]
    fn test_nested_dict_roundtrip_shape() {
        let mut input = vec![b'd'];
        input.extend(byte_str(b"k"));
        input.push(b'd');
        input.extend(byte_str(b"inner"));
        input.extend(byte_str(&[0xde, 0xad]));
        input.push(b'e');
        input.push(b'e');

        let value = decode(&input).unwrap();
        let inner = value.get(b"k").unwrap();
        assert_eq!(inner.get(b"inner").unwrap().as_bytes(), Some(&[0xde, 0xad][..]));
    }
}
