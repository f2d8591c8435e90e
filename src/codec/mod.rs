//! # Legacy Charset Codec
//!
//! Converts between the terminal's native single/double-byte encoding
//! (Shift_JIS by default) and Rust strings. The terminal cannot handle
//! conversion errors, so neither direction ever fails:
//!
//! - `decode` falls back to a byte-preserving 1:1 mapping (each byte becomes
//!   the code point of the same value) whenever the legacy decoding reports
//!   an invalid sequence, so no inbound frame is ever rejected.
//! - `encode` substitutes `?` for characters the legacy charset cannot
//!   represent. When no legacy encoding is configured (unknown label), a
//!   7-bit ASCII transliteration with the same replacement policy is used.
//!
//! Encoded output never contains the frame terminator byte: the only
//! character that would produce it (U+0004) is replaced like an unmappable.

use encoding_rs::Encoding;

use crate::protocol::FRAME_TERMINATOR;

/// Replacement byte for characters the target charset cannot express.
const REPLACEMENT: u8 = b'?';

/// Charset converter for one serial peer. Cheap to copy; holds only a
/// reference to a statically known encoding (or none for the ASCII fallback).
#[derive(Debug, Clone, Copy)]
pub struct LegacyCodec {
    encoding: Option<&'static Encoding>,
}

impl LegacyCodec {
    /// Resolve a codec from a WHATWG encoding label such as `"shift_jis"`.
    /// Unknown labels yield the ASCII transliteration fallback rather than
    /// an error; the bridge must always be able to produce some byte stream.
    pub fn for_label(label: &str) -> Self {
        Self {
            encoding: Encoding::for_label(label.trim().as_bytes()),
        }
    }

    /// Name of the active encoding, for startup logging.
    pub fn name(&self) -> &'static str {
        self.encoding.map(|e| e.name()).unwrap_or("US-ASCII (fallback)")
    }

    /// Whether a real legacy encoding resolved (false means ASCII fallback).
    pub fn is_fallback(&self) -> bool {
        self.encoding.is_none()
    }

    /// Decode frame payload bytes into text. Never fails: invalid sequences
    /// switch the whole payload to the byte-preserving 1:1 mapping so the
    /// backend still sees something reversible rather than U+FFFD soup.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if let Some(encoding) = self.encoding {
            let (text, _, had_errors) = encoding.decode(bytes);
            if !had_errors {
                return text.into_owned();
            }
        }
        bytes.iter().map(|&b| b as char).collect()
    }

    /// Encode text into frame payload bytes. Never fails: unmappable
    /// characters become `?`, as does U+0004, which would otherwise encode
    /// to the frame terminator and corrupt the frame boundary.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        match self.encoding {
            Some(encoding) => {
                let mut buf = [0u8; 4];
                for ch in text.chars() {
                    if ch == FRAME_TERMINATOR as char {
                        out.push(REPLACEMENT);
                        continue;
                    }
                    let (bytes, _, had_errors) = encoding.encode(ch.encode_utf8(&mut buf));
                    if had_errors {
                        out.push(REPLACEMENT);
                    } else {
                        out.extend_from_slice(&bytes);
                    }
                }
            }
            None => {
                for ch in text.chars() {
                    if ch.is_ascii() && ch != FRAME_TERMINATOR as char {
                        out.push(ch as u8);
                    } else {
                        out.push(REPLACEMENT);
                    }
                }
            }
        }
        out
    }
}

impl Default for LegacyCodec {
    fn default() -> Self {
        Self::for_label("shift_jis")
    }
}

#[cfg(test)]
mod tests {
    use super::LegacyCodec;

    #[test]
    fn resolves_shift_jis_label() {
        let codec = LegacyCodec::for_label("shift_jis");
        assert_eq!(codec.name(), "Shift_JIS");
        assert!(!codec.is_fallback());
    }

    #[test]
    fn unknown_label_falls_back_to_ascii() {
        let codec = LegacyCodec::for_label("x68000-internal");
        assert!(codec.is_fallback());
        assert_eq!(codec.encode("abcこ"), b"abc?".to_vec());
    }

    #[test]
    fn decodes_shift_jis_kana() {
        let codec = LegacyCodec::default();
        // "こんにちは" in Shift_JIS
        let bytes = [0x82, 0xb1, 0x82, 0xf1, 0x82, 0xc9, 0x82, 0xbf, 0x82, 0xcd];
        assert_eq!(codec.decode(&bytes), "こんにちは");
    }

    #[test]
    fn invalid_sequence_decodes_byte_preserving() {
        let codec = LegacyCodec::default();
        // 0x82 starts a double-byte sequence; 0xFF is not a valid trail byte here.
        let bytes = [b'H', b'i', 0x82, 0xff];
        let text = codec.decode(&bytes);
        assert_eq!(text, "Hi\u{82}\u{ff}");
        // 1:1 mapping is reversible back to code point values
        let roundtrip: Vec<u8> = text.chars().map(|c| c as u8).collect();
        assert_eq!(roundtrip, bytes);
    }

    #[test]
    fn encodes_ascii_and_kana() {
        let codec = LegacyCodec::default();
        assert_eq!(codec.encode("Hello"), b"Hello".to_vec());
        assert_eq!(codec.encode("こ"), vec![0x82, 0xb1]);
    }

    #[test]
    fn unmappable_char_becomes_replacement() {
        let codec = LegacyCodec::default();
        // U+1F600 is not representable in Shift_JIS
        assert_eq!(codec.encode("a\u{1F600}b"), b"a?b".to_vec());
    }

    #[test]
    fn terminator_char_never_reaches_output() {
        let codec = LegacyCodec::default();
        let bytes = codec.encode("a\u{04}b");
        assert_eq!(bytes, b"a?b".to_vec());
        assert!(!bytes.contains(&0x04));
    }

    #[test]
    fn empty_input_encodes_empty() {
        let codec = LegacyCodec::default();
        assert!(codec.encode("").is_empty());
        assert_eq!(codec.decode(&[]), "");
    }
}
