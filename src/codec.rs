//! Dotted-decimal IPv4 codec.
//!
//! Text addresses are validated and packed into `u32` so that the dedup
//! stage can index a dense bitmap instead of hashing strings. All three
//! operations are pure: no allocation on the validate/encode path beyond
//! what `decode` returns.
//!
//! # Validity rule
//!
//! A token is a valid address iff it splits into exactly four
//! dot-separated segments, each consisting solely of ASCII digits and
//! parsing to a value in `0..=255`. Leading zeros are accepted
//! (`010.0.0.1` is valid) and normalized away by `decode(encode(..))`.

/// Returns `true` iff `text` is a valid dotted-decimal IPv4 address.
///
/// Pure predicate: no side effects, stable across repeated calls.
#[inline]
pub fn validate(text: &str) -> bool {
    encode(text).is_some()
}

/// Packs a dotted-decimal address into a big-endian `u32`.
///
/// Returns `None` when `text` is not a valid address, so this doubles as
/// the validation path for tokens that skipped upstream validation
/// (boundary-merged fragments go through here unchecked).
pub fn encode(text: &str) -> Option<u32> {
    let mut packed: u32 = 0;
    let mut segments = 0usize;
    for segment in text.split('.') {
        segments += 1;
        if segments > 4 {
            return None;
        }
        let octet = parse_octet(segment)?;
        packed = (packed << 8) | u32::from(octet);
    }
    if segments == 4 {
        Some(packed)
    } else {
        None
    }
}

/// Formats a packed address back to canonical dotted-decimal text.
///
/// Always succeeds; output has no leading zeros, so for any valid input
/// `decode(encode(s))` yields the normalized form of `s`.
pub fn decode(addr: u32) -> String {
    let [a, b, c, d] = addr.to_be_bytes();
    format!("{}.{}.{}.{}", a, b, c, d)
}

/// Parses one octet segment: ASCII digits only, value in `0..=255`.
///
/// Segments longer than three digits can still be valid (`0255`), so the
/// length cap below only guards the `u32` accumulator against overflow.
fn parse_octet(segment: &str) -> Option<u8> {
    if segment.is_empty() || segment.len() > 9 {
        return None;
    }
    let mut value: u32 = 0;
    for byte in segment.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(byte - b'0');
    }
    u8::try_from(value).ok()
}
