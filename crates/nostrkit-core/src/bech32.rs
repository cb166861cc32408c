//! Bech32 encoding for human-shareable keys and event ids.
//!
//! Implements the BIP-173 checksum over payloads of any length. There is no
//! 90-character cap: a 512-byte payload encodes and decodes like a 32-byte one.
//!
//! Three address families sit on top of the generic codec:
//!
//! | Kind                         | Prefix | Payload          |
//! |------------------------------|--------|------------------|
//! | [`AddressKind::PublicKey`]   | `npub` | x-only key       |
//! | [`AddressKind::SecretKey`]   | `nsec` | secret scalar    |
//! | [`AddressKind::EventId`]     | `note` | event id         |

use thiserror::Error;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
const SEPARATOR: char = '1';
const CHECKSUM_LEN: usize = 6;

/// Errors produced while decoding (or validating the prefix for) a bech32 string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bech32 string mixes upper and lower case")]
    MixedCase,

    #[error("missing separator '1'")]
    MissingSeparator,

    #[error("invalid human-readable prefix")]
    InvalidPrefix,

    #[error("invalid bech32 character {0:?}")]
    InvalidCharacter(char),

    #[error("invalid checksum")]
    InvalidChecksum,

    #[error("non-zero or overlong padding bits")]
    InvalidPadding,

    #[error("wrong prefix: expected {expected}, found {found}")]
    WrongPrefix { expected: &'static str, found: String },

    #[error("invalid payload length: expected {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },
}

/// The address families encoded as 32-byte bech32 payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    PublicKey,
    SecretKey,
    EventId,
}

impl AddressKind {
    /// The human-readable prefix for this family.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::PublicKey => "npub",
            Self::SecretKey => "nsec",
            Self::EventId => "note",
        }
    }

    /// All address families.
    pub const ALL: [Self; 3] = [Self::PublicKey, Self::SecretKey, Self::EventId];
}

/// Encode `data` under the human-readable prefix `hrp`.
///
/// The prefix is lower-cased; it must be non-empty printable ASCII.
pub fn encode(hrp: &str, data: &[u8]) -> Result<String, DecodeError> {
    validate_prefix(hrp)?;
    Ok(encode_unchecked(&hrp.to_ascii_lowercase(), data))
}

/// Decode a bech32 string into its prefix and payload bytes.
pub fn decode(s: &str) -> Result<(String, Vec<u8>), DecodeError> {
    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(DecodeError::MixedCase);
    }

    let s = s.to_ascii_lowercase();
    let pos = s.rfind(SEPARATOR).ok_or(DecodeError::MissingSeparator)?;
    let (hrp, rest) = (&s[..pos], &s[pos + 1..]);
    validate_prefix(hrp)?;

    if rest.len() < CHECKSUM_LEN {
        return Err(DecodeError::InvalidChecksum);
    }

    let mut values = Vec::with_capacity(rest.len());
    for c in rest.chars() {
        let index = CHARSET
            .iter()
            .position(|&symbol| char::from(symbol) == c)
            .ok_or(DecodeError::InvalidCharacter(c))?;
        values.push(index as u8);
    }

    if !verify_checksum(hrp, &values) {
        return Err(DecodeError::InvalidChecksum);
    }

    let data = &values[..values.len() - CHECKSUM_LEN];
    let bytes = convert_bits(data, 5, 8, false)?;
    Ok((hrp.to_string(), bytes))
}

/// Encode a 32-byte payload as an address of the given family.
pub fn encode_address(kind: AddressKind, bytes: &[u8; 32]) -> String {
    encode_unchecked(kind.prefix(), bytes)
}

/// Decode an address of the given family back to its 32-byte payload.
pub fn decode_address(kind: AddressKind, s: &str) -> Result<[u8; 32], DecodeError> {
    let (hrp, data) = decode(s)?;
    if hrp != kind.prefix() {
        return Err(DecodeError::WrongPrefix {
            expected: kind.prefix(),
            found: hrp,
        });
    }

    data.as_slice()
        .try_into()
        .map_err(|_| DecodeError::InvalidLength {
            expected: 32,
            found: data.len(),
        })
}

fn encode_unchecked(hrp: &str, data: &[u8]) -> String {
    // 8 -> 5 regrouping always succeeds when padding is allowed.
    let values = convert_bits(data, 8, 5, true).unwrap_or_default();
    let checksum = create_checksum(hrp, &values);

    let mut out = String::with_capacity(hrp.len() + 1 + values.len() + CHECKSUM_LEN);
    out.push_str(hrp);
    out.push(SEPARATOR);
    for v in values.iter().chain(checksum.iter()) {
        out.push(char::from(CHARSET[usize::from(*v)]));
    }
    out
}

fn validate_prefix(hrp: &str) -> Result<(), DecodeError> {
    if hrp.is_empty() || !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(DecodeError::InvalidPrefix);
    }
    Ok(())
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &v in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(v);
        for (i, g) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2 + 1);
    out.extend(bytes.iter().map(|b| b >> 5));
    out.push(0);
    out.extend(bytes.iter().map(|b| b & 31));
    out
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let pm = polymod(&values) ^ 1;

    let mut out = [0u8; CHECKSUM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((pm >> (5 * (5 - i))) & 31) as u8;
    }
    out
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    polymod(&values) == 1
}

/// Regroup a sequence of `from`-bit values into `to`-bit values, MSB first.
///
/// With `pad` the trailing group is zero-filled. Without it, leftover bits
/// must be fewer than `from` and all zero.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, DecodeError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value: u32 = (1 << to) - 1;
    let max_acc: u32 = (1 << (from + to - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        acc = ((acc << from) | u32::from(value)) & max_acc;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return Err(DecodeError::InvalidPadding);
    }

    Ok(out)
}
