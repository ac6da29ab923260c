//! OpenSSH public key syntax checks.
//!
//! A key line is `type base64-blob [comment]`. The blob is the SSH wire
//! encoding: a sequence of length-prefixed strings whose first entry repeats
//! the key type.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const RSA_MIN_BITS: usize = 1024;
const RSA_MAX_BITS: usize = 16384;
const DSA_ALLOWED_BITS: &[usize] = &[1024, 2048, 3072];
const ED25519_KEY_BYTES: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SshKeyError {
    #[error("Invalid/unrecognised key type: {0}")]
    UnsupportedType(String),

    #[error("Key too short: {bits} bits, minimum is {min}")]
    TooShort { bits: usize, min: usize },

    #[error("Key too long: {bits} bits, maximum is {max}")]
    TooLong { bits: usize, max: usize },

    #[error("Key length too short or too long for {key_type}: {length}")]
    InvalidLength { key_type: String, length: usize },

    #[error("Malformed data - key may be corrupted, truncated or include extra content: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    NistP256,
    NistP384,
    NistP521,
}

impl Curve {
    const fn identifier(self) -> &'static str {
        match self {
            Self::NistP256 => "nistp256",
            Self::NistP384 => "nistp384",
            Self::NistP521 => "nistp521",
        }
    }

    /// Length of an uncompressed point.
    const fn point_len(self) -> usize {
        match self {
            Self::NistP256 => 65,
            Self::NistP384 => 97,
            Self::NistP521 => 133,
        }
    }

    const fn bits(self) -> usize {
        match self {
            Self::NistP256 => 256,
            Self::NistP384 => 384,
            Self::NistP521 => 521,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Dsa,
    Ed25519,
    Ecdsa(Curve),
}

impl KeyType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ssh-rsa" => Some(Self::Rsa),
            "ssh-dss" => Some(Self::Dsa),
            "ssh-ed25519" => Some(Self::Ed25519),
            "ecdsa-sha2-nistp256" => Some(Self::Ecdsa(Curve::NistP256)),
            "ecdsa-sha2-nistp384" => Some(Self::Ecdsa(Curve::NistP384)),
            "ecdsa-sha2-nistp521" => Some(Self::Ecdsa(Curve::NistP521)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rsa => "ssh-rsa",
            Self::Dsa => "ssh-dss",
            Self::Ed25519 => "ssh-ed25519",
            Self::Ecdsa(Curve::NistP256) => "ecdsa-sha2-nistp256",
            Self::Ecdsa(Curve::NistP384) => "ecdsa-sha2-nistp384",
            Self::Ecdsa(Curve::NistP521) => "ecdsa-sha2-nistp521",
        }
    }
}

/// What a successfully parsed key turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub key_type: KeyType,
    pub bits: usize,
    pub comment: Option<String>,
}

struct WireReader<'a> {
    data: &'a [u8],
}

impl<'a> WireReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn string(&mut self, field: &str) -> Result<&'a [u8], SshKeyError> {
        let truncated = || SshKeyError::Malformed(format!("truncated {field}"));

        if self.data.len() < 4 {
            return Err(truncated());
        }
        let (len_bytes, rest) = self.data.split_at(4);
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        if rest.len() < len {
            return Err(truncated());
        }
        let (value, rest) = rest.split_at(len);
        self.data = rest;
        Ok(value)
    }

    fn finish(self) -> Result<(), SshKeyError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(SshKeyError::Malformed(format!(
                "{} unexpected trailing bytes",
                self.data.len()
            )))
        }
    }
}

/// Bit length of an SSH mpint, ignoring sign padding.
fn mpint_bits(value: &[u8]) -> usize {
    let Some(start) = value.iter().position(|b| *b != 0) else {
        return 0;
    };
    let significant = &value[start..];
    (significant.len() - 1) * 8 + (8 - significant[0].leading_zeros() as usize)
}

pub fn validate_ssh_key(key: &str) -> Result<PublicKeyInfo, SshKeyError> {
    let mut fields = key.split_whitespace();

    let declared = fields
        .next()
        .ok_or_else(|| SshKeyError::Malformed("empty key".to_string()))?;
    let key_type =
        KeyType::from_name(declared).ok_or_else(|| SshKeyError::UnsupportedType(declared.to_string()))?;

    let encoded = fields
        .next()
        .ok_or_else(|| SshKeyError::Malformed("missing key data".to_string()))?;

    let comment = fields.collect::<Vec<_>>().join(" ");
    let comment = (!comment.is_empty()).then_some(comment);

    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| SshKeyError::Malformed(e.to_string()))?;

    let mut reader = WireReader::new(&blob);
    let embedded = reader.string("key type")?;
    if embedded != declared.as_bytes() {
        return Err(SshKeyError::Malformed(format!(
            "key data is for {} but line says {declared}",
            String::from_utf8_lossy(embedded)
        )));
    }

    let bits = match key_type {
        KeyType::Rsa => {
            let _exponent = reader.string("RSA exponent")?;
            let bits = mpint_bits(reader.string("RSA modulus")?);
            if bits < RSA_MIN_BITS {
                return Err(SshKeyError::TooShort {
                    bits,
                    min: RSA_MIN_BITS,
                });
            }
            if bits > RSA_MAX_BITS {
                return Err(SshKeyError::TooLong {
                    bits,
                    max: RSA_MAX_BITS,
                });
            }
            bits
        }
        KeyType::Dsa => {
            let bits = mpint_bits(reader.string("DSA p")?);
            reader.string("DSA q")?;
            reader.string("DSA g")?;
            reader.string("DSA y")?;
            if !DSA_ALLOWED_BITS.contains(&bits) {
                return Err(SshKeyError::InvalidLength {
                    key_type: key_type.name().to_string(),
                    length: bits,
                });
            }
            bits
        }
        KeyType::Ed25519 => {
            let public = reader.string("Ed25519 key")?;
            if public.len() != ED25519_KEY_BYTES {
                return Err(SshKeyError::InvalidLength {
                    key_type: key_type.name().to_string(),
                    length: public.len() * 8,
                });
            }
            256
        }
        KeyType::Ecdsa(curve) => {
            let identifier = reader.string("curve identifier")?;
            if identifier != curve.identifier().as_bytes() {
                return Err(SshKeyError::Malformed(format!(
                    "curve {} does not match {}",
                    String::from_utf8_lossy(identifier),
                    key_type.name()
                )));
            }
            let point = reader.string("curve point")?;
            if point.len() != curve.point_len() {
                return Err(SshKeyError::InvalidLength {
                    key_type: key_type.name().to_string(),
                    length: point.len(),
                });
            }
            if point[0] != 0x04 {
                return Err(SshKeyError::Malformed(
                    "only uncompressed curve points are supported".to_string(),
                ));
            }
            curve.bits()
        }
    };

    reader.finish()?;

    Ok(PublicKeyInfo {
        key_type,
        bits,
        comment,
    })
}
