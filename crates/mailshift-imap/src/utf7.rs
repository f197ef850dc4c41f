//! Modified UTF-7 folder name codec (RFC 3501, section 5.1.3)

use base64::alphabet::IMAP_MUTF7;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Malformed modified UTF-7 input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Utf7Error {
    /// A `&` shift was never closed with `-`
    #[error("unterminated shift sequence at byte {0}")]
    Unterminated(usize),

    /// Shifted section is not valid modified base64
    #[error("invalid base64 in shift sequence at byte {0}")]
    InvalidBase64(usize),

    /// Shifted section does not decode to UTF-16
    #[error("invalid UTF-16 in shift sequence at byte {0}")]
    InvalidUtf16(usize),

    /// Shifted section holds characters that must be sent directly
    #[error("redundant shift sequence at byte {0}")]
    RedundantShift(usize),

    /// Character that must have been shifted appears directly
    #[error("unencoded character {0:?} at byte {1}")]
    UnencodedCharacter(char, usize),
}

/// Decode a wire folder name into text
///
/// The input is checked against RFC 3501 first; the utf7-imap decoder
/// assumes well-formed names.
pub fn decode_modified_utf7(input: &str) -> Result<String, Utf7Error> {
    validate(input)?;
    Ok(utf7_imap::decode_utf7_imap(input.to_string()))
}

/// Encode text into its wire folder name
pub fn encode_modified_utf7(input: &str) -> String {
    utf7_imap::encode_utf7_imap(input.to_string())
}

fn validate(input: &str) -> Result<(), Utf7Error> {
    let mut offset = 0;

    while offset < input.len() {
        let rest = &input[offset..];
        let Some(shift) = rest.find('&') else {
            check_direct(rest, offset)?;
            break;
        };

        check_direct(&rest[..shift], offset)?;

        let start = offset + shift;
        let encoded_start = start + 1;
        let end = input[encoded_start..]
            .find('-')
            .map(|i| encoded_start + i)
            .ok_or(Utf7Error::Unterminated(start))?;

        let encoded = &input[encoded_start..end];
        if !encoded.is_empty() {
            check_shifted(encoded, start)?;
        }

        offset = end + 1;
    }

    Ok(())
}

fn is_direct(c: char) -> bool {
    (' '..='~').contains(&c)
}

fn check_direct(text: &str, offset: usize) -> Result<(), Utf7Error> {
    match text.char_indices().find(|(_, c)| !is_direct(*c)) {
        Some((i, c)) => Err(Utf7Error::UnencodedCharacter(c, offset + i)),
        None => Ok(()),
    }
}

fn check_shifted(encoded: &str, at: usize) -> Result<(), Utf7Error> {
    let bytes = MUTF7
        .decode(encoded)
        .map_err(|_| Utf7Error::InvalidBase64(at))?;

    if bytes.len() % 2 != 0 {
        return Err(Utf7Error::InvalidUtf16(at));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    let text = String::from_utf16(&units).map_err(|_| Utf7Error::InvalidUtf16(at))?;
    if text.chars().any(is_direct) {
        return Err(Utf7Error::RedundantShift(at));
    }
    Ok(())
}
