//! Minimal Solidity ABI codec covering the game's contract calls.
//!
//! Arguments are laid out head/tail: static values sit in 32-byte head words,
//! dynamic values (strings, arrays) leave an offset in the head and append
//! their payload to the tail. `uint256` values are carried as `u128`; words
//! with any of the upper 16 bytes set are rejected on decode.
use thiserror::Error;

use crate::address::{Address, AddressError};
use crate::constants::ABI_WORD;

pub use crate::address::{from_hex, to_hex};

pub type Selector = [u8; 4];

/// Function selectors (first four bytes of the keccak-256 of the signature).
pub mod selectors {
    use super::Selector;

    /// `balanceOf(address)`
    pub const BALANCE_OF: Selector = [0x70, 0xa0, 0x82, 0x31];
    /// `getCharacter(uint256)`
    pub const GET_CHARACTER: Selector = [0xda, 0xbb, 0x05, 0x31];
    /// `charactersOf(address)`
    pub const CHARACTERS_OF: Selector = [0xa0, 0xa7, 0x6e, 0xb0];
    /// `ownerOf(uint256)`
    pub const OWNER_OF: Selector = [0x63, 0x52, 0x21, 0x1e];
    /// `mintPrice()`
    pub const MINT_PRICE: Selector = [0x68, 0x17, 0xc7, 0x6c];
    /// `mintCharacter(string,uint256)`
    pub const MINT_CHARACTER: Selector = [0x2c, 0xa0, 0xf9, 0xe1];
    /// `levelUp(uint256)`
    pub const LEVEL_UP: Selector = [0x0c, 0xe9, 0x0e, 0xc2];
    /// `evolve(uint256)`
    pub const EVOLVE: Selector = [0xf1, 0x19, 0xf5, 0x67];
    /// `transfer(address,uint256)`
    pub const TRANSFER: Selector = [0xa9, 0x05, 0x9c, 0xbb];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("return data truncated: need {needed} bytes at offset {offset}, have {len}")]
    Truncated { offset: usize, needed: usize, len: usize },
    #[error("uint256 value does not fit in 128 bits")]
    Overflow,
    #[error("word is not a valid address")]
    BadAddress,
    #[error("word is not a valid bool")]
    BadBool,
    #[error("dynamic offset {0} is out of range")]
    BadOffset(usize),
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("calldata is shorter than a selector")]
    MissingSelector,
    #[error(transparent)]
    Hex(#[from] AddressError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Bool(bool),
    String(String),
    UintArray(Vec<u128>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Uint,
    Address,
    Bool,
    String,
    UintArray,
}

impl ParamKind {
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::String | Self::UintArray)
    }
}

impl Token {
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Uint(_) => ParamKind::Uint,
            Self::Address(_) => ParamKind::Address,
            Self::Bool(_) => ParamKind::Bool,
            Self::String(_) => ParamKind::String,
            Self::UintArray(_) => ParamKind::UintArray,
        }
    }

    #[must_use]
    pub const fn as_uint(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uint_array(&self) -> Option<&[u128]> {
        match self {
            Self::UintArray(v) => Some(v),
            _ => None,
        }
    }
}

fn uint_word(value: u128) -> [u8; ABI_WORD] {
    let mut word = [0_u8; ABI_WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; ABI_WORD] {
    let mut word = [0_u8; ABI_WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn usize_word(value: usize) -> [u8; ABI_WORD] {
    uint_word(value as u128)
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(ABI_WORD) * ABI_WORD
}

fn encode_tail(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::String(s) => {
            out.extend_from_slice(&usize_word(s.len()));
            out.extend_from_slice(s.as_bytes());
            out.resize(out.len() + padded_len(s.len()) - s.len(), 0);
        }
        Token::UintArray(values) => {
            out.extend_from_slice(&usize_word(values.len()));
            for v in values {
                out.extend_from_slice(&uint_word(*v));
            }
        }
        Token::Uint(_) | Token::Address(_) | Token::Bool(_) => {}
    }
}

/// ABI-encode `tokens` as a tuple (no selector).
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * ABI_WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        match token {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Address(a) => head.extend_from_slice(&address_word(a)),
            Token::Bool(b) => head.extend_from_slice(&uint_word(u128::from(*b))),
            Token::String(_) | Token::UintArray(_) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                encode_tail(token, &mut tail);
            }
        }
    }
    head.extend_from_slice(&tail);
    head
}

/// Calldata for a function call: selector followed by the encoded arguments.
#[must_use]
pub fn encode_call(selector: Selector, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

/// Split calldata into its selector and argument bytes.
///
/// # Errors
///
/// Returns `MissingSelector` for calldata shorter than four bytes.
pub fn split_selector(calldata: &[u8]) -> Result<(Selector, &[u8]), AbiError> {
    let (sel, args) = calldata
        .split_first_chunk::<4>()
        .ok_or(AbiError::MissingSelector)?;
    Ok((*sel, args))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(ABI_WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::Truncated {
            offset,
            needed: ABI_WORD,
            len: data.len(),
        })
}

fn read_uint(word: &[u8]) -> Result<u128, AbiError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

fn read_usize(word: &[u8]) -> Result<usize, AbiError> {
    let value = read_uint(word)?;
    usize::try_from(value).map_err(|_| AbiError::Overflow)
}

fn read_address(word: &[u8]) -> Result<Address, AbiError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::BadAddress);
    }
    let mut bytes = [0_u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::from_bytes(bytes))
}

fn read_bool(word: &[u8]) -> Result<bool, AbiError> {
    match read_uint(word) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        _ => Err(AbiError::BadBool),
    }
}

fn read_dynamic(kind: ParamKind, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    if offset >= data.len() {
        return Err(AbiError::BadOffset(offset));
    }
    let len = read_usize(word_at(data, offset)?)?;
    let start = offset + ABI_WORD;
    match kind {
        ParamKind::String => {
            let bytes = start
                .checked_add(len)
                .and_then(|end| data.get(start..end))
                .ok_or(AbiError::Truncated {
                    offset: start,
                    needed: len,
                    len: data.len(),
                })?;
            let text = std::str::from_utf8(bytes).map_err(|_| AbiError::InvalidUtf8)?;
            Ok(Token::String(text.to_string()))
        }
        ParamKind::UintArray => {
            let needed = len.checked_mul(ABI_WORD).ok_or(AbiError::Overflow)?;
            if start.checked_add(needed).is_none_or(|end| end > data.len()) {
                return Err(AbiError::Truncated {
                    offset: start,
                    needed,
                    len: data.len(),
                });
            }
            let values = (0..len)
                .map(|i| read_uint(word_at(data, start + i * ABI_WORD)?))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Token::UintArray(values))
        }
        ParamKind::Uint | ParamKind::Address | ParamKind::Bool => Err(AbiError::BadOffset(offset)),
    }
}

/// Decode a tuple of `kinds` from return data (or from arguments with the
/// selector stripped).
///
/// # Errors
///
/// Fails on truncated data, out-of-range offsets, values that overflow
/// `u128`, malformed addresses or bools, and non-UTF-8 strings.
pub fn decode(kinds: &[ParamKind], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let word = word_at(data, i * ABI_WORD)?;
            match kind {
                ParamKind::Uint => read_uint(word).map(Token::Uint),
                ParamKind::Address => read_address(word).map(Token::Address),
                ParamKind::Bool => read_bool(word).map(Token::Bool),
                ParamKind::String | ParamKind::UintArray => {
                    read_dynamic(*kind, data, read_usize(word)?)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_keccak::{Hasher, Keccak};

    fn selector_of(signature: &str) -> Selector {
        let mut hasher = Keccak::v256();
        hasher.update(signature.as_bytes());
        let mut digest = [0_u8; 32];
        hasher.finalize(&mut digest);
        [digest[0], digest[1], digest[2], digest[3]]
    }

    fn addr() -> Address {
        "0x00000000000000000000000000000000deadbeef".parse().unwrap()
    }

    #[test]
    fn transfer_calldata_matches_erc20_layout() {
        let data = encode_call(
            selectors::TRANSFER,
            &[Token::Address(addr()), Token::Uint(1_000)],
        );
        assert_eq!(
            to_hex(&data),
            "a9059cbb\
             00000000000000000000000000000000000000000000000000000000deadbeef\
             00000000000000000000000000000000000000000000000000000000000003e8"
        );
    }

    #[test]
    fn strings_go_to_the_tail_with_padding() {
        let data = encode(&[Token::String("Aria".into()), Token::Uint(2)]);
        assert_eq!(data.len(), 4 * ABI_WORD);
        assert_eq!(read_usize(&data[..32]).unwrap(), 64);
        assert_eq!(read_usize(&data[64..96]).unwrap(), 4);
        assert_eq!(&data[96..100], b"Aria");
        assert!(data[100..].iter().all(|b| *b == 0));

        let decoded = decode(&[ParamKind::String, ParamKind::Uint], &data).unwrap();
        assert_eq!(decoded[0].as_str(), Some("Aria"));
        assert_eq!(decoded[1].as_uint(), Some(2));
    }

    #[test]
    fn uint_arrays_decode() {
        let data = encode(&[Token::UintArray(vec![7, 9, 11])]);
        let decoded = decode(&[ParamKind::UintArray], &data).unwrap();
        assert_eq!(decoded[0].as_uint_array(), Some(&[7_u128, 9, 11][..]));
    }

    #[test]
    fn oversized_uints_are_rejected() {
        let mut word = uint_word(5).to_vec();
        word[0] = 1;
        assert_eq!(decode(&[ParamKind::Uint], &word), Err(AbiError::Overflow));
    }

    #[test]
    fn malformed_words_are_rejected() {
        let mut word = address_word(&addr()).to_vec();
        word[0] = 0xff;
        assert_eq!(decode(&[ParamKind::Address], &word), Err(AbiError::BadAddress));
        assert_eq!(
            decode(&[ParamKind::Bool], &uint_word(2)),
            Err(AbiError::BadBool)
        );
        assert!(matches!(
            decode(&[ParamKind::Uint, ParamKind::Uint], &uint_word(1)),
            Err(AbiError::Truncated { offset: 32, .. })
        ));
        assert_eq!(
            decode(&[ParamKind::String], &uint_word(4096)),
            Err(AbiError::BadOffset(4096))
        );
    }

    #[test]
    fn selectors_match_keccak_of_signatures() {
        let table = [
            ("balanceOf(address)", selectors::BALANCE_OF),
            ("getCharacter(uint256)", selectors::GET_CHARACTER),
            ("charactersOf(address)", selectors::CHARACTERS_OF),
            ("ownerOf(uint256)", selectors::OWNER_OF),
            ("mintPrice()", selectors::MINT_PRICE),
            ("mintCharacter(string,uint256)", selectors::MINT_CHARACTER),
            ("levelUp(uint256)", selectors::LEVEL_UP),
            ("evolve(uint256)", selectors::EVOLVE),
            ("transfer(address,uint256)", selectors::TRANSFER),
        ];
        for (signature, selector) in table {
            assert_eq!(selector_of(signature), selector, "{signature}");
        }
    }

    #[test]
    fn selector_split() {
        let data = encode_call(selectors::MINT_PRICE, &[]);
        let (sel, args) = split_selector(&data).unwrap();
        assert_eq!(sel, selectors::MINT_PRICE);
        assert!(args.is_empty());
        assert_eq!(split_selector(&[1, 2]), Err(AbiError::MissingSelector));
    }
}
