//! Wallet addresses and token amounts.
use num_traits::checked_pow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid address '{0}': expected 0x followed by 40 hex digits")]
    InvalidAddress(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid token amount '{0}'")]
    InvalidAmount(String),
    #[error("token amount has more than {decimals} decimal places")]
    TooPrecise { decimals: u8 },
    #[error("token amount overflows")]
    Overflow,
}

/// Lowercase hex without prefix.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex, accepting an optional `0x` prefix.
///
/// # Errors
///
/// Returns an error for odd lengths or non-hex characters.
pub fn from_hex(text: &str) -> Result<Vec<u8>, AddressError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|err| AddressError::InvalidHex(format!("{text} ({err})")))
}

/// 20-byte EVM account address. Displays as lowercase `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0; 20]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Abbreviated `0x1234…abcd` form for compact display.
    #[must_use]
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !ADDRESS_RE.is_match(trimmed) {
            return Err(AddressError::InvalidAddress(s.to_string()));
        }
        let bytes = from_hex(trimmed)?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidAddress(s.to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// ERC-20 amount in base units. Serialized as a decimal string so it
/// survives JSON consumers limited to 53-bit numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn base_units(self) -> u128 {
        self.0
    }

    /// Whole tokens scaled by `decimals`.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the scaled value does not fit in 128 bits.
    pub fn from_whole(tokens: u64, decimals: u8) -> Result<Self, AddressError> {
        let scale = checked_pow(10_u128, usize::from(decimals)).ok_or(AddressError::Overflow)?;
        u128::from(tokens)
            .checked_mul(scale)
            .map(Self)
            .ok_or(AddressError::Overflow)
    }

    /// Parse a human amount such as `"12.5"` into base units.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input, excess precision, or overflow.
    pub fn from_decimal_str(text: &str, decimals: u8) -> Result<Self, AddressError> {
        let trimmed = text.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(AddressError::InvalidAmount(text.to_string()));
        }
        if frac.len() > usize::from(decimals) {
            return Err(AddressError::TooPrecise { decimals });
        }
        let scale = checked_pow(10_u128, usize::from(decimals)).ok_or(AddressError::Overflow)?;
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| AddressError::Overflow)?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let pad = checked_pow(10_u128, usize::from(decimals) - frac.len())
                .ok_or(AddressError::Overflow)?;
            frac.parse::<u128>()
                .map_err(|_| AddressError::Overflow)?
                .checked_mul(pad)
                .ok_or(AddressError::Overflow)?
        };
        whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or(AddressError::Overflow)
    }

    /// Render with `decimals` places, trimming trailing zeros.
    #[must_use]
    pub fn format(self, decimals: u8) -> String {
        let Some(scale) = checked_pow(10_u128, usize::from(decimals)) else {
            return self.0.to_string();
        };
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_text = format!("{frac:0width$}", width = usize::from(decimals));
        format!("{whole}.{}", frac_text.trim_end_matches('0'))
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<u128>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_mixed_case_and_displays_lowercase() {
        let addr: Address = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01".parse().unwrap();
        assert_eq!(addr.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(addr.short(), "0xabcd…ef01");
    }

    #[test]
    fn address_rejects_bad_shapes() {
        for bad in ["", "0x1234", "abcdef0123456789abcdef0123456789abcdef01", "0xZZcdef0123456789abcdef0123456789abcdef01"] {
            assert!(bad.parse::<Address>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn address_serializes_as_string() {
        let addr: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000ff\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn hex_helpers_handle_prefix_and_errors() {
        assert_eq!(from_hex("0x0aff").unwrap(), vec![0x0a, 0xff]);
        assert_eq!(to_hex(&[0x0a, 0xff]), "0aff");
        assert!(from_hex("0xabc").is_err());
        assert!(from_hex("zz").is_err());
    }

    #[test]
    fn hex_decode_errors_map_to_invalid_hex() {
        match from_hex("0x0g") {
            Err(AddressError::InvalidHex(detail)) => assert!(detail.starts_with("0x0g")),
            other => panic!("unexpected {other:?}"),
        }
        assert!("0x00000000000000000000000000000000deadbeeg".parse::<Address>().is_err());
    }

    #[test]
    fn token_amount_parses_and_formats() {
        let amount = TokenAmount::from_decimal_str("12.5", 18).unwrap();
        assert_eq!(amount.base_units(), 12_500_000_000_000_000_000);
        assert_eq!(amount.format(18), "12.5");
        assert_eq!(TokenAmount::from_decimal_str(".25", 2).unwrap().base_units(), 25);
        assert_eq!(TokenAmount::from_whole(3, 6).unwrap().format(6), "3");
    }

    #[test]
    fn token_amount_rejects_bad_input() {
        assert!(matches!(
            TokenAmount::from_decimal_str("1.234", 2),
            Err(AddressError::TooPrecise { decimals: 2 })
        ));
        assert!(TokenAmount::from_decimal_str("1e5", 18).is_err());
        assert!(TokenAmount::from_decimal_str(".", 18).is_err());
        assert!(TokenAmount::from_whole(u64::MAX, 30).is_err());
    }

    #[test]
    fn token_amount_serializes_as_decimal_string() {
        let amount = TokenAmount::from_base_units(u128::MAX);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        assert_eq!(serde_json::from_str::<TokenAmount>(&json).unwrap(), amount);
    }
}
