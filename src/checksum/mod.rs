//! National BBAN checksum algorithms.
//!
//! Every algorithm is registered once, under `"{country}:{name}"`, in a
//! static table built on first use. A country without an entry simply has no
//! modelled national checksum.

mod iso7064;
mod positional;
mod weighted;

pub use iso7064::{FranceMod97, Mod97_10, PostProcess};
pub use positional::{Finland, Italy};
pub use weighted::{CzechSlovak, Estonia, Iceland, Netherlands, Norway, Poland, Spain};

use crate::domain::Component;
use crate::error::ValidationError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_NAME: &str = "default";

const BANK_BRANCH_ACCOUNT: [Component; 3] = [
    Component::BankCode,
    Component::BranchCode,
    Component::AccountCode,
];

/// A national checksum strategy.
///
/// `components` are supplied in exactly the order given by [`Algorithm::accepts`].
pub trait Algorithm: Send + Sync {
    fn name(&self) -> &'static str {
        DEFAULT_NAME
    }

    fn accepts(&self) -> &'static [Component] {
        &BANK_BRANCH_ACCOUNT
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError>;

    fn validate(&self, components: &[&str], expected: &str) -> Result<bool, ValidationError> {
        Ok(self.compute(components)? == expected)
    }
}

type Table = HashMap<String, Arc<dyn Algorithm>>;

static ALGORITHMS: Lazy<Table> = Lazy::new(|| {
    let mut table = Table::new();
    register(&mut table, &["BA", "ME", "MK", "PT", "RS", "SI", "TL"], Mod97_10::standard());
    register(&mut table, &["MR", "TN"], Mod97_10::variant());
    register(&mut table, &["BE"], Mod97_10::belgium());
    register(&mut table, &["FR", "MC"], FranceMod97);
    register(&mut table, &["ES"], Spain);
    register(&mut table, &["PL"], Poland);
    register(&mut table, &["EE"], Estonia);
    register(&mut table, &["CZ", "SK"], CzechSlovak);
    register(&mut table, &["IS"], Iceland);
    register(&mut table, &["NO"], Norway);
    register(&mut table, &["FI"], Finland);
    register(&mut table, &["IT", "SM"], Italy);
    log::debug!("registered {} national checksum algorithms", table.len());
    table
});

fn register<A: Algorithm + 'static>(table: &mut Table, prefixes: &[&str], algorithm: A) {
    let algorithm: Arc<dyn Algorithm> = Arc::new(algorithm);
    for prefix in prefixes {
        table.insert(
            format!("{}:{}", prefix, algorithm.name()),
            Arc::clone(&algorithm),
        );
    }
}

/// Algorithm registered for `country_code` under `name`, if any.
pub fn get(country_code: &str, name: &str) -> Option<&'static dyn Algorithm> {
    ALGORITHMS
        .get(&format!("{country_code}:{name}"))
        .map(|algorithm| algorithm.as_ref())
}

/// All registered keys, sorted.
pub fn registered_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = ALGORITHMS.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Base-36 value of an uppercase alphanumeric character.
pub fn char_value(ch: char) -> Option<u32> {
    match ch {
        '0'..='9' => Some(ch as u32 - '0' as u32),
        'A'..='Z' => Some(ch as u32 - 'A' as u32 + 10),
        _ => None,
    }
}

fn invalid_char(ch: char) -> ValidationError {
    ValidationError::InvalidStructure(format!("unexpected character '{ch}'"))
}

/// Decimal digit string where each letter is replaced by its two-digit value
/// (A=10 .. Z=35).
pub fn numerify(value: &str) -> Result<String, ValidationError> {
    let mut out = String::with_capacity(value.len() * 2);
    for ch in value.chars() {
        let digit = char_value(ch).ok_or_else(|| invalid_char(ch))?;
        out.push_str(&digit.to_string());
    }
    Ok(out)
}

/// Remainder of an arbitrarily long decimal digit string. Empty input is 0.
pub fn mod_digits(digits: &str, modulus: u32) -> Result<u32, ValidationError> {
    let mut remainder: u64 = 0;
    for ch in digits.chars() {
        let digit = ch.to_digit(10).ok_or_else(|| invalid_char(ch))?;
        remainder = (remainder * 10 + u64::from(digit)) % u64::from(modulus);
    }
    Ok(remainder as u32)
}

/// `numerify(value) mod modulus` without materializing the big number.
pub fn numeric_mod(value: &str, modulus: u32) -> Result<u32, ValidationError> {
    mod_digits(&numerify(value)?, modulus)
}

/// `sum(weight * digit) mod modulus`, pairing characters with weights until
/// either runs out.
pub fn weighted<V, W>(value: V, modulus: u32, weights: W) -> Result<u32, ValidationError>
where
    V: IntoIterator<Item = char>,
    W: IntoIterator<Item = u32>,
{
    let mut total: u32 = 0;
    for (weight, ch) in weights.into_iter().zip(value) {
        let digit = ch.to_digit(10).ok_or_else(|| invalid_char(ch))?;
        total += weight * digit;
    }
    Ok(total % modulus)
}

/// Luhn check digit over the numerified value.
pub fn luhn(value: &str) -> Result<String, ValidationError> {
    let numerical = numerify(value)?;
    let mut sum: u32 = 0;
    for (idx, ch) in numerical.chars().rev().enumerate() {
        let digit = ch.to_digit(10).ok_or_else(|| invalid_char(ch))?;
        let product = (2 - (idx as u32 % 2)) * digit;
        sum += product / 10 + product % 10;
    }
    Ok(((10 - (sum % 10) as i32).rem_euclid(10)).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_expected_keys() {
        let keys = registered_keys();
        for key in [
            "BA:default", "BE:default", "CZ:default", "EE:default", "ES:default", "FI:default",
            "FR:default", "IS:default", "IT:default", "MC:default", "ME:default", "MK:default",
            "MR:default", "NO:default", "PL:default", "PT:default", "RS:default", "SI:default",
            "SK:default", "SM:default", "TL:default", "TN:default",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(!keys.contains(&"NL:default"));
        assert!(!keys.contains(&"DE:default"));
        assert_eq!(keys.len(), 22);
    }

    #[test]
    fn lookup_is_by_exact_key() {
        assert!(get("FR", "default").is_some());
        assert!(get("FR", "legacy").is_none());
        assert!(get("DE", "default").is_none());
        assert_eq!(
            get("CZ", "default").map(|algo| algo.accepts().to_vec()),
            Some(vec![Component::BranchCode, Component::AccountCode])
        );
    }

    #[test]
    fn numerify_maps_letters_to_two_digits() {
        assert_eq!(numerify("DE00").unwrap(), "13140000");
        assert_eq!(numerify("0AZ").unwrap(), "01035");
        assert!(matches!(
            numerify("A-1"),
            Err(ValidationError::InvalidStructure(_))
        ));
    }

    #[test]
    fn mod_digits_handles_long_inputs() {
        // DE89 3704 0044 0532 0130 00 rearranged
        let digits = numerify("370400440532013000DE89").unwrap();
        assert_eq!(mod_digits(&digits, 97).unwrap(), 1);
        assert_eq!(mod_digits("", 97).unwrap(), 0);
    }

    #[test]
    fn weighted_zips_to_shortest() {
        assert_eq!(weighted("123".chars(), 100, [1, 10]).unwrap(), 21);
        assert_eq!(weighted("12".chars(), 100, [1, 10, 100]).unwrap(), 21);
        assert!(weighted("1A".chars(), 11, [1, 1]).is_err());
    }

    #[test]
    fn luhn_check_digits() {
        assert_eq!(luhn("1234560000078").unwrap(), "5");
        assert_eq!(luhn("7992739871").unwrap(), "3");
        assert_eq!(luhn("0").unwrap(), "0");
    }
}
