use super::{luhn, Algorithm};
use crate::domain::Component;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finland;

impl Algorithm for Finland {
    fn accepts(&self) -> &'static [Component] {
        &[Component::BankCode, Component::AccountCode]
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        luhn(&components.concat())
    }
}

const ODDS: [u32; 26] = [
    1, 0, 5, 7, 9, 13, 15, 17, 19, 21, 2, 4, 18, 20, 11, 3, 6, 8, 12, 14, 16, 10, 22, 25, 24, 23,
];

/// Italian CIN letter. San Marino uses the same scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Italy;

impl Algorithm for Italy {
    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let mut sum: u32 = 0;
        for (idx, ch) in components.concat().chars().enumerate() {
            let index = match ch {
                '0'..='9' => ch as u32 - '0' as u32,
                'A'..='Z' | 'a'..='z' => ch.to_ascii_uppercase() as u32 - 'A' as u32,
                _ => {
                    return Err(ValidationError::InvalidStructure(format!(
                        "unexpected character '{ch}'"
                    )))
                }
            };
            sum += if (idx + 1) % 2 == 0 {
                index
            } else {
                ODDS[index as usize]
            };
        }
        Ok(char::from(b'A' + (sum % 26) as u8).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finland_luhn() {
        // FI21 1234 5600 0007 85
        assert_eq!(Finland.compute(&["123", "4560000078"]).unwrap(), "5");
    }

    #[test]
    fn italy_cin() {
        // IT60 X054 2811 1010 0000 0123 456
        assert_eq!(
            Italy.compute(&["05428", "11101", "000000123456"]).unwrap(),
            "X"
        );
        // SM86 U032 2509 8000 0000 0270 100
        assert_eq!(
            Italy.compute(&["03225", "09800", "000000270100"]).unwrap(),
            "U"
        );
        assert!(Italy.compute(&["0542-", "", ""]).is_err());
    }
}
