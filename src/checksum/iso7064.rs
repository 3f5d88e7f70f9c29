use super::{mod_digits, numeric_mod, Algorithm};
use crate::error::ValidationError;

/// How the mod-97 remainder becomes check digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// `98 - r`, ISO 7064 MOD 97-10 as used by IBAN itself.
    NinetyEightMinus,
    /// `97 - r`
    NinetySevenMinus,
    /// The remainder itself, with 0 written as 97.
    ZeroAsNinetySeven,
}

impl PostProcess {
    pub fn apply(self, remainder: u32) -> u32 {
        match self {
            PostProcess::NinetyEightMinus => 98 - remainder,
            PostProcess::NinetySevenMinus => 97 - remainder,
            PostProcess::ZeroAsNinetySeven if remainder == 0 => 97,
            PostProcess::ZeroAsNinetySeven => remainder,
        }
    }
}

/// Two-digit mod-97 check over the concatenated components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mod97_10 {
    append_zeros: bool,
    post: PostProcess,
}

impl Mod97_10 {
    pub const fn standard() -> Self {
        Self {
            append_zeros: true,
            post: PostProcess::NinetyEightMinus,
        }
    }

    /// Mauritania and Tunisia.
    pub const fn variant() -> Self {
        Self {
            append_zeros: true,
            post: PostProcess::NinetySevenMinus,
        }
    }

    pub const fn belgium() -> Self {
        Self {
            append_zeros: false,
            post: PostProcess::ZeroAsNinetySeven,
        }
    }
}

impl Algorithm for Mod97_10 {
    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let mut remainder = numeric_mod(&components.concat(), 97)?;
        if self.append_zeros {
            remainder = remainder * 100 % 97;
        }
        Ok(format!("{:02}", self.post.apply(remainder)))
    }
}

/// French RIB key, also used by Monaco.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FranceMod97;

/// RIB letter substitution: A-I and J-R map to 1-9, S-Z to 2-9.
fn rib_digits(value: &str) -> Result<String, ValidationError> {
    value
        .chars()
        .map(|ch| match ch {
            '0'..='9' => Ok(ch),
            'A'..='I' => Ok(char::from(b'1' + (ch as u8 - b'A'))),
            'J'..='R' => Ok(char::from(b'1' + (ch as u8 - b'J'))),
            'S'..='Z' => Ok(char::from(b'2' + (ch as u8 - b'S'))),
            _ => Err(ValidationError::InvalidStructure(format!(
                "unexpected character '{ch}'"
            ))),
        })
        .collect()
}

impl Algorithm for FranceMod97 {
    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let &[bank, branch, account] = components else {
            return Err(ValidationError::InvalidStructure(format!(
                "expected 3 components, got {}",
                components.len()
            )));
        };
        let weighted = 89 * mod_digits(&rib_digits(bank)?, 97)?
            + 15 * mod_digits(&rib_digits(branch)?, 97)?
            + 3 * mod_digits(&rib_digits(account)?, 97)?;
        Ok(format!("{:02}", 97 - weighted % 97))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_mod97_matches_published_ibans() {
        let algo = Mod97_10::standard();
        // BA39 1290 0794 0102 8494
        assert_eq!(algo.compute(&["129", "007", "94010284"]).unwrap(), "94");
        // PT50 0002 0123 1234 5678 9015 4
        assert_eq!(algo.compute(&["0002", "0123", "12345678901"]).unwrap(), "54");
        assert!(algo
            .validate(&["129", "007", "94010284"], "94")
            .unwrap());
        assert!(!algo.validate(&["129", "007", "94010284"], "95").unwrap());
    }

    #[test]
    fn variant_uses_ninety_seven() {
        // MR13 0002 0001 0100 0012 3456 753
        let algo = Mod97_10::variant();
        assert_eq!(algo.compute(&["00020", "00101", "00001234567"]).unwrap(), "53");
    }

    #[test]
    fn belgium_keeps_the_remainder() {
        let algo = Mod97_10::belgium();
        assert_eq!(algo.compute(&["539", "", "0075470"]).unwrap(), "34");
        assert_eq!(algo.compute(&["000", "", "0000097"]).unwrap(), "97");
    }

    #[test]
    fn france_rib_key() {
        assert_eq!(
            FranceMod97.compute(&["20041", "01005", "0500013M026"]).unwrap(),
            "06"
        );
        assert_eq!(rib_digits("AJSZ").unwrap(), "1129");
        assert!(FranceMod97.compute(&["20041", "01005"]).is_err());
    }
}
