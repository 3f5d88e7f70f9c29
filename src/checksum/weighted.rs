use super::{weighted, Algorithm};
use crate::domain::Component;
use crate::error::ValidationError;

fn expect_components<'a, const N: usize>(
    components: &[&'a str],
) -> Result<[&'a str; N], ValidationError> {
    <[&'a str; N]>::try_from(components).map_err(|_| {
        ValidationError::InvalidStructure(format!(
            "expected {} components, got {}",
            N,
            components.len()
        ))
    })
}

fn digit_or_zero(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        10 - value
    }
}

const SPAIN_WEIGHTS: [u32; 10] = [1, 2, 4, 8, 5, 10, 9, 7, 3, 6];

/// Spanish "dígitos de control": one digit for bank+branch, one for the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spain;

impl Algorithm for Spain {
    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let [bank, branch, account] = expect_components::<3>(components)?;
        let reconcile = |value: u32| match value {
            11 => 0,
            10 => 1,
            other => other,
        };
        let office = format!("{bank}{branch}");
        let first = reconcile(11 - weighted(office.chars(), 11, SPAIN_WEIGHTS[2..].iter().copied())?);
        let second = reconcile(11 - weighted(account.chars(), 11, SPAIN_WEIGHTS)?);
        Ok(format!("{first}{second}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poland;

impl Algorithm for Poland {
    fn accepts(&self) -> &'static [Component] {
        &[Component::BankCode, Component::BranchCode]
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let value = components.concat();
        let remainder = weighted(value.chars(), 10, [3, 9, 7, 1, 3, 9, 7])?;
        Ok(digit_or_zero(remainder).to_string())
    }
}

/// Estonian 7-3-1 check, applied right to left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estonia;

impl Algorithm for Estonia {
    fn accepts(&self) -> &'static [Component] {
        &[Component::BranchCode, Component::AccountCode]
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let value = components.concat();
        let remainder = weighted(value.chars().rev(), 10, [7, 3, 1].into_iter().cycle())?;
        Ok(digit_or_zero(remainder).to_string())
    }
}

const CZECH_WEIGHTS: [u32; 10] = [6, 3, 7, 9, 10, 5, 8, 4, 2, 1];

/// Czech and Slovak account numbers carry no separate check digits; both the
/// prefix and the account number must be divisible by 11 under their weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CzechSlovak;

impl Algorithm for CzechSlovak {
    fn accepts(&self) -> &'static [Component] {
        &[Component::BranchCode, Component::AccountCode]
    }

    fn compute(&self, _components: &[&str]) -> Result<String, ValidationError> {
        Ok(String::new())
    }

    fn validate(&self, components: &[&str], _expected: &str) -> Result<bool, ValidationError> {
        let [branch, account] = expect_components::<2>(components)?;
        let prefix = weighted(branch.chars(), 11, CZECH_WEIGHTS[4..].iter().copied())?;
        let number = weighted(account.chars(), 11, CZECH_WEIGHTS)?;
        Ok(prefix == 0 && number == 0)
    }
}

/// The check digit is the ninth digit of the Icelandic kennitala.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iceland;

impl Algorithm for Iceland {
    fn accepts(&self) -> &'static [Component] {
        &[Component::AccountHolderId]
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let [holder_id] = expect_components::<1>(components)?;
        let remainder = weighted(holder_id.chars(), 11, [3, 2, 7, 6, 5, 4, 3, 2])?;
        Ok(if remainder == 0 {
            "0".to_string()
        } else {
            (11 - remainder).to_string()
        })
    }

    fn validate(&self, components: &[&str], _expected: &str) -> Result<bool, ValidationError> {
        let [holder_id] = expect_components::<1>(components)?;
        let ninth = holder_id.chars().nth(8).map(String::from).unwrap_or_default();
        Ok(self.compute(components)? == ninth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Norway;

impl Algorithm for Norway {
    fn accepts(&self) -> &'static [Component] {
        &[Component::BankCode, Component::AccountCode]
    }

    fn compute(&self, components: &[&str]) -> Result<String, ValidationError> {
        let [bank, account] = expect_components::<2>(components)?;
        let value = if account.starts_with("00") {
            account[2..].to_string()
        } else {
            format!("{bank}{account}")
        };
        let remainder = weighted(value.chars(), 11, [5, 4, 3, 2, 7, 6, 5, 4, 3, 2])?;
        let check = 11 - remainder;
        if check == 10 {
            return Err(ValidationError::InvalidAccountCode(
                "Check digit does not compute: Invalid account code.".to_string(),
            ));
        }
        Ok((check % 11).to_string())
    }
}

/// Dutch elfproef. Kept out of the registry since modern account numbers no
/// longer satisfy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Netherlands;

impl Algorithm for Netherlands {
    fn accepts(&self) -> &'static [Component] {
        &[Component::AccountCode]
    }

    fn compute(&self, _components: &[&str]) -> Result<String, ValidationError> {
        Ok(String::new())
    }

    fn validate(&self, components: &[&str], _expected: &str) -> Result<bool, ValidationError> {
        let [account] = expect_components::<1>(components)?;
        let mut total: i64 = 0;
        for (idx, ch) in account.chars().enumerate() {
            let digit = ch.to_digit(10).ok_or_else(|| {
                ValidationError::InvalidStructure(format!("unexpected character '{ch}'"))
            })?;
            total += i64::from(digit) * (10 - idx as i64);
        }
        Ok(total.rem_euclid(11) == 0)
    }
}
