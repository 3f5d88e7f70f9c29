use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical fields a national BBAN can be made of.
///
/// Declaration order matters: BBAN assembly writes components in this order,
/// so later ones win where position ranges overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    AccountId,
    AccountType,
    AccountCode,
    AccountHolderId,
    CurrencyCode,
    BankCode,
    BranchCode,
    NationalChecksumDigits,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::AccountId,
        Component::AccountType,
        Component::AccountCode,
        Component::AccountHolderId,
        Component::CurrencyCode,
        Component::BankCode,
        Component::BranchCode,
        Component::NationalChecksumDigits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::AccountId => "account_id",
            Component::AccountType => "account_type",
            Component::AccountCode => "account_code",
            Component::AccountHolderId => "account_holder_id",
            Component::CurrencyCode => "currency_code",
            Component::BankCode => "bank_code",
            Component::BranchCode => "branch_code",
            Component::NationalChecksumDigits => "national_checksum_digits",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open byte range of a component inside a BBAN. Serialized as
/// `[start, end]`; `[0, 0]` means the component does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Clamping cut: never fails, returns whatever part of the range `s` covers.
    pub fn cut<'a>(&self, s: &'a str) -> &'a str {
        let end = self.end.min(s.len());
        let start = self.start.min(end);
        s.get(start..end).unwrap_or("")
    }
}

impl From<[usize; 2]> for Range {
    fn from(value: [usize; 2]) -> Self {
        Range::new(value[0], value[1])
    }
}

impl From<Range> for [usize; 2] {
    fn from(value: Range) -> Self {
        [value.start, value.end]
    }
}
