use thiserror::Error;

/// Every way an IBAN, BBAN or BIC can be rejected.
///
/// Construction-time validation always surfaces one of these; only the
/// `is_valid` convenience accessors fold them into `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),

    #[error("invalid bank code: {0}")]
    InvalidBankCode(String),

    #[error("invalid branch code: {0}")]
    InvalidBranchCode(String),

    #[error("invalid account code: {0}")]
    InvalidAccountCode(String),

    #[error("invalid checksum digits: {0}")]
    InvalidChecksumDigits(String),

    #[error("invalid BBAN checksum: {0}")]
    InvalidBbanChecksum(String),

    /// No structurally valid value was found within the retry budget.
    #[error("no valid random value found after {attempts} attempts")]
    GenerateRandomOverflow { attempts: usize },

    /// The country has a spec but no component positions to assemble from.
    #[error("BBAN generation for {0} not supported")]
    UnsupportedCountry(String),
}

impl ValidationError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::InvalidLength(_) => "invalid_length",
            ValidationError::InvalidStructure(_) => "invalid_structure",
            ValidationError::InvalidCountryCode(_) => "invalid_country_code",
            ValidationError::InvalidBankCode(_) => "invalid_bank_code",
            ValidationError::InvalidBranchCode(_) => "invalid_branch_code",
            ValidationError::InvalidAccountCode(_) => "invalid_account_code",
            ValidationError::InvalidChecksumDigits(_) => "invalid_checksum_digits",
            ValidationError::InvalidBbanChecksum(_) => "invalid_bban_checksum",
            ValidationError::GenerateRandomOverflow { .. } => "generate_random_overflow",
            ValidationError::UnsupportedCountry(_) => "unsupported_country",
        }
    }
}

/// Fatal problems with the reference dataset. These indicate broken data or
/// a programming error, never bad user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("failed to load dataset '{0}': no fragments found")]
    MissingDataset(String),

    #[error("failed to parse dataset '{name}': {message}")]
    Parse { name: String, message: String },

    #[error("invalid spec for {country}: {message}")]
    InvalidSpec { country: String, message: String },

    #[error("io error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("dataset '{0}' cannot be merged: mismatched fragment types")]
    UnsupportedFragment(String),

    #[error("dataset '{0}' is not a list")]
    NotAList(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = ValidationError::InvalidBankCode("Bank code exceeds maximum size 8".to_string());
        assert_eq!(
            err.to_string(),
            "invalid bank code: Bank code exceeds maximum size 8"
        );
        assert_eq!(err.kind(), "invalid_bank_code");
    }

    #[test]
    fn overflow_reports_attempts() {
        let err = ValidationError::GenerateRandomOverflow { attempts: 100 };
        assert_eq!(
            err.to_string(),
            "no valid random value found after 100 attempts"
        );
    }
}
