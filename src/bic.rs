use crate::error::ValidationError;
use crate::reference;
use crate::registry::{BankEntry, Registry};
use crate::util::{clean, get_slice};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// ISO 9362:2022 allows digits in the business party prefix.
static ISO9362: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?$")
        .expect("ISO 9362 regex is valid")
});

/// SWIFT BIC policy: letters only in the business party prefix.
static SWIFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?$").expect("SWIFT regex is valid")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BicOptions {
    /// Skip validation at construction.
    pub allow_invalid: bool,
    pub enforce_swift_compliance: bool,
}

/// Classification by the second character of the location code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BicType {
    Testing,
    Passive,
    ReverseBilling,
    Default,
}

impl BicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BicType::Testing => "testing",
            BicType::Passive => "passive",
            BicType::ReverseBilling => "reverse billing",
            BicType::Default => "default",
        }
    }
}

impl fmt::Display for BicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Business Identifier Code, 8 or 11 characters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bic(String);

impl Bic {
    /// Parse and validate in ISO 9362 mode.
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        Self::with_options(value, BicOptions::default())
    }

    pub fn with_options(value: &str, options: BicOptions) -> Result<Self, ValidationError> {
        let bic = Bic(clean(value));
        if !options.allow_invalid {
            bic.validate(options.enforce_swift_compliance)?;
        }
        Ok(bic)
    }

    /// Wrap without any validation.
    pub fn unchecked(value: &str) -> Self {
        Bic(clean(value))
    }

    /// All BICs registered for a domestic bank code, primary entries first.
    pub fn candidates_from_bank_code(
        registry: &Registry,
        country_code: &str,
        bank_code: &str,
    ) -> Result<Vec<Bic>, ValidationError> {
        let country_code = clean(country_code);
        let bank_code = clean(bank_code);
        let entries = registry
            .banks_by_bank_code(&country_code, &bank_code)
            .ok_or_else(|| unknown_bank_code(&country_code, &bank_code))?;
        let mut entries: Vec<&BankEntry> =
            entries.iter().filter(|entry| !entry.bic.is_empty()).collect();
        if entries.is_empty() {
            return Err(unknown_bank_code(&country_code, &bank_code));
        }
        // Stable, so directory order is kept within each group.
        entries.sort_by_key(|entry| !entry.primary);
        entries.into_iter().map(|entry| Bic::new(&entry.bic)).collect()
    }

    /// The single most generic BIC for a domestic bank code.
    ///
    /// Prefers 8-character codes, then branch code `XXX` (greatest string
    /// wins among several), then the first candidate.
    pub fn from_bank_code(
        registry: &Registry,
        country_code: &str,
        bank_code: &str,
    ) -> Result<Self, ValidationError> {
        let mut candidates = Self::candidates_from_bank_code(registry, country_code, bank_code)?;
        if candidates.len() > 1 {
            let generic = candidates
                .iter()
                .filter(|bic| bic.branch_code().is_empty())
                .max()
                .or_else(|| {
                    candidates
                        .iter()
                        .filter(|bic| bic.branch_code() == "XXX")
                        .max()
                });
            if let Some(bic) = generic {
                return Ok(bic.clone());
            }
        }
        if candidates.is_empty() {
            return Err(unknown_bank_code(country_code, bank_code));
        }
        Ok(candidates.swap_remove(0))
    }

    /// Length, then structure, then country code.
    pub fn validate(&self, enforce_swift_compliance: bool) -> Result<(), ValidationError> {
        let len = self.0.chars().count();
        if len != 8 && len != 11 {
            return Err(ValidationError::InvalidLength(format!(
                "Invalid length '{len}'"
            )));
        }
        let pattern = if enforce_swift_compliance {
            &*SWIFT
        } else {
            &*ISO9362
        };
        if !pattern.is_match(&self.0) {
            return Err(ValidationError::InvalidStructure(format!(
                "Invalid structure '{}'",
                self.0
            )));
        }
        if !reference::is_country_code(self.country_code()) {
            return Err(ValidationError::InvalidCountryCode(format!(
                "Invalid country code '{}'",
                self.country_code()
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate(false).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn compact(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Business party prefix.
    pub fn bank_code(&self) -> &str {
        get_slice(&self.0, 0, Some(4))
    }

    pub fn country_code(&self) -> &str {
        get_slice(&self.0, 4, Some(6))
    }

    pub fn location_code(&self) -> &str {
        get_slice(&self.0, 6, Some(8))
    }

    pub fn branch_code(&self) -> &str {
        get_slice(&self.0, 8, Some(11))
    }

    pub fn kind(&self) -> BicType {
        match self.location_code().chars().nth(1) {
            Some('0') => BicType::Testing,
            Some('1') => BicType::Passive,
            Some('2') => BicType::ReverseBilling,
            _ => BicType::Default,
        }
    }

    /// Country name for the BIC's country code.
    pub fn country(&self) -> Option<&'static str> {
        reference::country_name(self.country_code())
    }

    /// `BANK CC LL BBB`, branch omitted when absent.
    pub fn formatted(&self) -> String {
        let mut parts = vec![self.bank_code(), self.country_code(), self.location_code()];
        if !self.branch_code().is_empty() {
            parts.push(self.branch_code());
        }
        parts.join(" ")
    }

    fn lookup_values<F>(&self, registry: &Registry, field: F) -> Vec<String>
    where
        F: Fn(&BankEntry) -> &str,
    {
        registry
            .banks_by_bic(&self.0)
            .iter()
            .map(|entry| field(entry).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn domestic_bank_codes(&self, registry: &Registry) -> Vec<String> {
        self.lookup_values(registry, |entry| &entry.bank_code)
    }

    pub fn bank_names(&self, registry: &Registry) -> Vec<String> {
        self.lookup_values(registry, |entry| &entry.name)
    }

    pub fn bank_short_names(&self, registry: &Registry) -> Vec<String> {
        self.lookup_values(registry, |entry| &entry.short_name)
    }

    /// Whether the bank directory knows this BIC.
    pub fn exists(&self, registry: &Registry) -> bool {
        !registry.banks_by_bic(&self.0).is_empty()
    }
}

fn unknown_bank_code(country_code: &str, bank_code: &str) -> ValidationError {
    ValidationError::InvalidBankCode(format!(
        "Unknown bank code '{bank_code}' for country '{country_code}'"
    ))
}

impl fmt::Display for Bic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Bic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<BIC={}>", self.0)
    }
}

impl AsRef<str> for Bic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Bic {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Bic {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Fragment, StaticSource};
    use rstest::rstest;

    fn registry() -> &'static Registry {
        Registry::ensure_loaded().unwrap()
    }

    #[test]
    fn slices_fixed_offsets() {
        let bic = Bic::new("GENODEM1GLS").unwrap();
        assert_eq!(bic.bank_code(), "GENO");
        assert_eq!(bic.country_code(), "DE");
        assert_eq!(bic.location_code(), "M1");
        assert_eq!(bic.branch_code(), "GLS");
        assert_eq!(bic.formatted(), "GENO DE M1 GLS");
        assert!(bic.validate(true).is_ok());

        let short = Bic::new("bnpa frpp").unwrap();
        assert_eq!(short, "BNPAFRPP");
        assert_eq!(short.branch_code(), "");
        assert_eq!(short.formatted(), "BNPA FR PP");
    }

    #[rstest]
    #[case("GENODEM", "invalid_length")]
    #[case("GENODEM1GL", "invalid_length")]
    #[case("GEN-DEM1", "invalid_structure")]
    #[case("GENO1EM1", "invalid_structure")]
    #[case("GENOXXM1", "invalid_country_code")]
    fn validation_order(#[case] value: &str, #[case] kind: &str) {
        let err = Bic::new(value).unwrap_err();
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn swift_mode_rejects_digits_in_prefix() {
        assert!(Bic::new("1234DEFF").is_ok());
        let err = Bic::with_options(
            "1234DEFF",
            BicOptions {
                enforce_swift_compliance: true,
                ..BicOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidStructure(_)));
    }

    #[test]
    fn allow_invalid_defers_validation() {
        let bic = Bic::with_options(
            "FOOBARBAZ",
            BicOptions {
                allow_invalid: true,
                ..BicOptions::default()
            },
        )
        .unwrap();
        assert!(!bic.is_valid());
        assert!(bic.country().is_none());
    }

    #[rstest]
    #[case("DEUTDEFF", BicType::Default)]
    #[case("DEUTDEF0", BicType::Testing)]
    #[case("DEUTDEF1", BicType::Passive)]
    #[case("DEUTDEF2XXX", BicType::ReverseBilling)]
    fn classification(#[case] value: &str, #[case] expected: BicType) {
        assert_eq!(Bic::unchecked(value).kind(), expected);
    }

    #[test]
    fn candidates_put_primary_first() {
        let candidates = Bic::candidates_from_bank_code(registry(), "FR", "30004").unwrap();
        assert_eq!(
            candidates,
            vec![
                Bic::unchecked("BNPAFRPP"),
                Bic::unchecked("BNPAFRPPIFN"),
                Bic::unchecked("BNPAFRPPPAA"),
                Bic::unchecked("BNPAFRPPXXX"),
            ]
        );
        let err = Bic::candidates_from_bank_code(registry(), "FR", "99999").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBankCode(_)));
    }

    #[rstest]
    #[case("DE", "43060967", "GENODEM1GLS")]
    #[case("FR", "30004", "BNPAFRPP")]
    #[case("FR", "20041", "PSSTFRPPXXX")]
    #[case("FR", "30066", "CMCIFRPAAFP")]
    #[case("de", "20070000", "DEUTDEHHXXX")]
    fn most_generic_bic(#[case] country: &str, #[case] bank_code: &str, #[case] expected: &str) {
        let bic = Bic::from_bank_code(registry(), country, bank_code).unwrap();
        assert_eq!(bic, expected);
    }

    #[test]
    fn unknown_bank_code_is_an_error() {
        assert!(matches!(
            Bic::from_bank_code(registry(), "DE", "00000000"),
            Err(ValidationError::InvalidBankCode(_))
        ));
        assert!(matches!(
            Bic::from_bank_code(registry(), "XX", "37040044"),
            Err(ValidationError::InvalidBankCode(_))
        ));
    }

    #[rstest]
    #[case("DE", "76026000")]
    #[case("DE", "00000000")]
    fn bank_code_without_bic_is_an_error(#[case] country: &str, #[case] bank_code: &str) {
        let err = Bic::candidates_from_bank_code(registry(), country, bank_code).unwrap_err();
        assert_eq!(err.kind(), "invalid_bank_code");
        let err = Bic::from_bank_code(registry(), country, bank_code).unwrap_err();
        assert_eq!(err.kind(), "invalid_bank_code");
    }

    #[test]
    fn entries_without_bic_are_skipped() {
        let source = StaticSource::new()
            .with(
                "iban",
                Fragment::Json(
                    r#"{"DE": {"bban_spec": "8!n10!n", "bban_length": 18, "iban_length": 22,
                        "positions": {"bank_code": [0, 8], "account_code": [8, 18]}}}"#
                        .into(),
                ),
            )
            .with(
                "bank",
                Fragment::Csv(
                    "country_code,bank_code,branch_code,bic,name,short_name,primary,checksum_algo\n\
                     DE,37040044,,,Commerzbank,Commerzbank,false,\n\
                     DE,37040044,,COBADEFFXXX,Commerzbank,Commerzbank Köln,true,\n"
                        .into(),
                ),
            );
        let registry = Registry::load(&source).unwrap();
        let candidates = Bic::candidates_from_bank_code(&registry, "DE", "37040044").unwrap();
        assert_eq!(candidates, vec![Bic::unchecked("COBADEFFXXX")]);
        assert_eq!(
            Bic::from_bank_code(&registry, "DE", "37040044").unwrap(),
            "COBADEFFXXX"
        );
    }

    #[test]
    fn length_counts_characters() {
        let bic = Bic::unchecked("ÄBCDDEFF");
        assert_eq!(bic.len(), 8);
        assert_eq!(bic.validate(false).unwrap_err().kind(), "invalid_structure");
    }

    #[test]
    fn directory_lookups() {
        let bic = Bic::new("MARKDEF1100").unwrap();
        assert_eq!(bic.domestic_bank_codes(registry()), vec!["10000000"]);
        assert_eq!(bic.bank_names(registry()).len(), 1);
        assert!(bic.exists(registry()));
        assert_eq!(bic.kind(), BicType::Passive);
        assert_eq!(bic.country(), Some("Germany"));

        let unknown = Bic::new("ZZZZDEFFXXX").unwrap();
        assert!(!unknown.exists(registry()));
        assert!(unknown.bank_names(registry()).is_empty());
    }
}
