use crate::bban::{Bban, RandomOptions};
use crate::bic::Bic;
use crate::checksum::{self, Algorithm, Mod97_10};
use crate::domain::Component;
use crate::error::ValidationError;
use crate::reference;
use crate::registry::{BankEntry, Registry};
use crate::spec::CountrySpec;
use crate::util::{clean, get_slice};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

static LEADING_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}").expect("IBAN prefix regex is valid"));

const IBAN_CHECKSUM: Mod97_10 = Mod97_10::standard();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IbanOptions {
    /// Skip validation at construction.
    pub allow_invalid: bool,
    /// Also check the national check digits inside the BBAN.
    pub validate_bban: bool,
}

/// International Bank Account Number.
///
/// Holds the normalized string and the [`Bban`] cut from it; everything else
/// is derived on access.
#[derive(Clone)]
pub struct Iban<'r> {
    value: String,
    bban: Bban<'r>,
}

impl<'r> Iban<'r> {
    pub fn new(registry: &'r Registry, value: &str) -> Result<Self, ValidationError> {
        Self::with_options(registry, value, IbanOptions::default())
    }

    pub fn with_options(
        registry: &'r Registry,
        value: &str,
        options: IbanOptions,
    ) -> Result<Self, ValidationError> {
        let value = clean(value);
        let bban = Bban::unchecked(
            registry,
            get_slice(&value, 0, Some(2)).to_string(),
            get_slice(&value, 4, None).to_string(),
        );
        let iban = Self { value, bban };
        if !options.allow_invalid {
            iban.validate(options.validate_bban)?;
        }
        Ok(iban)
    }

    /// Prefix `bban` with its country code and freshly computed check digits.
    pub fn from_bban(
        registry: &'r Registry,
        country_code: &str,
        bban: &str,
        options: IbanOptions,
    ) -> Result<Self, ValidationError> {
        let country_code = clean(country_code);
        let bban = clean(bban);
        let digits = IBAN_CHECKSUM.compute(&[&bban, &country_code])?;
        Self::with_options(
            registry,
            &format!("{country_code}{digits}{bban}"),
            options,
        )
    }

    /// Build an IBAN from its national components, padding each with zeros
    /// to its field width.
    pub fn generate(
        registry: &'r Registry,
        country_code: &str,
        bank_code: &str,
        account_code: &str,
        branch_code: &str,
    ) -> Result<Self, ValidationError> {
        let bban = Bban::from_components(
            registry,
            country_code,
            [
                (Component::BankCode, bank_code),
                (Component::BranchCode, branch_code),
                (Component::AccountCode, account_code),
            ],
        )?;
        Self::from_bban(
            registry,
            bban.country_code(),
            bban.as_str(),
            IbanOptions::default(),
        )
    }

    pub fn random<R: Rng + ?Sized>(
        registry: &'r Registry,
        rng: &mut R,
        options: &RandomOptions,
    ) -> Result<Self, ValidationError> {
        let bban = Bban::random(registry, rng, options)?;
        Self::from_bban(
            registry,
            bban.country_code(),
            bban.as_str(),
            IbanOptions::default(),
        )
    }

    /// Run every structural check in order, failing on the first problem.
    pub fn validate(&self, validate_bban: bool) -> Result<(), ValidationError> {
        self.validate_characters()?;
        let spec = self.spec()?;
        self.validate_length(spec)?;
        self.validate_format(spec)?;
        self.validate_iban_checksum()?;
        if validate_bban {
            self.bban.validate_national_checksum()?;
        }
        Ok(())
    }

    fn validate_characters(&self) -> Result<(), ValidationError> {
        if LEADING_CHARACTERS.is_match(&self.value) {
            Ok(())
        } else {
            Err(ValidationError::InvalidStructure(format!(
                "Invalid characters in IBAN {}",
                self.value
            )))
        }
    }

    fn validate_length(&self, spec: &CountrySpec) -> Result<(), ValidationError> {
        let len = self.value.chars().count();
        if len == spec.iban_length {
            Ok(())
        } else {
            Err(ValidationError::InvalidLength(format!(
                "Invalid IBAN length {len}, expected {}",
                spec.iban_length
            )))
        }
    }

    fn validate_format(&self, spec: &CountrySpec) -> Result<(), ValidationError> {
        if spec.matches_bban(self.bban.as_str()) {
            Ok(())
        } else {
            Err(ValidationError::InvalidStructure(format!(
                "Invalid BBAN structure: '{}' doesn't match '{}'",
                self.bban, spec.bban_spec
            )))
        }
    }

    /// Both the plain mod-97 residue and the recomputed ISO 7064 digits must
    /// agree; the residue alone accepts check digits 00, 01 and 99.
    fn validate_iban_checksum(&self) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidChecksumDigits("Invalid checksum digits".to_string());
        let remainder = checksum::mod_digits(&self.numeric()?, 97)?;
        if remainder != 1 {
            return Err(invalid());
        }
        let components = [self.bban.as_str(), self.country_code()];
        if !IBAN_CHECKSUM.validate(&components, self.checksum_digits())? {
            return Err(invalid());
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate(false).is_ok()
    }

    /// Decimal representation: the BBAN followed by the first four
    /// characters, letters expanded to two digits each.
    pub fn numeric(&self) -> Result<String, ValidationError> {
        let rearranged = format!("{}{}", self.bban.as_str(), get_slice(&self.value, 0, Some(4)));
        checksum::numerify(&rearranged)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn compact(&self) -> &str {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Blocks of four separated by single spaces.
    pub fn formatted(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        chars
            .chunks(4)
            .map(|chunk| chunk.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn bban(&self) -> &Bban<'r> {
        &self.bban
    }

    pub fn spec(&self) -> Result<&'r CountrySpec, ValidationError> {
        self.bban.spec()
    }

    pub fn country_code(&self) -> &str {
        get_slice(&self.value, 0, Some(2))
    }

    pub fn checksum_digits(&self) -> &str {
        get_slice(&self.value, 2, Some(4))
    }

    pub fn country(&self) -> Option<&'static str> {
        reference::country_name(self.country_code())
    }

    pub fn in_sepa_zone(&self) -> Result<bool, ValidationError> {
        Ok(self.spec()?.in_sepa_zone)
    }

    pub fn bank_code(&self) -> &str {
        self.bban.bank_code()
    }

    pub fn branch_code(&self) -> &str {
        self.bban.branch_code()
    }

    pub fn account_code(&self) -> &str {
        self.bban.account_code()
    }

    pub fn account_id(&self) -> &str {
        self.bban.account_id()
    }

    pub fn account_type(&self) -> &str {
        self.bban.account_type()
    }

    pub fn account_holder_id(&self) -> &str {
        self.bban.account_holder_id()
    }

    pub fn currency_code(&self) -> &str {
        self.bban.currency_code()
    }

    pub fn national_checksum_digits(&self) -> &str {
        self.bban.national_checksum_digits()
    }

    pub fn bic(&self) -> Option<Bic> {
        self.bban.bic()
    }

    pub fn bank(&self) -> Option<&'r BankEntry> {
        self.bban.bank()
    }

    pub fn bank_name(&self) -> Option<&'r str> {
        self.bban.bank_name()
    }

    pub fn bank_short_name(&self) -> Option<&'r str> {
        self.bban.bank_short_name()
    }
}

impl fmt::Display for Iban<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl fmt::Debug for Iban<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<IBAN={}>", self.value)
    }
}

impl PartialEq for Iban<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Iban<'_> {}

impl PartialOrd for Iban<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Iban<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for Iban<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialEq<str> for Iban<'_> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for Iban<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn registry() -> &'static Registry {
        Registry::ensure_loaded().unwrap()
    }

    #[test]
    fn parses_components() {
        let iban = Iban::new(registry(), "DE89 3704 0044 0532 0130 00").unwrap();
        assert_eq!(iban, "DE89370400440532013000");
        assert_eq!(iban.country_code(), "DE");
        assert_eq!(iban.checksum_digits(), "89");
        assert_eq!(iban.bank_code(), "37040044");
        assert_eq!(iban.account_code(), "0532013000");
        assert_eq!(iban.bban().as_str(), "370400440532013000");
        assert_eq!(iban.formatted(), "DE89 3704 0044 0532 0130 00");
        assert_eq!(iban.country(), Some("Germany"));
        assert_eq!(iban.in_sepa_zone(), Ok(true));
        assert_eq!(iban.bank_name(), Some("Commerzbank"));
        assert_eq!(iban.bic().map(|bic| bic.to_string()), Some("COBADEFFXXX".to_string()));
    }

    #[rstest]
    #[case("AD1200012030200359100100")]
    #[case("AT611904300234573201")]
    #[case("BE68539007547034")]
    #[case("CH9300762011623852957")]
    #[case("FR1420041010050500013M02606")]
    #[case("GB29NWBK60161331926819")]
    #[case("IT60X0542811101000000123456")]
    #[case("LC55HEMM000100010012001200023015")]
    #[case("NL91ABNA0417164300")]
    #[case("XK051212012345678906")]
    fn accepts_valid_ibans(#[case] value: &str) {
        let iban = Iban::with_options(
            registry(),
            value,
            IbanOptions {
                validate_bban: true,
                ..IbanOptions::default()
            },
        );
        assert!(iban.is_ok(), "{value}: {iban:?}");
    }

    #[rstest]
    #[case("DE89370400440532013001", "invalid_checksum_digits")]
    #[case("DE8937040044053201300", "invalid_length")]
    #[case("DE89370400440532O13000", "invalid_structure")]
    #[case("D189370400440532013000", "invalid_structure")]
    #[case("XX89370400440532013000", "invalid_country_code")]
    #[case("AB1234567890", "invalid_country_code")]
    fn rejects_invalid_ibans(#[case] value: &str, #[case] kind: &str) {
        let err = Iban::new(registry(), value).unwrap_err();
        assert_eq!(err.kind(), kind, "{value}");
    }

    #[test]
    fn residue_alone_is_not_enough() {
        // 01 shares its mod-97 residue with 98.
        assert!(Iban::new(registry(), "DE98370400440532013032").is_ok());
        let fake = Iban::with_options(
            registry(),
            "DE01370400440532013032",
            IbanOptions {
                allow_invalid: true,
                ..IbanOptions::default()
            },
        )
        .unwrap();
        assert_eq!(checksum::mod_digits(&fake.numeric().unwrap(), 97).unwrap(), 1);
        assert_eq!(
            fake.validate(false),
            Err(ValidationError::InvalidChecksumDigits(
                "Invalid checksum digits".to_string()
            ))
        );
    }

    #[test]
    fn national_checksum_only_on_request() {
        // Valid IBAN check digits around a broken Belgian national checksum.
        let iban = Iban::from_bban(registry(), "BE", "539007547035", IbanOptions::default())
            .unwrap();
        let err = iban.validate(true).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBbanChecksum(_)));
        assert!(iban.validate(false).is_ok());
    }

    #[test]
    fn allow_invalid_defers_validation() {
        let iban = Iban::with_options(
            registry(),
            "AB1234567890",
            IbanOptions {
                allow_invalid: true,
                ..IbanOptions::default()
            },
        )
        .unwrap();
        assert!(!iban.is_valid());
        assert_eq!(iban.bank_code(), "");
    }

    #[test]
    fn generate_and_from_bban() {
        let iban = Iban::generate(registry(), "DE", "37040044", "532013000", "").unwrap();
        assert_eq!(iban.formatted(), "DE89 3704 0044 0532 0130 00");

        let iban = Iban::generate(registry(), "FR", "20041", "0500013M026", "01005").unwrap();
        assert_eq!(iban, "FR1420041010050500013M02606");

        let iban = Iban::from_bban(registry(), "gb", "NWBK 6016 1331 9268 19", IbanOptions::default())
            .unwrap();
        assert_eq!(iban, "GB29NWBK60161331926819");
    }

    #[test]
    fn numeric_is_one_mod_97() {
        let iban = Iban::new(registry(), "DE89370400440532013000").unwrap();
        assert_eq!(iban.numeric().unwrap(), "370400440532013000131489");
        assert_eq!(checksum::mod_digits(&iban.numeric().unwrap(), 97).unwrap(), 1);
    }

    #[test]
    fn random_ibans_validate() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for _ in 0..50 {
            let iban = Iban::random(registry(), &mut rng, &RandomOptions::default()).unwrap();
            assert!(iban.is_valid(), "{iban}");
            assert_eq!(iban.len(), iban.spec().unwrap().iban_length);
        }
    }

    #[test]
    fn length_counts_characters() {
        let options = IbanOptions {
            allow_invalid: true,
            ..IbanOptions::default()
        };
        let iban = Iban::with_options(registry(), "DE8937040044053201300Ä", options).unwrap();
        assert_eq!(iban.len(), 22);
        assert_eq!(iban.len(), iban.spec().unwrap().iban_length);
        assert_eq!(iban.validate(false).unwrap_err().kind(), "invalid_structure");
    }
}
