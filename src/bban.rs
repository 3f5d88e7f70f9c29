use crate::bic::Bic;
use crate::checksum;
use crate::domain::Component;
use crate::error::ValidationError;
use crate::registry::{BankEntry, Registry};
use crate::spec::CountrySpec;
use crate::util::{clean, get_slice, zfill};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Upper bound on candidates tried by [`Bban::random`].
pub const MAX_RANDOM_ATTEMPTS: usize = 100;

/// Knobs for random BBAN/IBAN generation.
#[derive(Debug, Clone)]
pub struct RandomOptions {
    /// Pin the country; otherwise one with directory entries is picked.
    pub country_code: Option<String>,
    /// Seed bank and branch codes from a real directory entry.
    pub use_registry: bool,
    /// Components taken as-is instead of being generated.
    pub values: BTreeMap<Component, String>,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self {
            country_code: None,
            use_registry: true,
            values: BTreeMap::new(),
        }
    }
}

impl RandomOptions {
    pub fn for_country(country_code: &str) -> Self {
        Self {
            country_code: Some(country_code.to_string()),
            ..Self::default()
        }
    }
}

/// The Basic Bank Account Number: the country specific part of an IBAN.
#[derive(Clone)]
pub struct Bban<'r> {
    registry: &'r Registry,
    country_code: String,
    value: String,
}

impl<'r> Bban<'r> {
    /// Wrap `value` as a BBAN of `country_code`. Only the country is checked;
    /// the body is validated as part of an [`crate::Iban`].
    pub fn new(
        registry: &'r Registry,
        country_code: &str,
        value: &str,
    ) -> Result<Self, ValidationError> {
        let country_code = clean(country_code);
        registry.spec(&country_code)?;
        Ok(Self::unchecked(registry, country_code, clean(value)))
    }

    pub(crate) fn unchecked(registry: &'r Registry, country_code: String, value: String) -> Self {
        Self {
            registry,
            country_code,
            value,
        }
    }

    /// Assemble a BBAN from its national components.
    ///
    /// Values shorter than their field are left-padded with zeros. A bank
    /// code exactly as wide as bank plus branch code together is split into
    /// both. The national check digits are computed when the country has an
    /// algorithm for them.
    pub fn from_components<I, S>(
        registry: &'r Registry,
        country_code: &str,
        values: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (Component, S)>,
        S: AsRef<str>,
    {
        let country_code = clean(country_code);
        let spec = registry.spec(&country_code)?;
        if !spec.has_positions() {
            return Err(ValidationError::UnsupportedCountry(country_code));
        }

        let provided: BTreeMap<Component, String> = values
            .into_iter()
            .map(|(component, value)| (component, clean(value.as_ref())))
            .collect();
        let mut components: BTreeMap<Component, String> = Component::ALL
            .iter()
            .map(|&component| {
                let value = provided.get(&component).map(String::as_str).unwrap_or("");
                (component, zfill(value, spec.range(component).len()))
            })
            .collect();

        let bank_width = spec.range(Component::BankCode).len();
        let branch_width = spec.range(Component::BranchCode).len();
        let account_width = spec.range(Component::AccountCode).len();

        let bank_code = component_of(&components, Component::BankCode).to_string();
        if char_len(&bank_code) == bank_width + branch_width {
            components.insert(
                Component::BranchCode,
                char_slice(&bank_code, bank_width, bank_width + branch_width),
            );
            components.insert(Component::BankCode, char_slice(&bank_code, 0, bank_width));
        }

        if char_len(component_of(&components, Component::BankCode)) > bank_width {
            return Err(ValidationError::InvalidBankCode(format!(
                "Bank code exceeds maximum size {bank_width}"
            )));
        }
        if char_len(component_of(&components, Component::BranchCode)) > branch_width {
            return Err(ValidationError::InvalidBranchCode(format!(
                "Branch code exceeds maximum size {branch_width}"
            )));
        }
        if char_len(component_of(&components, Component::AccountCode)) > account_width {
            return Err(ValidationError::InvalidAccountCode(format!(
                "Account code exceeds maximum size {account_width}"
            )));
        }

        let checksum = compute_national_checksum(&country_code, &components)?;
        if !checksum.is_empty() {
            components.insert(Component::NationalChecksumDigits, checksum);
        }

        let mut buffer: Vec<char> = vec!['0'; spec.bban_length];
        for (component, value) in &components {
            let range = spec.range(*component);
            if range.is_empty() {
                continue;
            }
            // Overlapping ranges are allowed: later components overwrite.
            let end = range.end.min(buffer.len());
            let start = range.start.min(end);
            buffer.splice(start..end, value.chars());
        }

        Ok(Self::unchecked(
            registry,
            country_code,
            buffer.into_iter().collect(),
        ))
    }

    /// Generate a random, structurally valid BBAN.
    ///
    /// Countries without component positions get a plain grammar-conformant
    /// string. Otherwise up to [`MAX_RANDOM_ATTEMPTS`] candidates are drawn
    /// and fed through [`Bban::from_components`].
    pub fn random<R: Rng + ?Sized>(
        registry: &'r Registry,
        rng: &mut R,
        options: &RandomOptions,
    ) -> Result<Self, ValidationError> {
        let country_code = match options.country_code.as_deref().map(clean) {
            Some(code) if !code.is_empty() => code,
            _ => registry
                .bank_countries()
                .choose(rng)
                .map(|code| code.to_string())
                .ok_or_else(|| {
                    ValidationError::InvalidCountryCode(
                        "No country available for random generation".to_string(),
                    )
                })?,
        };
        let spec = registry.spec(&country_code)?;
        let grammar = spec
            .grammar()
            .ok_or_else(|| ValidationError::UnsupportedCountry(country_code.clone()))?;

        let bank = if options.use_registry {
            registry
                .banks_by_country(&country_code)
                .and_then(|banks| banks.choose(rng))
        } else {
            None
        };
        let directory = bank
            .map(|bank| directory_components(spec, bank))
            .unwrap_or_default();

        if !spec.has_positions() {
            let value = grammar.random(rng);
            return Ok(Self::unchecked(registry, country_code, value));
        }

        let bank_width = spec.range(Component::BankCode).len();
        let branch_width = spec.range(Component::BranchCode).len();
        for attempt in 1..=MAX_RANDOM_ATTEMPTS {
            let candidate = grammar.random(rng);
            let mut components: BTreeMap<Component, String> = BTreeMap::new();
            for component in Component::ALL {
                let value = match options.values.get(&component) {
                    Some(value) => value.clone(),
                    None => directory
                        .get(&component)
                        .map(String::as_str)
                        .filter(|value| !value.is_empty())
                        .or_else(|| spec.default_value(component))
                        .unwrap_or_else(|| spec.range(component).cut(&candidate))
                        .to_string(),
                };
                components.insert(component, value);
            }

            let bank_code = component_of(&components, Component::BankCode).to_string();
            if char_len(&bank_code) >= bank_width + branch_width {
                components.insert(
                    Component::BranchCode,
                    char_slice(&bank_code, bank_width, bank_width + branch_width),
                );
            }
            for (component, value) in components.iter_mut() {
                *value = char_slice(value, 0, spec.range(*component).len());
            }

            match Self::from_components(registry, &country_code, components) {
                Ok(bban) if spec.matches_bban(bban.as_str()) => return Ok(bban),
                Ok(bban) => {
                    log::debug!(
                        "random {country_code} BBAN attempt {attempt} rejected: '{bban}' doesn't match '{}'",
                        spec.bban_spec
                    );
                }
                Err(err) => {
                    log::debug!("random {country_code} BBAN attempt {attempt} rejected: {err}");
                }
            }
        }
        Err(ValidationError::GenerateRandomOverflow {
            attempts: MAX_RANDOM_ATTEMPTS,
        })
    }

    /// Check the national check digits, using the bank's own algorithm when
    /// the directory names one. Countries without an algorithm always pass.
    pub fn validate_national_checksum(&self) -> Result<(), ValidationError> {
        let name = self
            .bank()
            .and_then(|bank| bank.checksum_algo.as_deref())
            .unwrap_or(checksum::DEFAULT_NAME);
        let Some(algorithm) = checksum::get(&self.country_code, name) else {
            return Ok(());
        };
        let components: Vec<&str> = algorithm
            .accepts()
            .iter()
            .map(|component| self.component(*component))
            .collect();
        if algorithm.validate(&components, self.national_checksum_digits())? {
            Ok(())
        } else {
            Err(ValidationError::InvalidBbanChecksum(
                "Invalid national checksum".to_string(),
            ))
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
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

    pub fn spec(&self) -> Result<&'r CountrySpec, ValidationError> {
        self.registry.spec(&self.country_code)
    }

    /// Slice of `component`; empty when the country does not define it or
    /// the value is too short.
    pub fn component(&self, component: Component) -> &str {
        match self.registry.country_spec(&self.country_code) {
            Some(spec) => {
                let range = spec.range(component);
                get_slice(&self.value, range.start, Some(range.end))
            }
            None => "",
        }
    }

    pub fn bank_code(&self) -> &str {
        self.component(Component::BankCode)
    }

    pub fn branch_code(&self) -> &str {
        self.component(Component::BranchCode)
    }

    pub fn account_code(&self) -> &str {
        self.component(Component::AccountCode)
    }

    /// Only present in a handful of countries, e.g. Brazil.
    pub fn account_id(&self) -> &str {
        self.component(Component::AccountId)
    }

    pub fn account_type(&self) -> &str {
        self.component(Component::AccountType)
    }

    /// Iceland's kennitala.
    pub fn account_holder_id(&self) -> &str {
        self.component(Component::AccountHolderId)
    }

    pub fn currency_code(&self) -> &str {
        self.component(Component::CurrencyCode)
    }

    pub fn national_checksum_digits(&self) -> &str {
        self.component(Component::NationalChecksumDigits)
    }

    fn lookup_key(&self) -> Option<String> {
        let spec = self.registry.country_spec(&self.country_code)?;
        Some(
            spec.bic_lookup_components
                .iter()
                .map(|component| self.component(*component))
                .collect(),
        )
    }

    /// BIC of the bank behind this BBAN, if the directory knows it.
    pub fn bic(&self) -> Option<Bic> {
        let key = self.lookup_key()?;
        Bic::from_bank_code(self.registry, &self.country_code, &key).ok()
    }

    /// First directory entry for this BBAN's bank.
    pub fn bank(&self) -> Option<&'r BankEntry> {
        let key = self.lookup_key()?;
        self.registry
            .banks_by_bank_code(&self.country_code, &key)
            .and_then(|entries| entries.first())
    }

    pub fn bank_name(&self) -> Option<&'r str> {
        self.bank().map(|bank| bank.name.as_str())
    }

    pub fn bank_short_name(&self) -> Option<&'r str> {
        self.bank().map(|bank| bank.short_name.as_str())
    }
}

fn compute_national_checksum(
    country_code: &str,
    components: &BTreeMap<Component, String>,
) -> Result<String, ValidationError> {
    let Some(algorithm) = checksum::get(country_code, checksum::DEFAULT_NAME) else {
        return Ok(String::new());
    };
    let values: Vec<&str> = algorithm
        .accepts()
        .iter()
        .map(|component| component_of(components, *component))
        .collect();
    algorithm.compute(&values)
}

fn component_of(components: &BTreeMap<Component, String>, component: Component) -> &str {
    components.get(&component).map(String::as_str).unwrap_or("")
}

/// Components seeded from a directory entry. The entry's bank code is the
/// concatenated lookup key, so it is split back along the country's
/// `bic_lookup_components`.
fn directory_components(spec: &CountrySpec, bank: &BankEntry) -> BTreeMap<Component, String> {
    let mut components = BTreeMap::new();
    let mut offset = 0;
    for component in &spec.bic_lookup_components {
        let width = spec.range(*component).len();
        components.insert(*component, char_slice(&bank.bank_code, offset, offset + width));
        offset += width;
    }
    if let Some(branch_code) = bank.branch_code.as_deref() {
        components
            .entry(Component::BranchCode)
            .or_insert_with(|| branch_code.to_string());
    }
    components
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn char_slice(value: &str, start: usize, end: usize) -> String {
    value
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

impl fmt::Display for Bban<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl fmt::Debug for Bban<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<BBAN={}>", self.value)
    }
}

impl PartialEq for Bban<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Bban<'_> {}

impl PartialOrd for Bban<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bban<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for Bban<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialEq<str> for Bban<'_> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for Bban<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn registry() -> &'static Registry {
        Registry::ensure_loaded().unwrap()
    }

    #[test]
    fn from_components_pads_and_assembles() {
        let bban = Bban::from_components(
            registry(),
            "DE",
            [
                (Component::BankCode, "37040044"),
                (Component::AccountCode, "532013000"),
            ],
        )
        .unwrap();
        assert_eq!(bban, "370400440532013000");
        assert_eq!(bban.bank_code(), "37040044");
        assert_eq!(bban.account_code(), "0532013000");
        assert_eq!(bban.branch_code(), "");
    }

    #[test]
    fn from_components_splits_combined_sort_code() {
        let bban = Bban::from_components(
            registry(),
            "GB",
            [
                (Component::BankCode, "NWBK601613"),
                (Component::AccountCode, "31926819"),
            ],
        )
        .unwrap();
        assert_eq!(bban, "NWBK60161331926819");
        assert_eq!(bban.bank_code(), "NWBK");
        assert_eq!(bban.branch_code(), "601613");
    }

    #[test]
    fn from_components_splices_national_checksum() {
        let bban = Bban::from_components(
            registry(),
            "BE",
            [
                (Component::BankCode, "539"),
                (Component::AccountCode, "0075470"),
            ],
        )
        .unwrap();
        assert_eq!(bban, "539007547034");
        assert_eq!(bban.national_checksum_digits(), "34");

        let bban = Bban::from_components(
            registry(),
            "FR",
            [
                (Component::BankCode, "20041"),
                (Component::BranchCode, "01005"),
                (Component::AccountCode, "0500013M026"),
            ],
        )
        .unwrap();
        assert_eq!(bban, "20041010050500013M02606");
    }

    #[test]
    fn from_components_rejects_oversized_fields() {
        let err = Bban::from_components(
            registry(),
            "DE",
            [(Component::BankCode, "370400441"), (Component::AccountCode, "1")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBankCode(_)));

        let err = Bban::from_components(
            registry(),
            "DE",
            [(Component::BankCode, "37040044"), (Component::AccountCode, "05320130001")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAccountCode(_)));

        let err = Bban::from_components(
            registry(),
            "FR",
            [(Component::BankCode, "20041"), (Component::BranchCode, "010051")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBranchCode(_)));
    }

    #[test]
    fn from_components_needs_positions() {
        let err = Bban::from_components(registry(), "LC", [(Component::BankCode, "HEMM")])
            .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedCountry("LC".to_string()));
        let err = Bban::from_components(registry(), "XX", [(Component::BankCode, "1")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCountryCode(_)));
    }

    #[test]
    fn lenient_component_reads() {
        let bban = Bban::new(registry(), "de", "3704").unwrap();
        assert_eq!(bban.country_code(), "DE");
        assert_eq!(bban.bank_code(), "");
        assert_eq!(bban.account_holder_id(), "");
        assert!(Bban::new(registry(), "XX", "1234").is_err());
    }

    #[test]
    fn national_checksum_validation() {
        let valid = Bban::new(registry(), "BE", "539007547034").unwrap();
        assert!(valid.validate_national_checksum().is_ok());
        let invalid = Bban::new(registry(), "BE", "539007547035").unwrap();
        assert!(matches!(
            invalid.validate_national_checksum(),
            Err(ValidationError::InvalidBbanChecksum(_))
        ));
        // No algorithm for Germany.
        let german = Bban::new(registry(), "DE", "370400440532013001").unwrap();
        assert!(german.validate_national_checksum().is_ok());
    }

    #[test]
    fn bank_lookups() {
        let bban = Bban::new(registry(), "DE", "370400440532013000").unwrap();
        assert_eq!(bban.bank_name(), Some("Commerzbank"));
        assert_eq!(bban.bank_short_name(), Some("Commerzbank Köln"));
        assert_eq!(bban.bic().map(|bic| bic.to_string()), Some("COBADEFFXXX".to_string()));

        let unknown = Bban::new(registry(), "DE", "999999990532013000").unwrap();
        assert!(unknown.bank().is_none());
        assert!(unknown.bic().is_none());
    }

    #[test]
    fn random_without_positions_uses_grammar() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bban = Bban::random(registry(), &mut rng, &RandomOptions::for_country("LC")).unwrap();
        let spec = registry().spec("LC").unwrap();
        assert!(spec.matches_bban(bban.as_str()));
        assert_eq!(bban.as_str(), bban.as_str().to_uppercase());
    }

    #[test]
    fn random_respects_pinned_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut options = RandomOptions::for_country("DE");
        options
            .values
            .insert(Component::BankCode, "37040044".to_string());
        for _ in 0..20 {
            let bban = Bban::random(registry(), &mut rng, &options).unwrap();
            assert_eq!(bban.bank_code(), "37040044");
            assert_eq!(bban.len(), 18);
        }
    }

    #[test]
    fn random_is_deterministic_for_a_seed() {
        let options = RandomOptions::default();
        let first = Bban::random(registry(), &mut ChaCha8Rng::seed_from_u64(3), &options).unwrap();
        let second = Bban::random(registry(), &mut ChaCha8Rng::seed_from_u64(3), &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.country_code(), second.country_code());
    }
}
