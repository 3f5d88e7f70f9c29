use ibanbic::{
    Bban, Bic, BicOptions, Component, Iban, IbanOptions, RandomOptions, Registry, ValidationError,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rstest::rstest;

fn registry() -> &'static Registry {
    Registry::ensure_loaded().unwrap()
}

#[test]
fn bban_from_german_components() {
    let bban = Bban::from_components(
        registry(),
        "DE",
        [
            (Component::BankCode, "37040044"),
            (Component::AccountCode, "0532013000"),
        ],
    )
    .unwrap();
    assert_eq!(bban.compact(), "370400440532013000");
}

#[test]
fn iban_with_spaces_parses() {
    let iban = Iban::new(registry(), "DE89 3704 0044 0532 0130 00").unwrap();
    assert!(iban.is_valid());
    assert_eq!(iban.country_code(), "DE");
    assert_eq!(iban.checksum_digits(), "89");
    assert_eq!(iban.bank_code(), "37040044");
    assert_eq!(iban.account_code(), "0532013000");
    assert_eq!(iban.formatted(), "DE89 3704 0044 0532 0130 00");
}

#[rstest]
#[case(false)]
#[case(true)]
fn bic_components(#[case] swift: bool) {
    let options = BicOptions {
        enforce_swift_compliance: swift,
        ..BicOptions::default()
    };
    let bic = Bic::with_options("GENODEM1GLS", options).unwrap();
    assert_eq!(bic.bank_code(), "GENO");
    assert_eq!(bic.country_code(), "DE");
    assert_eq!(bic.location_code(), "M1");
    assert_eq!(bic.branch_code(), "GLS");
    assert!(bic.validate(swift).is_ok());
}

#[test]
fn unvalidated_bic_reports_invalid() {
    let options = BicOptions {
        allow_invalid: true,
        ..BicOptions::default()
    };
    let bic = Bic::with_options("FOOBARBAZ", options).unwrap();
    assert!(!bic.is_valid());
    assert!(Bic::new("FOOBARBAZ").is_err());
}

#[test]
fn unvalidated_iban_reports_invalid() {
    let options = IbanOptions {
        allow_invalid: true,
        ..IbanOptions::default()
    };
    let iban = Iban::with_options(registry(), "AB1234567890", options).unwrap();
    assert!(!iban.is_valid());
    assert_eq!(
        iban.validate(false).unwrap_err().kind(),
        "invalid_country_code"
    );
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(2024)]
fn random_without_positions_follows_grammar(#[case] seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spec = registry().spec("LC").unwrap();
    assert!(!spec.has_positions());

    let bban = Bban::random(registry(), &mut rng, &RandomOptions::for_country("LC")).unwrap();
    assert_eq!(bban.len(), spec.bban_length);
    assert!(spec.matches_bban(bban.as_str()));
    assert_eq!(bban.as_str(), bban.as_str().to_uppercase());

    let err = Bban::from_components(registry(), "LC", [(Component::BankCode, "ABCD")]).unwrap_err();
    assert_eq!(err, ValidationError::UnsupportedCountry("LC".to_string()));
}

#[rstest]
#[case("FR", "30004", "BNPAFRPP")]
#[case("FR", "20041", "PSSTFRPPXXX")]
#[case("DE", "37040044", "COBADEFFXXX")]
fn bank_code_lookup(#[case] country: &str, #[case] bank_code: &str, #[case] expected: &str) {
    let bic = Bic::from_bank_code(registry(), country, bank_code).unwrap();
    assert_eq!(bic.as_str(), expected);
}

#[rstest]
#[case("DE", "99999999")]
#[case("DE", "76026000")]
fn unresolvable_bank_code_lookup_fails(#[case] country: &str, #[case] bank_code: &str) {
    let err = Bic::from_bank_code(registry(), country, bank_code).unwrap_err();
    assert_eq!(err.kind(), "invalid_bank_code");
    let err = Bic::candidates_from_bank_code(registry(), country, bank_code).unwrap_err();
    assert_eq!(err.kind(), "invalid_bank_code");
}

#[test]
fn iban_resolves_bank_from_directory() {
    let iban = Iban::new(registry(), "DE89370400440532013000").unwrap();
    assert_eq!(iban.bic().unwrap().as_str(), "COBADEFFXXX");
    assert_eq!(iban.bank_name(), Some("Commerzbank"));
    assert!(iban.in_sepa_zone().unwrap());
}
