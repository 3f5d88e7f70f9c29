use crate::domain::{Component, Range};
use crate::error::RegistryError;
use crate::util::{random_alphanum_upper, random_digits, random_upper_letters};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static GRAMMAR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(!)?([nace])").expect("grammar token regex is valid")
});

/// Character class of one grammar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Digit,
    Letter,
    Alphanumeric,
    Space,
}

impl CharClass {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "n" => Some(CharClass::Digit),
            "a" => Some(CharClass::Letter),
            "c" => Some(CharClass::Alphanumeric),
            "e" => Some(CharClass::Space),
            _ => None,
        }
    }

    fn regex(&self) -> &'static str {
        match self {
            CharClass::Digit => "[0-9]",
            CharClass::Letter => "[A-Z]",
            CharClass::Alphanumeric => "[A-Za-z0-9]",
            CharClass::Space => " ",
        }
    }
}

/// A piece of a BBAN grammar such as `8!n` (exactly eight digits) or
/// `12c` (one to twelve alphanumerics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarPart {
    Token {
        count: usize,
        exact: bool,
        class: CharClass,
    },
    Literal(String),
}

/// Parsed positional grammar, e.g. `4!n4!n2!a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BbanGrammar {
    parts: Vec<GrammarPart>,
}

impl BbanGrammar {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in GRAMMAR_TOKEN.captures_iter(spec) {
            let whole = caps.get(0).ok_or_else(|| "empty grammar match".to_string())?;
            if whole.start() > last {
                parts.push(GrammarPart::Literal(spec[last..whole.start()].to_string()));
            }
            let count = caps[1]
                .parse::<usize>()
                .map_err(|err| format!("invalid count in '{spec}': {err}"))?;
            let class = CharClass::from_code(&caps[3])
                .ok_or_else(|| format!("invalid character class in '{spec}'"))?;
            parts.push(GrammarPart::Token {
                count,
                exact: caps.get(2).is_some(),
                class,
            });
            last = whole.end();
        }
        if last < spec.len() {
            parts.push(GrammarPart::Literal(spec[last..].to_string()));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[GrammarPart] {
        &self.parts
    }

    /// Anchored regular expression source for this grammar.
    pub fn to_regex(&self) -> String {
        let mut out = String::from("^");
        for part in &self.parts {
            match part {
                GrammarPart::Token {
                    count,
                    exact: true,
                    class,
                } => out.push_str(&format!("{}{{{}}}", class.regex(), count)),
                GrammarPart::Token {
                    count,
                    exact: false,
                    class,
                } => out.push_str(&format!("{}{{1,{}}}", class.regex(), count)),
                GrammarPart::Literal(text) => out.push_str(text),
            }
        }
        out.push('$');
        out
    }

    /// Random uppercase string matching the grammar.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                GrammarPart::Token {
                    count,
                    exact,
                    class,
                } => {
                    let len = if *exact || *count <= 1 {
                        *count
                    } else {
                        rng.gen_range(1..=*count)
                    };
                    match class {
                        CharClass::Digit => out.push_str(&random_digits(rng, len)),
                        CharClass::Letter => out.push_str(&random_upper_letters(rng, len)),
                        CharClass::Alphanumeric => {
                            out.push_str(&random_alphanum_upper(rng, len))
                        }
                        CharClass::Space => out.push_str(&" ".repeat(len)),
                    }
                }
                GrammarPart::Literal(text) => out.push_str(&text.to_uppercase()),
            }
        }
        out
    }
}

fn default_lookup_components() -> Vec<Component> {
    vec![Component::BankCode]
}

/// Per-country BBAN/IBAN layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountrySpec {
    pub bban_spec: String,
    pub bban_length: usize,
    pub iban_length: usize,
    #[serde(default)]
    pub in_sepa_zone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<BTreeMap<Component, Range>>,
    #[serde(default = "default_lookup_components")]
    pub bic_lookup_components: Vec<Component>,
    /// Remaining keys, e.g. `default_branch_code`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    grammar: Option<BbanGrammar>,
    #[serde(skip)]
    pattern: Option<Regex>,
}

impl CountrySpec {
    /// The one-time enrichment pass: parse the grammar, compile its regex and
    /// check every position range against the BBAN length.
    pub fn compile(&mut self, country_code: &str) -> Result<(), RegistryError> {
        let invalid = |message: String| RegistryError::InvalidSpec {
            country: country_code.to_string(),
            message,
        };
        if let Some(positions) = &self.positions {
            for (component, range) in positions {
                if range.start > range.end || range.end > self.bban_length {
                    return Err(invalid(format!(
                        "{} range [{}, {}) outside BBAN length {}",
                        component, range.start, range.end, self.bban_length
                    )));
                }
            }
        }
        if self.pattern.is_some() {
            return Ok(());
        }
        let grammar = BbanGrammar::parse(&self.bban_spec).map_err(invalid)?;
        let pattern = Regex::new(&grammar.to_regex()).map_err(|err| invalid(err.to_string()))?;
        self.grammar = Some(grammar);
        self.pattern = Some(pattern);
        Ok(())
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn grammar(&self) -> Option<&BbanGrammar> {
        self.grammar.as_ref()
    }

    pub fn has_positions(&self) -> bool {
        self.positions.is_some()
    }

    /// Position of `component`, empty when the country does not define it.
    pub fn range(&self, component: Component) -> Range {
        self.positions
            .as_ref()
            .and_then(|positions| positions.get(&component))
            .copied()
            .unwrap_or_default()
    }

    pub fn default_value(&self, component: Component) -> Option<&str> {
        self.extra
            .get(&format!("default_{}", component.as_str()))
            .and_then(|value| value.as_str())
    }

    pub fn matches_bban(&self, bban: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|pattern| pattern.is_match(bban))
            .unwrap_or(false)
    }
}
