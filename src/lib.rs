//! Offline IBAN, BBAN and BIC validation.
//!
//! Everything is driven by a [`Registry`] of country specs and bank directory
//! entries. Load it once with [`Registry::ensure_loaded`] (or build one from
//! any [`DataSource`] with [`Registry::load`]) and hand it to the value types:
//!
//! ```
//! use ibanbic::{Iban, Registry};
//!
//! let registry = Registry::ensure_loaded().unwrap();
//! let iban = Iban::new(registry, "DE89 3704 0044 0532 0130 00").unwrap();
//! assert_eq!(iban.bank_code(), "37040044");
//! assert_eq!(iban.bank_name(), Some("Commerzbank"));
//! ```

pub mod bban;
pub mod bic;
pub mod checksum;
pub mod domain;
pub mod error;
pub mod iban;
pub mod reference;
pub mod registry;
pub mod source;
pub mod spec;
pub mod util;

pub use bban::{Bban, RandomOptions};
pub use bic::{Bic, BicOptions, BicType};
pub use domain::{Component, Range};
pub use error::{RegistryError, ValidationError};
pub use iban::{Iban, IbanOptions};
pub use registry::{BankEntry, Registry};
pub use source::{BundledSource, DataSource, DirectorySource, Fragment, StaticSource};
pub use spec::CountrySpec;
