//! Dataset naming conventions.
//!
//! Grammar, applied independently to the same name (first match wins):
//!
//! ```text
//! dataset id     \.?(?:00)?([0-9]{6,8})\.?     capture: 6-8 digits, optional "00" prefix dropped
//! generator tag  \.?(e[0-9]{4})_?              capture: "e" + 4 digits
//! ```
//!
//! Digits are ASCII only.
//!
//! A name like `user.jdoe.00410000.ttbar.DAOD_SUSY10.e3698_s2608_r6630_p2375`
//! yields `("410000", "e3698")`.

use once_cell::sync::Lazy;
use regex::Regex;

use gw_core::{Error, Result, Sample, SampleSource};

static DATASET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.?(?:00)?([0-9]{6,8})\.?").unwrap());
static GENERATOR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.?(e[0-9]{4})_?").unwrap());

/// Extract the dataset id from a sample name.
pub fn dataset_id(name: &str) -> Result<String> {
    capture(&DATASET_ID, name, "no 6-8 digit dataset id")
}

/// Extract the generator tag from a sample name.
pub fn generator_tag(name: &str) -> Result<String> {
    capture(&GENERATOR_TAG, name, "no e#### generator tag")
}

/// Extract `(dataset_id, generator_tag)`; fails if either is missing.
pub fn identifiers(name: &str) -> Result<(String, String)> {
    Ok((dataset_id(name)?, generator_tag(name)?))
}

/// Resolve a discovered source into a [`Sample`].
pub fn parse_sample(source: SampleSource) -> Result<Sample> {
    let (dataset_id, generator_tag) = identifiers(&source.name)?;
    Ok(Sample { dataset_id, generator_tag, name: source.name, files: source.files })
}

/// Catalog pattern of the generation-level dataset behind a sample, with `%`
/// standing for the physics short name.
pub fn evnt_pattern(project: &str, dataset_id: &str, generator_tag: &str) -> String {
    format!("{project}.{dataset_id}.%.evgen.EVNT.{generator_tag}")
}

/// Whether a sample carries well-formed identifiers.
pub fn is_well_formed(sample: &Sample) -> bool {
    let id = &sample.dataset_id;
    let tag = &sample.generator_tag;
    (6..=8).contains(&id.len())
        && id.bytes().all(|b| b.is_ascii_digit())
        && tag.len() == 5
        && tag.starts_with('e')
        && tag[1..].bytes().all(|b| b.is_ascii_digit())
}

fn capture(re: &Regex, name: &str, reason: &str) -> Result<String> {
    re.captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::UnparsableName { name: name.to_string(), reason: reason.to_string() })
}
