//! Version comparison and aggregation.
//!
//! Catalog versions are date-like numerals (`YYYYMMDD`), stored as strings.
//! Ordering is strictly numeric; a version string that does not parse as an
//! unsigned integer is a hard error, never a silent coercion.

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version '{0}' is not numeric")]
    NotNumeric(String),
    #[error("cannot aggregate an empty version list")]
    Empty,
}

fn parse(v: &str) -> Result<u64, VersionError> {
    v.trim()
        .parse::<u64>()
        .map_err(|_| VersionError::NotNumeric(v.to_string()))
}

/// Compare two version strings numerically.
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(parse(a)?.cmp(&parse(b)?))
}

/// Return the greatest version among `versions`.
///
/// Ties keep the first occurrence. Calling with an empty iterator is a
/// contract violation and returns [`VersionError::Empty`].
pub fn max_version<I, S>(versions: I) -> Result<String, VersionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(u64, String)> = None;
    for v in versions {
        let n = parse(v.as_ref())?;
        match &best {
            Some((m, _)) if *m >= n => {}
            _ => best = Some((n, v.as_ref().to_string())),
        }
    }
    best.map(|(_, s)| s).ok_or(VersionError::Empty)
}

/// Merge a previously stamped version with freshly computed child versions.
///
/// The prior stamp participates in the max so a rerun never moves a version
/// backward even when a child artifact was temporarily not rebuilt. An empty
/// prior stamp is ignored, letting newly added documents start blank.
pub fn fold_version<I, S>(prior: &str, children: I) -> Result<String, VersionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut all: Vec<String> = children
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();
    if !prior.trim().is_empty() {
        all.push(prior.to_string());
    }
    max_version(all)
}
