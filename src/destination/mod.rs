//! Destination selection: the Worldwide sentinel plus a list of countries.

mod countries;

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

pub const WORLDWIDE: &str = "Worldwide";

/// Used when a country list file cannot be loaded.
pub const FALLBACK: [&str; 6] = [WORLDWIDE, "USA", "France", "Egypt", "Japan", "Italy"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination(String);

impl Destination {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn worldwide() -> Self {
        Self(WORLDWIDE.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_worldwide(&self) -> bool {
        self.0 == WORLDWIDE
    }

    /// Phrase used in persona templates.
    pub fn describe(&self) -> &str {
        if self.is_worldwide() {
            "destinations around the world"
        } else {
            &self.0
        }
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::worldwide()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selectable destinations. `Worldwide` is always first; countries follow sorted.
#[derive(Debug, Clone)]
pub struct Destinations {
    names: Vec<String>,
}

impl Destinations {
    /// Worldwide plus every ISO 3166 country.
    pub fn builtin() -> Self {
        Self::from_names(countries::COUNTRIES.iter().copied())
    }

    pub fn fallback() -> Self {
        Self::from_names(FALLBACK.iter().copied())
    }

    /// Loads one name per line, skipping blanks and `#` comments.
    /// Falls back to the six-entry list if the file cannot be read.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::from_names(
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#')),
                );
                debug!(path = %path.display(), count = list.names.len(), "destinations loaded");
                list
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read country list, using fallback");
                Self::fallback()
            }
        }
    }

    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut countries: Vec<String> = names
            .into_iter()
            .filter(|name| !name.eq_ignore_ascii_case(WORLDWIDE))
            .map(str::to_string)
            .collect();
        countries.sort();
        countries.dedup();

        let mut names = Vec::with_capacity(countries.len() + 1);
        names.push(WORLDWIDE.to_string());
        names.extend(countries);
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Case-insensitive lookup. Returns the canonical spelling.
    pub fn find(&self, input: &str) -> Option<Destination> {
        let input = input.trim();
        self.names
            .iter()
            .find(|name| name.to_lowercase() == input.to_lowercase())
            .map(|name| Destination::new(name.clone()))
    }
}
