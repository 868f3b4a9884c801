//! Definition sources and locators
//!
//! A locator rule names its definition files with a path pattern such as
//! `effects/*.yaml`. [`SourceLocator`] turns that pattern into already-read
//! [`DefinitionSource`]s, so nothing past this module touches the file system.
//!
//! Wildcards (`*` for any run of characters, `?` for one) are accepted in the
//! file component only. Matches come back sorted by origin, which fixes the
//! order in which rules of a shared type are concatenated.

use crate::doke::error::{DokeError, DokeResult};
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Text of one definition file and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSource {
    pub origin: String,
    pub text: String,
}

impl DefinitionSource {
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }
}

/// Resolves a locator pattern to the sources it names, in a stable order.
pub trait SourceLocator: Send + Sync {
    fn locate(&self, pattern: &str) -> DokeResult<Vec<DefinitionSource>>;
}

/// Compile a file-name wildcard pattern to an anchored regex.
fn wildcard_regex(pattern: &str) -> DokeResult<Regex> {
    let mut expression = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expression.push_str("[^/]*"),
            '?' => expression.push_str("[^/]"),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression)
        .map_err(|err| DokeError::invalid_config(format!("locator '{}': {}", pattern, err)))
}

fn has_wildcards(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Reads definition files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsLocator {
    base: PathBuf,
}

impl FsLocator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn read(&self, relative: &Path) -> DokeResult<DefinitionSource> {
        let path = self.base.join(relative);
        let text = fs::read_to_string(&path).map_err(|err| DokeError::io(&path, err))?;
        Ok(DefinitionSource::new(
            relative.to_string_lossy().replace('\\', "/"),
            text,
        ))
    }
}

impl SourceLocator for FsLocator {
    fn locate(&self, pattern: &str) -> DokeResult<Vec<DefinitionSource>> {
        let (directory, file_pattern) = match pattern.rsplit_once('/') {
            Some((directory, file)) => (directory, file),
            None => ("", pattern),
        };
        if has_wildcards(directory) {
            return Err(DokeError::invalid_config(format!(
                "locator '{}': wildcards are only supported in the file name",
                pattern
            )));
        }

        if !has_wildcards(file_pattern) {
            return Ok(vec![self.read(Path::new(pattern))?]);
        }

        let matcher = wildcard_regex(file_pattern)?;
        let search_dir = self.base.join(directory);
        let entries = fs::read_dir(&search_dir).map_err(|err| DokeError::io(&search_dir, err))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DokeError::io(&search_dir, err))?;
            let is_file = entry
                .file_type()
                .map_err(|err| DokeError::io(entry.path(), err))?
                .is_file();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && matcher.is_match(&name) {
                names.push(name);
            }
        }
        names.sort();

        names
            .iter()
            .map(|name| self.read(&Path::new(directory).join(name)))
            .collect()
    }
}

/// Serves definition sources from memory, keyed by origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    sources: IndexMap<String, String>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, origin: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(origin, text);
        self
    }

    pub fn insert(&mut self, origin: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(origin.into(), text.into());
    }
}

impl SourceLocator for MemoryLocator {
    fn locate(&self, pattern: &str) -> DokeResult<Vec<DefinitionSource>> {
        let matcher = wildcard_regex(pattern)?;
        let mut found: Vec<DefinitionSource> = self
            .sources
            .iter()
            .filter(|(origin, _)| matcher.is_match(origin))
            .map(|(origin, text)| DefinitionSource::new(origin.as_str(), text.as_str()))
            .collect();
        found.sort_by(|a, b| a.origin.cmp(&b.origin));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_locator_wildcards_stay_in_one_directory() {
        let locator = MemoryLocator::new()
            .with_source("effects/stat_modifier.yaml", "a")
            .with_source("effects/damage.yaml", "b")
            .with_source("effects/old/heal.yaml", "c")
            .with_source("conditions/weather.yaml", "d");

        let origins: Vec<_> = locator
            .locate("effects/*.yaml")
            .unwrap()
            .into_iter()
            .map(|source| source.origin)
            .collect();
        assert_eq!(origins, vec!["effects/damage.yaml", "effects/stat_modifier.yaml"]);
    }

    #[test]
    fn test_memory_locator_exact_and_single_char() {
        let locator = MemoryLocator::new()
            .with_source("tier1.yaml", "a")
            .with_source("tier2.yaml", "b")
            .with_source("tier10.yaml", "c");
        assert_eq!(locator.locate("tier?.yaml").unwrap().len(), 2);
        assert_eq!(locator.locate("tier10.yaml").unwrap()[0].text, "c");
        assert!(locator.locate("missing.yaml").unwrap().is_empty());
    }

    #[test]
    fn test_fs_locator_sorted_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("effects")).unwrap();
        fs::write(dir.path().join("effects/b.yaml"), "B").unwrap();
        fs::write(dir.path().join("effects/a.yaml"), "A").unwrap();
        fs::write(dir.path().join("effects/notes.txt"), "skip").unwrap();

        let locator = FsLocator::new(dir.path());
        let found = locator.locate("effects/*.yaml").unwrap();
        assert_eq!(
            found,
            vec![
                DefinitionSource::new("effects/a.yaml", "A"),
                DefinitionSource::new("effects/b.yaml", "B"),
            ]
        );
    }

    #[test]
    fn test_fs_locator_plain_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let locator = FsLocator::new(dir.path());
        assert!(matches!(
            locator.locate("labels.yaml"),
            Err(DokeError::Io { .. })
        ));
    }

    #[test]
    fn test_wildcards_in_directories_are_rejected() {
        let locator = FsLocator::new(".");
        assert!(matches!(
            locator.locate("*/effects.yaml"),
            Err(DokeError::InvalidConfig { .. })
        ));
    }
}
