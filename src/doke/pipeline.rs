//! End-to-end parsing
//!
//! [`DokeParser`] owns a root config, the locator that finds its definition
//! sources and the registry built from them. Parsing a document runs:
//!
//! 1. split into frontmatter, body and trailing text
//! 2. build the statement forest of the body
//! 3. assemble the root resource from the forest
//!
//! Each parse dereferences the registry handle once, so a concurrent
//! [`DokeParser::reload`] never changes the grammar under a parse in flight.

use crate::doke::assembling::{Assembler, AssemblyOptions};
use crate::doke::config::RootConfig;
use crate::doke::document::{split, Frontmatter};
use crate::doke::error::DokeResult;
use crate::doke::grammar::load_source;
use crate::doke::matching::{MatchOptions, MatchTrace, SentenceMatcher};
use crate::doke::registry::{Registry, RegistryBuilder, RegistryHandle};
use crate::doke::sources::{FsLocator, SourceLocator};
use crate::doke::statements::StatementTreeBuilder;
use crate::doke::value::Value;
use doke_config::DokeSettings;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub root: Value,
    /// Handed on to the post-construction hook of the root type.
    pub frontmatter: Frontmatter,
}

/// Parses documents against one root config.
pub struct DokeParser {
    config: RootConfig,
    locator: Arc<dyn SourceLocator>,
    registry: RegistryHandle,
    match_options: MatchOptions,
    assembly_options: AssemblyOptions,
}

impl DokeParser {
    /// Build the registry for `config` from the sources `locator` finds.
    pub fn new(config: RootConfig, locator: Arc<dyn SourceLocator>) -> DokeResult<Self> {
        let registry = build_registry(&config, locator.as_ref())?;
        let assembly_options = AssemblyOptions {
            exhaustive: config.exhaustive.unwrap_or(false),
        };
        Ok(Self {
            config,
            locator,
            registry: RegistryHandle::new(registry),
            match_options: MatchOptions::default(),
            assembly_options,
        })
    }

    /// Load a root config file; locator patterns are relative to its directory.
    pub fn from_config_file(path: impl AsRef<Path>) -> DokeResult<Self> {
        let path = path.as_ref();
        let config = RootConfig::load(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(config, Arc::new(FsLocator::new(base)))
    }

    /// Apply matching and assembly settings. The config's own `exhaustive`
    /// key wins over the settings.
    pub fn with_settings(mut self, settings: &DokeSettings) -> Self {
        self.match_options = MatchOptions::from(&settings.matching);
        let mut assembly = AssemblyOptions::from(&settings.assembly);
        if let Some(exhaustive) = self.config.exhaustive {
            assembly.exhaustive = exhaustive;
        }
        self.assembly_options = assembly;
        self
    }

    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    pub fn with_assembly_options(mut self, options: AssemblyOptions) -> Self {
        self.assembly_options = options;
        self
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    /// The registry parses started now will use.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.snapshot()
    }

    /// Rebuild the registry from the current definition sources and swap it in.
    ///
    /// On failure the previous registry stays installed.
    pub fn reload(&self) -> DokeResult<()> {
        let registry = build_registry(&self.config, self.locator.as_ref())?;
        let types = registry.len();
        self.registry.install(registry);
        tracing::debug!(types, "registry reloaded");
        Ok(())
    }

    /// Parse one raw document.
    pub fn parse(&self, raw: &str) -> DokeResult<ParsedDocument> {
        self.run(raw, None)
    }

    /// Parse one raw document, recording every match attempt in `trace`.
    pub fn parse_traced(&self, raw: &str, trace: &MatchTrace) -> DokeResult<ParsedDocument> {
        self.run(raw, Some(trace))
    }

    /// Parse documents in parallel. Results are in input order and a failure
    /// only affects its own document.
    pub fn parse_all<S>(&self, documents: &[S]) -> Vec<DokeResult<ParsedDocument>>
    where
        S: AsRef<str> + Sync,
    {
        documents
            .par_iter()
            .map(|raw| self.parse(raw.as_ref()))
            .collect()
    }

    fn run(&self, raw: &str, trace: Option<&MatchTrace>) -> DokeResult<ParsedDocument> {
        let registry = self.registry.snapshot();

        // Step 1: Frontmatter / body / trailing
        let document = split(raw)?;

        // Step 2: Statement forest
        let statements = StatementTreeBuilder::starting_at_line(document.spans.body_line).build(&document.body);

        // Step 3: Assembly
        let mut matcher = SentenceMatcher::new(&registry)
            .with_frontmatter(&document.frontmatter)
            .with_options(self.match_options);
        if let Some(trace) = trace {
            matcher = matcher.with_trace(trace);
        }
        let root = Assembler::new(&matcher)
            .with_options(self.assembly_options)
            .with_root_line(document.spans.body_line)
            .assemble(&self.config.root, &statements, &self.config.children)?;

        Ok(ParsedDocument {
            root,
            frontmatter: document.frontmatter,
        })
    }
}

/// Load every locator rule's sources into a fresh registry.
pub fn build_registry(config: &RootConfig, locator: &dyn SourceLocator) -> DokeResult<Registry> {
    let mut builder = RegistryBuilder::new();

    for rule in &config.parsers {
        builder.declare(&rule.for_type);

        let sources = locator.locate(&rule.parser)?;
        if sources.is_empty() {
            tracing::warn!(
                for_type = rule.for_type.as_str(),
                parser = rule.parser.as_str(),
                "locator matched no definition sources"
            );
        }

        let mut contributes = false;
        for source in &sources {
            let types = load_source(source)?;
            contributes |= types.iter().any(|grammar_type| grammar_type.name == rule.for_type);
            builder.add_types(types);
        }
        if !sources.is_empty() && !contributes {
            tracing::warn!(
                for_type = rule.for_type.as_str(),
                parser = rule.parser.as_str(),
                "located sources contribute no rules to the type they are loaded for"
            );
        }

        if !rule.children.is_empty() {
            builder.attach_children(&rule.for_type, rule.children.clone(), &rule.parser);
        }
    }

    let registry = builder.build()?;
    config
        .children
        .validate(&format!("root type '{}'", config.root), |name| registry.contains(name))?;

    if config.children.is_empty() {
        tracing::warn!(root = config.root.as_str(), "root config declares no children fields");
    }
    Ok(registry)
}

impl std::fmt::Debug for DokeParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DokeParser")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("match_options", &self.match_options)
            .field("assembly_options", &self.assembly_options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doke::error::DokeError;
    use crate::doke::sources::MemoryLocator;
    use crate::doke::testing::{walkthrough_locator, walkthrough_parser, ROOT_CONFIG, SAMPLE_DOCUMENT};

    #[test]
    fn test_parse_sample_document() {
        let parser = walkthrough_parser();
        let parsed = parser.parse(SAMPLE_DOCUMENT).unwrap();

        assert_eq!(parsed.root.type_name(), Some("Item"));
        assert_eq!(parsed.frontmatter.len(), 2);
        let effects = parsed.root.field("effects").unwrap().as_list().unwrap();
        assert_eq!(effects.len(), 4);
    }

    #[test]
    fn test_malformed_frontmatter_is_reported() {
        let parser = walkthrough_parser();
        let err = parser.parse("---\n- not a mapping\n---\n- Heals 2\n---\n").unwrap_err();
        assert!(matches!(err, DokeError::MalformedDocument { .. }));
    }

    #[test]
    fn test_text_before_delimiters_reads_whole_document() {
        let parser = walkthrough_parser();
        let parsed = parser
            .parse("Intro line\n---\nname: x\n---\n- Heals 2\n---\n")
            .unwrap();

        assert!(parsed.frontmatter.is_empty());
        let effects = parsed.root.field("effects").unwrap().as_list().unwrap();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_unknown_root_child_type_fails_at_build() {
        let config = RootConfig::from_yaml("root: Item\nchildren:\n  - effects: [Spell]\n").unwrap();
        let err = DokeParser::new(config, Arc::new(MemoryLocator::new())).unwrap_err();
        match err {
            DokeError::UnknownTypeReference {
                type_name,
                referenced_by,
            } => {
                assert_eq!(type_name, "Spell");
                assert!(referenced_by.contains("root type 'Item'"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_reload_swaps_registry_without_touching_snapshots() {
        let config = RootConfig::from_yaml(ROOT_CONFIG).unwrap();
        let parser = DokeParser::new(config, Arc::new(walkthrough_locator())).unwrap();

        let before = parser.registry();
        parser.reload().unwrap();
        let after = parser.registry();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_config_exhaustive_overrides_settings() {
        let config = RootConfig::from_yaml(&format!("{}exhaustive: true\n", ROOT_CONFIG)).unwrap();
        let settings = doke_config::load_defaults().unwrap();
        let parser = DokeParser::new(config, Arc::new(walkthrough_locator()))
            .unwrap()
            .with_settings(&settings);
        assert!(parser.assembly_options.exhaustive);
    }

    #[test]
    fn test_parse_all_keeps_order_and_isolates_failures() {
        let parser = walkthrough_parser();
        let documents = vec![
            SAMPLE_DOCUMENT.to_string(),
            "---\n[broken\n---\n---\n".to_string(),
            "- Heals 3\n".to_string(),
        ];
        let results = parser.parse_all(&documents);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        let third = results[2].as_ref().unwrap();
        assert_eq!(third.root.field("effects").unwrap().as_list().unwrap().len(), 1);
    }
}
