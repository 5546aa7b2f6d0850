//! Per-command argument metadata.

use super::scanner::ArgScanner;
use crate::localize::Localizer;
use crate::validate::{ArgChecks, ValidationTree};

/// Static metadata for one command argument.
///
/// Immutable once constructed; owned by the command declaring it. The
/// alias keys are localization keys — the first one is the canonical
/// alias used in by-name scanning and in error messages.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// Unique name within the command.
    pub name: &'static str,
    /// Localization keys of the accepted aliases, canonical first.
    pub alias_keys: &'static [&'static str],
    /// The scanning strategy.
    pub scanner: ArgScanner,
    /// Validation flags (auto-completed at registration).
    pub checks: ArgChecks,
    /// Always resolve from the default, never from positional text.
    pub skip_in_positional: bool,
    /// Localization key of the help text.
    pub help_key: &'static str,
}

impl ArgSpec {
    /// Create a spec with no checks and default policies.
    #[must_use]
    pub fn new(
        name: &'static str,
        alias_keys: &'static [&'static str],
        scanner: ArgScanner,
    ) -> Self {
        Self {
            name,
            alias_keys,
            scanner,
            checks: ArgChecks::default(),
            skip_in_positional: false,
            help_key: "",
        }
    }

    /// Set the validation flags.
    #[must_use]
    pub const fn checks(mut self, checks: ArgChecks) -> Self {
        self.checks = checks;
        self
    }

    /// Mark the argument as skipped during positional scans.
    #[must_use]
    pub const fn skip_in_positional(mut self) -> Self {
        self.skip_in_positional = true;
        self
    }

    /// Set the help text key.
    #[must_use]
    pub const fn help(mut self, key: &'static str) -> Self {
        self.help_key = key;
        self
    }

    /// The canonical (localized) alias, falling back to the name.
    #[must_use]
    pub fn canonical_alias(&self, catalog: &dyn Localizer) -> String {
        self.alias_keys
            .first()
            .and_then(|key| catalog.text(key))
            .unwrap_or(self.name)
            .to_string()
    }
}

/// The ordered argument set of one command.
///
/// Construction runs check auto-completion against the shared validation
/// tree, so declaring only a leaf flag (`roles_only`) is enough — the
/// implied ancestors are filled in here, once, not per request.
#[derive(Debug, Clone)]
pub struct ArgSet {
    specs: Vec<ArgSpec>,
}

impl ArgSet {
    /// Build a set, auto-completing each spec's checks.
    ///
    /// # Panics
    ///
    /// Panics when two specs share a name — a programming error in the
    /// command declaration.
    #[must_use]
    pub fn new(tree: &ValidationTree, mut specs: Vec<ArgSpec>) -> Self {
        for i in 1..specs.len() {
            assert!(
                specs[..i].iter().all(|s| s.name != specs[i].name),
                "duplicate argument name `{}`",
                specs[i].name
            );
        }
        for spec in &mut specs {
            spec.checks = tree.auto_complete(&spec.checks);
        }
        Self { specs }
    }

    /// The specs in declaration order.
    #[must_use]
    pub fn specs(&self) -> &[ArgSpec] {
        &self.specs
    }

    /// Look up a spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgSpec> {
        self.specs.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::StaticCatalog;
    use crate::validate::ArgChecks;

    #[test]
    fn test_arg_set_auto_completes() {
        let tree = ValidationTree::standard();
        let set = ArgSet::new(
            &tree,
            vec![
                ArgSpec::new("targets", &["args.alias.targets"], ArgScanner::SubjectList).checks(
                    ArgChecks {
                        roles_only: true,
                        ..ArgChecks::default()
                    },
                ),
            ],
        );
        let spec = set.get("targets").unwrap();
        assert!(spec.checks.entity_list);
        assert!(spec.checks.non_null);
    }

    #[test]
    #[should_panic(expected = "duplicate argument name")]
    fn test_duplicate_names_rejected() {
        let tree = ValidationTree::standard();
        let _ = ArgSet::new(
            &tree,
            vec![
                ArgSpec::new("a", &["args.alias.time"], ArgScanner::Simple),
                ArgSpec::new("a", &["args.alias.message"], ArgScanner::Simple),
            ],
        );
    }

    #[test]
    fn test_canonical_alias() {
        let catalog = StaticCatalog::english();
        let spec = ArgSpec::new("t", &["args.alias.time"], ArgScanner::Time);
        assert_eq!(spec.canonical_alias(&catalog), "time");

        let spec = ArgSpec::new("t", &["no.such.key"], ArgScanner::Time);
        assert_eq!(spec.canonical_alias(&catalog), "t");
    }
}
