//! Argument resolution: raw command text to a validated value map.
//!
//! The resolver picks one of two modes per invocation. When the text
//! contains an unquoted `-name` marker, every argument's value is located
//! independently by its alias (order-free). Otherwise scanning is strictly
//! positional: each scanner consumes from the offset the previous one left,
//! so this path can never be reordered or parallelized. After scanning,
//! unresolved arguments fall back to the command-supplied default text,
//! which runs through the same scanner — defaults use the same grammar the
//! user would. Every defined argument ends up with an entry (possibly
//! empty) before validation runs over the whole set.

use super::definition::{ArgSet, ArgSpec};
use super::scanner::{ArgValue, ScanContext, ScanMode};
use crate::error::Result;
use crate::validate::{ValidationContext, ValidationTree};
use std::collections::HashMap;
use tracing::trace;

/// Default marker introducing a named argument.
pub const ARG_PREFIX: char = '-';

/// The resolved values of one command invocation.
#[derive(Debug, Default)]
pub struct ResolvedArgs {
    values: HashMap<&'static str, Option<ArgValue>>,
}

impl ResolvedArgs {
    /// The value for `name`, if one resolved.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Whether the argument resolved to a value (as opposed to an empty
    /// entry).
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of defined arguments (set or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no arguments are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves command arguments against a shared validation tree.
#[derive(Debug)]
pub struct ArgResolver<'a> {
    tree: &'a ValidationTree,
    prefix: char,
}

impl<'a> ArgResolver<'a> {
    /// Create a resolver with the default `-` marker.
    #[must_use]
    pub const fn new(tree: &'a ValidationTree) -> Self {
        Self {
            tree,
            prefix: ARG_PREFIX,
        }
    }

    /// Use a different marker character.
    #[must_use]
    pub const fn with_prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Resolve, default-fill and validate all arguments of a command.
    pub async fn resolve<F>(
        &self,
        arg_set: &ArgSet,
        ctx: &ScanContext<'_>,
        text: &str,
        defaults: F,
        vctx: &ValidationContext<'_>,
    ) -> Result<ResolvedArgs>
    where
        F: Fn(&ArgSpec) -> Option<String>,
    {
        let markers = self.markers(text);
        let by_name = !markers.is_empty();
        trace!(by_name, args = arg_set.specs().len(), "resolving arguments");

        let mut resolved = ResolvedArgs::default();

        if by_name {
            for spec in arg_set.specs() {
                let value = if spec.skip_in_positional {
                    None
                } else {
                    self.resolve_named(spec, ctx, text, &markers)
                };
                resolved.values.insert(spec.name, value);
            }
        } else {
            let mut pos = 0usize;
            for spec in arg_set.specs() {
                if spec.skip_in_positional {
                    resolved.values.insert(spec.name, None);
                    continue;
                }
                let scan = spec.scanner.scan(ctx, &text[pos..], ScanMode::Sequential);
                if scan.value.is_some() {
                    pos += scan.next_pos;
                }
                resolved.values.insert(spec.name, scan.value);
            }
        }

        // Anything still unresolved takes its default, scanned through
        // the same scanner.
        for spec in arg_set.specs() {
            let entry = resolved.values.entry(spec.name).or_insert(None);
            if entry.is_none() {
                if let Some(default_text) = defaults(spec) {
                    let scan = spec.scanner.scan(ctx, &default_text, ScanMode::ByName);
                    *entry = scan.value;
                }
            }
        }

        for spec in arg_set.specs() {
            let alias = spec.canonical_alias(ctx.catalog);
            let value = resolved.values.get(spec.name).and_then(Option::as_ref);
            self.tree.validate(spec, &alias, value, vctx).await?;
        }

        Ok(resolved)
    }

    /// Locate one argument's window by alias and scan it.
    fn resolve_named(
        &self,
        spec: &ArgSpec,
        ctx: &ScanContext<'_>,
        text: &str,
        markers: &[Marker],
    ) -> Option<ArgValue> {
        for key in spec.alias_keys {
            let alias = ctx.catalog.string(key).to_lowercase();
            let Some(idx) = markers.iter().position(|m| m.name == alias) else {
                continue;
            };
            let window_start = markers[idx].value_start;
            let window_end = markers
                .get(idx + 1)
                .map_or(text.len(), |next| next.start);
            let window = &text[window_start..window_end];
            return spec.scanner.scan(ctx, window, ScanMode::ByName).value;
        }
        None
    }

    /// All unquoted `-name` markers in order of appearance.
    fn markers(&self, text: &str) -> Vec<Marker> {
        let mut out = Vec::new();
        let mut quote: Option<char> = None;
        let mut word_start = true;
        let mut iter = text.char_indices().peekable();

        while let Some((i, ch)) = iter.next() {
            match quote {
                Some(q) => {
                    if ch == q {
                        quote = None;
                    }
                    continue;
                }
                None if super::scanner::is_quote(ch) => {
                    quote = Some(ch);
                    word_start = false;
                    continue;
                }
                None => {}
            }

            if ch == self.prefix && word_start {
                // A marker must be followed by a letter — `-5` is a
                // negative number, not an argument name.
                if iter.peek().is_some_and(|(_, c)| c.is_alphabetic()) {
                    let name_start = i + ch.len_utf8();
                    let name_end = text[name_start..]
                        .find(char::is_whitespace)
                        .map_or(text.len(), |off| name_start + off);
                    out.push(Marker {
                        start: i,
                        value_start: name_end,
                        name: text[name_start..name_end].to_lowercase(),
                    });
                }
            }
            word_start = ch.is_whitespace();
        }
        out
    }
}

/// One `-name` occurrence.
#[derive(Debug)]
struct Marker {
    /// Byte offset of the prefix character.
    start: usize,
    /// Byte offset just past the name token.
    value_start: usize,
    /// Lowercased name without the prefix.
    name: String,
}
