//! Argument scanning, definitions and resolution.
//!
//! The pipeline: raw command text enters [`ArgResolver::resolve`], which
//! picks by-name or positional scanning, runs each argument's
//! [`ArgScanner`], fills defaults for anything unresolved, and hands the
//! whole set to the validation tree. A scanner returning no value is a
//! normal outcome, not an error; see [`crate::error`] for the failure
//! taxonomy.

mod definition;
mod mention;
mod resolver;
pub(crate) mod scanner;

pub use definition::{ArgSet, ArgSpec};
pub use mention::{EntityRef, MentionKind, MentionParser};
pub use resolver::{ARG_PREFIX, ArgResolver, ResolvedArgs};
pub use scanner::{ArgScanner, ArgValue, ScanContext, ScanMode, Scanned, Separator};
