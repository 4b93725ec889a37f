//! Identifier sanitization and collision resolution.
//!
//! Every generated identifier goes through a [`NameRegistry`]. Names are
//! declared per scope (an output package for models and constants, a model
//! for fields) under a key identifying their origin, normally a qualified
//! name in Clark notation. Once every name of a scope is known, the registry
//! assigns identifiers:
//!
//! - a sanitized, case-converted, length-limited base name per key
//! - the smallest key sharing a base keeps it as is
//! - every other key gets `_` plus a SHA-256 hex suffix of the key
//!
//! The assignment depends only on the set of keys in a scope, never on the
//! order they were declared in.

use heck::{ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::config::{FieldCase, GeneratorConfig};
use crate::error::GenerationError;

/// Shortest hex suffix tried first.
const MIN_SUFFIX_WIDTH: usize = 4;
/// Longest hex suffix of a SHA-256 digest.
const MAX_SUFFIX_WIDTH: usize = 64;

static PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "match", "case", "type",
];

/// Field names the ORM defines on every model.
static ORM_RESERVED: &[&str] = &[
    "id",
    "display_name",
    "create_uid",
    "create_date",
    "write_uid",
    "write_date",
    "active",
    "name",
    "parent_id",
    "company_id",
    "currency_id",
    "sequence",
    "state",
    "env",
    "ids",
    "fields",
    "models",
    "api",
];

static BUILTIN_RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    PYTHON_KEYWORDS
        .iter()
        .chain(ORM_RESERVED.iter())
        .copied()
        .collect()
});

/// What an identifier names; decides its casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NameKind {
    /// Model class, PascalCase.
    Model,
    /// Model field, prefixed.
    Field,
    /// Module-level selection constant, upper case.
    Constant,
}

#[derive(Debug, Clone, Default)]
struct ScopeNames {
    /// key -> base identifier
    declared: BTreeMap<String, String>,
    /// key -> final identifier, valid until the next declaration
    resolved: Option<BTreeMap<String, String>>,
}

/// Run-scoped registry of generated identifiers.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    field_prefix: String,
    field_case: FieldCase,
    max_len: usize,
    model_len: usize,
    reserved: HashSet<String>,
    scopes: BTreeMap<(String, NameKind), ScopeNames>,
}

impl NameRegistry {
    pub fn new(config: &GeneratorConfig) -> Self {
        NameRegistry {
            field_prefix: config.field_prefix(),
            field_case: config.field_case,
            max_len: config.max_identifier_length,
            // `_name` is `{profile}.{version}.{lowercase class}` and must fit too.
            model_len: config
                .max_identifier_length
                .saturating_sub(config.registry_prefix_len()),
            reserved: config.reserved_words.iter().cloned().collect(),
            scopes: BTreeMap::new(),
        }
    }

    fn budget(&self, kind: NameKind) -> usize {
        match kind {
            NameKind::Model => self.model_len,
            NameKind::Field | NameKind::Constant => self.max_len,
        }
    }

    fn is_reserved(&self, ident: &str) -> bool {
        BUILTIN_RESERVED.contains(ident) || self.reserved.contains(ident)
    }

    /// Base identifier for `raw` before collision handling.
    pub fn sanitize(&self, raw: &str, kind: NameKind) -> String {
        let cased = match kind {
            NameKind::Model => raw.replace('.', "_").to_upper_camel_case(),
            NameKind::Field => {
                let name = match self.field_case {
                    FieldCase::Preserve => raw.to_string(),
                    FieldCase::Snake => raw.to_snake_case(),
                };
                format!("{}{}", self.field_prefix, name)
            }
            NameKind::Constant => raw.to_uppercase(),
        };
        let mut ident: String = cased
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
            ident.insert(0, '_');
        }
        let budget = self.budget(kind);
        let mut ident = truncate(&ident, budget).to_string();
        // Truncation can itself land on a reserved word.
        if self.is_reserved(&ident) {
            if ident.chars().count() >= budget {
                ident = truncate(&ident, budget.saturating_sub(1)).to_string();
            }
            ident.push('_');
        }
        ident
    }

    /// Register `raw` under `key` in a scope without resolving it yet.
    pub fn declare(&mut self, scope: &str, kind: NameKind, key: &str, raw: &str) {
        let base = self.sanitize(raw, kind);
        let names = self.scopes.entry((scope.to_string(), kind)).or_default();
        if names.declared.get(key) != Some(&base) {
            names.declared.insert(key.to_string(), base);
            names.resolved = None;
        }
    }

    /// Final identifier for `key`, declaring it first when needed.
    pub fn resolve(
        &mut self,
        scope: &str,
        kind: NameKind,
        key: &str,
        raw: &str,
    ) -> Result<String, GenerationError> {
        let known = self
            .scopes
            .get(&(scope.to_string(), kind))
            .is_some_and(|s| s.declared.contains_key(key));
        if !known {
            self.declare(scope, kind, key, raw);
        }
        let budget = self.budget(kind);
        let names = self.scopes.entry((scope.to_string(), kind)).or_default();
        if names.resolved.is_none() {
            names.resolved = Some(assign(&names.declared, budget));
        }
        names
            .resolved
            .as_ref()
            .and_then(|r| r.get(key))
            .cloned()
            .ok_or_else(|| GenerationError::NameCollisionUnresolvable {
                name: raw.to_string(),
                scope: scope.to_string(),
                location: key.to_string(),
            })
    }

    /// Key that an identifier was assigned to, if it has been resolved.
    pub fn origin_of(&self, scope: &str, kind: NameKind, ident: &str) -> Option<&str> {
        self.scopes
            .get(&(scope.to_string(), kind))?
            .resolved
            .as_ref()?
            .iter()
            .find(|(_, v)| v.as_str() == ident)
            .map(|(k, _)| k.as_str())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn hex_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Assign identifiers to the keys of a scope.
///
/// Keys that cannot get a unique identifier within `budget` are left out;
/// [`NameRegistry::resolve`] reports them as unresolvable.
fn assign(declared: &BTreeMap<String, String>, budget: usize) -> BTreeMap<String, String> {
    let mut by_base: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (key, base) in declared {
        // BTreeMap iteration keeps keys sorted within each base.
        by_base.entry(base.as_str()).or_default().push(key.as_str());
    }

    let mut width = MIN_SUFFIX_WIDTH;
    loop {
        let last = width >= MAX_SUFFIX_WIDTH;
        let mut out = BTreeMap::new();
        let mut taken = HashSet::new();
        let mut unique = true;
        for (base, keys) in &by_base {
            for (i, key) in keys.iter().enumerate() {
                let ident = if i == 0 {
                    base.to_string()
                } else {
                    let room = budget.saturating_sub(width + 1);
                    if room == 0 {
                        continue;
                    }
                    format!("{}_{}", truncate(base, room), &hex_digest(key)[..width])
                };
                if !taken.insert(ident.clone()) {
                    unique = false;
                    if last {
                        continue;
                    }
                }
                out.insert(key.to_string(), ident);
            }
        }
        if unique || last {
            return out;
        }
        width += 2;
    }
}
