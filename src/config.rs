//! # Generator Configuration Module
//!
//! Settings that shape the generated models: output package, registry naming,
//! field prefixes, identifier limits, skip patterns and numeric type rules.
//!
//! Configuration is read from a TOML file, then environment variables
//! override individual keys:
//!
//! | Variable | Key | Default |
//! |---|---|---|
//! | `XSD_ORMGEN_SKIP` | `skip_pattern` | none |
//! | `XSD_ORMGEN_LANG` | `language` | `english` |
//! | `XSD_ORMGEN_PACKAGE` | `package` | `models` |
//! | `XSD_ORMGEN_SCHEMA` | `profile` | `spec` |
//! | `XSD_ORMGEN_VERSION` | `version` | `10` |
//! | `XSD_ORMGEN_NUM_TYPE` | `num_type` | none |
//! | `XSD_ORMGEN_MONETARY_TYPE` | `monetary_type` | none |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xsd_ormgen::config::GeneratorConfig;
//!
//! let config = GeneratorConfig::load(Path::new("ormgen.toml"))?.with_env_overrides();
//! ```
//!
//! ## Example File
//!
//! ```toml
//! profile = "nfe"
//! version = "40"
//! package = "nfe.v4_0"
//! language = "portuguese"
//! skip_pattern = "^TEnviNFe$|Signature"
//! num_type = "TDec_[5:7.7:9]"
//! ```

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::GenerationError;

/// XML-DSig classes that are never worth generating models for.
pub const SIGNATURE_CLASS_SKIP: [&str; 12] = [
    "^Signature$",
    "^SignatureType$",
    "^SignatureValueType$",
    "^SignedInfoType$",
    "^ReferenceType$",
    "^DigestMethodType$",
    "^TransformsType$",
    "^TransformType$",
    "^KeyInfoType$",
    "^X509DataType$",
    "^CanonicalizationMethodType$",
    "^SignatureMethodType$",
];

/// Number of fraction digits that makes a decimal type monetary.
pub const MONETARY_DIGITS: u32 = 2;

/// Digits used by a plain `num_type` prefix rule.
pub const DEFAULT_NUM_DIGITS: (u32, u32) = (16, 4);

/// Smallest accepted `max_identifier_length`.
const MIN_IDENTIFIER_LENGTH: usize = 8;

/// How field identifiers are cased after the prefix is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCase {
    /// Keep the schema name as written (`nfe40_vProd`).
    #[default]
    Preserve,
    /// snake_case the schema name (`nfe40_v_prod`).
    Snake,
}

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `|`-separated regular expressions of classes and fields to skip.
    pub skip_pattern: Option<String>,
    /// Human language of the schema documentation, for label extraction.
    pub language: String,
    /// Output package path, dot separated.
    pub package: String,
    /// Schema dialect selector; also the registry name prefix.
    pub profile: String,
    /// Schema version tag.
    pub version: String,
    /// Field identifier prefix; defaults to `{profile}{version}_`.
    pub field_prefix: Option<String>,
    pub field_case: FieldCase,
    pub max_identifier_length: usize,
    /// Extra words generated identifiers must avoid.
    pub reserved_words: Vec<String>,
    /// `Prefix` or `Prefix[a:b.c:d]` rule for decimal simple type names.
    pub num_type: Option<String>,
    /// Simple type name prefix forcing monetary fields.
    pub monetary_type: Option<String>,
    /// Currency field referenced by monetary fields.
    pub currency_field: String,
    pub python_inherit_model: String,
    /// Mixin every model inherits; defaults to `spec.mixin.{profile}`.
    pub inherit_model: Option<String>,
    /// Directory holding custom `model.py.j2` / `module.py.j2` / `init.py.j2`.
    pub template_dir: Option<PathBuf>,
    pub skip_signature_classes: bool,
    /// Merge repeated members of a class; defaults to on for the `nfe` profile.
    pub merge_duplicates: Option<bool>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            skip_pattern: None,
            language: "english".to_string(),
            package: "models".to_string(),
            profile: "spec".to_string(),
            version: "10".to_string(),
            field_prefix: None,
            field_case: FieldCase::Preserve,
            max_identifier_length: 63,
            reserved_words: Vec::new(),
            num_type: None,
            monetary_type: None,
            currency_field: "currency_id".to_string(),
            python_inherit_model: "models.AbstractModel".to_string(),
            inherit_model: None,
            template_dir: None,
            skip_signature_classes: true,
            merge_duplicates: None,
        }
    }
}

impl GeneratorConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        GeneratorConfig::default().with_env_overrides()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read generator config: {}", path.display())
        })?;
        let config: GeneratorConfig = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse generator config: {}", path.display())
        })?;
        Ok(config)
    }

    /// Apply `XSD_ORMGEN_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("XSD_ORMGEN_SKIP") {
            self.skip_pattern = Some(v);
        }
        if let Some(v) = get("XSD_ORMGEN_LANG") {
            self.language = v;
        }
        if let Some(v) = get("XSD_ORMGEN_PACKAGE") {
            self.package = v;
        }
        if let Some(v) = get("XSD_ORMGEN_SCHEMA") {
            self.profile = v;
        }
        if let Some(v) = get("XSD_ORMGEN_VERSION") {
            self.version = v;
        }
        if let Some(v) = get("XSD_ORMGEN_NUM_TYPE") {
            self.num_type = Some(v);
        }
        if let Some(v) = get("XSD_ORMGEN_MONETARY_TYPE") {
            self.monetary_type = Some(v);
        }
        self
    }

    /// Check values that would only fail deep inside generation.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.max_identifier_length < MIN_IDENTIFIER_LENGTH {
            return Err(GenerationError::Config(format!(
                "max_identifier_length must be at least {MIN_IDENTIFIER_LENGTH}, got {}",
                self.max_identifier_length
            )));
        }
        if self.profile.is_empty() || self.version.is_empty() {
            return Err(GenerationError::Config(
                "profile and version must not be empty".to_string(),
            ));
        }
        if self.package.split('.').any(|p| p.is_empty()) {
            return Err(GenerationError::Config(format!(
                "invalid package '{}'",
                self.package
            )));
        }
        self.skip_filter()?;
        self.numeric_rules()?;
        Ok(())
    }

    pub fn field_prefix(&self) -> String {
        self.field_prefix
            .clone()
            .unwrap_or_else(|| format!("{}{}_", self.profile, self.version))
    }

    pub fn inherit_model(&self) -> String {
        self.inherit_model
            .clone()
            .unwrap_or_else(|| format!("spec.mixin.{}", self.profile))
    }

    /// ORM registry name (`_name`) for a model identifier.
    pub fn registry_name(&self, model_ident: &str) -> String {
        format!(
            "{}.{}.{}",
            self.profile,
            self.version,
            model_ident.to_lowercase()
        )
    }

    /// Characters of the registry name taken by the `{profile}.{version}.` prefix.
    pub fn registry_prefix_len(&self) -> usize {
        self.profile.len() + self.version.len() + 2
    }

    pub fn merge_duplicates(&self) -> bool {
        self.merge_duplicates.unwrap_or(self.profile == "nfe")
    }

    /// Compiled class/field skip patterns.
    pub fn skip_filter(&self) -> Result<SkipFilter, GenerationError> {
        let mut patterns: Vec<&str> = Vec::new();
        if self.skip_signature_classes {
            patterns.extend(SIGNATURE_CLASS_SKIP);
        }
        if let Some(extra) = &self.skip_pattern {
            patterns.extend(extra.split('|').filter(|p| !p.is_empty()));
        }
        SkipFilter::new(&patterns)
    }

    pub fn numeric_rules(&self) -> Result<NumericRules, GenerationError> {
        let num_type = self
            .num_type
            .as_deref()
            .map(NumTypeRule::parse)
            .transpose()?;
        Ok(NumericRules {
            num_type,
            monetary_type: self.monetary_type.clone(),
            currency_field: self.currency_field.clone(),
        })
    }
}

/// Regular expressions selecting classes and fields to leave out.
///
/// A pattern matches a bare name, or (when it contains `.`) the name scoped by
/// as many enclosing class names as the pattern has segments.
#[derive(Debug, Clone, Default)]
pub struct SkipFilter {
    patterns: Vec<(Regex, usize)>,
}

impl SkipFilter {
    pub fn new(patterns: &[&str]) -> Result<Self, GenerationError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let re = Regex::new(p).map_err(|e| {
                    GenerationError::Config(format!("invalid skip pattern '{p}': {e}"))
                })?;
                Ok((re, p.matches('.').count() + 1))
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;
        Ok(SkipFilter { patterns })
    }

    /// Is the class with this path (outer classes first, class last) skipped?
    pub fn skips_class(&self, path: &[&str]) -> bool {
        match path.split_last() {
            Some((name, _)) => self.is_skipped(name, path),
            None => false,
        }
    }

    /// Is field `name` of the class with path `class_path` skipped?
    pub fn skips_field(&self, class_path: &[&str], name: &str) -> bool {
        self.is_skipped(name, class_path)
    }

    fn is_skipped(&self, name: &str, scope: &[&str]) -> bool {
        self.patterns.iter().any(|(re, parts)| {
            if re.is_match(name) {
                return true;
            }
            if *parts < 2 {
                return false;
            }
            let class_scope = scope[scope.len().saturating_sub(*parts)..].join(".");
            if re.is_match(&class_scope) {
                return true;
            }
            let mut field_scope: Vec<&str> = scope[scope.len().saturating_sub(parts - 1)..].to_vec();
            field_scope.push(name);
            re.is_match(&field_scope.join("."))
        })
    }
}

/// `Prefix[int_start:int_stop.dec_start:dec_stop]` rule extracting digits
/// from decimal simple type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumTypeRule {
    pub prefix: String,
    /// Byte ranges of the precision and scale digits in the type name.
    pub slices: Option<((usize, usize), (usize, usize))>,
}

/// Grammar of a `num_type` rule: prefix, then optional `[a:b.c:d]` slices.
pub const NUM_TYPE_PATTERN: &str = r"^([^\[\]]*)(?:\[(\d+):(\d+)\.(\d+):(\d+)\])?$";

impl NumTypeRule {
    pub fn parse(rule: &str) -> Result<Self, GenerationError> {
        let invalid = || GenerationError::Config(format!("invalid num_type rule '{rule}'"));
        let grammar = Regex::new(NUM_TYPE_PATTERN)
            .map_err(|e| GenerationError::Config(format!("num_type grammar: {e}")))?;
        let caps = grammar.captures(rule.trim()).ok_or_else(invalid)?;
        let prefix = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        if prefix.is_empty() {
            return Err(invalid());
        }
        let num = |i: usize| -> Option<usize> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };
        let slices = match (num(2), num(3), num(4), num(5)) {
            (Some(a), Some(b), Some(c), Some(d)) if a < b && c < d => Some(((a, b), (c, d))),
            (None, None, None, None) => None,
            _ => return Err(invalid()),
        };
        Ok(NumTypeRule { prefix, slices })
    }

    /// `(precision, scale)` read from a type name, `None` when the name does
    /// not follow the rule.
    pub fn digits_of(&self, type_name: &str) -> Option<(u32, u32)> {
        if !type_name.starts_with(&self.prefix) {
            return None;
        }
        let Some(((a, b), (c, d))) = self.slices else {
            return Some(DEFAULT_NUM_DIGITS);
        };
        let normalized = type_name.replace("03v", "03");
        let precision = normalized.get(a..b)?.parse().ok()?;
        let scale = normalized.get(c..d)?.parse().ok()?;
        Some((precision, scale))
    }

    /// Does a scale read from the type name only make sense as a fixed digit count?
    pub fn is_conditional(&self) -> bool {
        self.slices.is_some()
    }
}

/// Numeric configuration handed to the type mapper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericRules {
    pub num_type: Option<NumTypeRule>,
    pub monetary_type: Option<String>,
    pub currency_field: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.field_prefix(), "spec10_");
        assert_eq!(config.inherit_model(), "spec.mixin.spec");
        assert_eq!(config.registry_name("TNFe"), "spec.10.tnfe");
        assert_eq!(config.registry_prefix_len(), "spec.10.".len());
        assert!(!config.merge_duplicates());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("XSD_ORMGEN_SCHEMA", "nfe"),
            ("XSD_ORMGEN_VERSION", "40"),
            ("XSD_ORMGEN_SKIP", "^Foo$|Bar"),
            ("XSD_ORMGEN_LANG", ""),
        ]
        .into_iter()
        .collect();
        let config = GeneratorConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.profile, "nfe");
        assert_eq!(config.field_prefix(), "nfe40_");
        assert_eq!(config.language, "english");
        assert!(config.merge_duplicates());
        let filter = config.skip_filter().unwrap();
        assert!(filter.skips_class(&["Foo"]));
        assert!(filter.skips_class(&["Signature"]));
        assert!(!filter.skips_class(&["Foobar"]));
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ormgen.toml");
        std::fs::write(
            &path,
            "profile = \"nfe\"\nversion = \"40\"\nfield_case = \"snake\"\nreserved_words = [\"state\"]\n",
        )
        .unwrap();
        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.field_case, FieldCase::Snake);
        assert_eq!(config.reserved_words, vec!["state".to_string()]);
        assert_eq!(config.package, "models");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GeneratorConfig {
            max_identifier_length: 4,
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
        let config = GeneratorConfig {
            skip_pattern: Some("([".into()),
            ..GeneratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_scoped_skip_patterns() {
        let filter = SkipFilter::new(&["TNFe.InfNFe", "InfNFe.Id"]).unwrap();
        assert!(filter.skips_class(&["TNFe", "InfNFe"]));
        assert!(!filter.skips_class(&["TNFe"]));
        assert!(filter.skips_field(&["TNFe", "InfNFe"], "Id"));
        assert!(!filter.skips_field(&["TNFe", "InfNFe"], "versao"));
    }

    #[test]
    fn test_num_type_grammar_compiles() {
        let grammar = Regex::new(NUM_TYPE_PATTERN).unwrap();
        assert!(grammar.is_match("TDec_[5:7.7:9]"));
        assert!(grammar.is_match("TDec_"));
        assert!(!grammar.is_match("TDec_[5:7]"));
    }

    #[test]
    fn test_num_type_rule() {
        let rule = NumTypeRule::parse("TDec_[5:7.7:9]").unwrap();
        assert_eq!(rule.prefix, "TDec_");
        assert_eq!(rule.digits_of("TDec_1302"), Some((13, 2)));
        assert_eq!(rule.digits_of("TDec_0803v"), Some((8, 3)));
        assert_eq!(rule.digits_of("TDec_1"), None);
        assert_eq!(rule.digits_of("TString"), None);

        let plain = NumTypeRule::parse("TDec").unwrap();
        assert_eq!(plain.digits_of("TDecimal"), Some(DEFAULT_NUM_DIGITS));
        assert!(!plain.is_conditional());

        assert!(NumTypeRule::parse("TDec_[7:5.7:9]").is_err());
        assert!(NumTypeRule::parse("[1:2.3:4]").is_err());
    }
}
