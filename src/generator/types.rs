//! Mapping of XSD built-in types and facets to ORM field kinds.

use thiserror::Error;

use super::model::{Bound, Constraints, FieldKind};
use crate::config::{NumericRules, DEFAULT_NUM_DIGITS, MONETARY_DIGITS};
use crate::graph::Facets;

const CHAR_TYPES: &[&str] = &[
    "string",
    "normalizedString",
    "token",
    "language",
    "Name",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "QName",
    "NOTATION",
    "anyURI",
    "base64Binary",
    "hexBinary",
    "anySimpleType",
    // Kept in their lexical form.
    "time",
    "duration",
    "gYear",
    "gYearMonth",
    "gMonth",
    "gDay",
    "gMonthDay",
];

const INTEGER_TYPES: &[&str] = &[
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "positiveInteger",
    "negativeInteger",
    "nonPositiveInteger",
    "nonNegativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const FLOAT_TYPES: &[&str] = &["decimal", "float", "double"];

/// Built-in with no field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no field mapping for XSD type '{0}'")]
pub struct UnsupportedType(pub String);

/// Result of mapping one member type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub kind: FieldKind,
    pub constraints: Constraints,
    /// Selection values dropped as case-insensitive duplicates.
    pub dropped_values: Vec<String>,
}

impl MappedType {
    pub fn new(kind: FieldKind) -> Self {
        MappedType {
            kind,
            constraints: Constraints::default(),
            dropped_values: Vec::new(),
        }
    }
}

/// Maps XSD types to field kinds under the configured numeric rules.
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    rules: NumericRules,
}

impl TypeMapper {
    pub fn new(rules: NumericRules) -> Self {
        TypeMapper { rules }
    }

    /// Map a built-in type restricted by `facets`.
    ///
    /// `type_name` is the named simple type the member refers to, if any; the
    /// numeric rules match on it. `member_name` is the schema member name.
    pub fn map_type(
        &self,
        builtin: &str,
        facets: &Facets,
        type_name: Option<&str>,
        member_name: &str,
    ) -> Result<MappedType, UnsupportedType> {
        let base = base_kind(builtin).ok_or_else(|| UnsupportedType(builtin.to_string()))?;

        if !facets.enumeration.is_empty() {
            let (values, dropped) = dedup_case_insensitive(&facets.enumeration);
            let mut mapped = MappedType::new(FieldKind::Selection {
                values,
                constant: None,
            });
            mapped.dropped_values = dropped;
            return Ok(mapped);
        }

        if base == FieldKind::Char {
            if let Some(values) = facets.pattern.as_deref().and_then(literal_alternation) {
                let (values, dropped) = dedup_case_insensitive(&values);
                let mut mapped = MappedType::new(FieldKind::Selection {
                    values,
                    constant: None,
                });
                mapped.dropped_values = dropped;
                return Ok(mapped);
            }
        }

        let mut mapped = MappedType::new(base);
        match mapped.kind {
            FieldKind::Char => {
                mapped.constraints.size = facets.length.or(facets.max_length);
                mapped.constraints.min_size = facets.length.or(facets.min_length);
                mapped.constraints.pattern = facets.pattern.clone();
            }
            FieldKind::Integer => {
                apply_bounds(&mut mapped.constraints, facets);
                mapped.constraints.pattern = facets.pattern.clone();
            }
            FieldKind::Float => {
                mapped.constraints.digits = match (facets.total_digits, facets.fraction_digits) {
                    (None, None) if builtin == "decimal" => Some(DEFAULT_NUM_DIGITS),
                    (None, None) => None,
                    (total, fraction) => Some((
                        total.unwrap_or(DEFAULT_NUM_DIGITS.0),
                        fraction.unwrap_or(0),
                    )),
                };
                apply_bounds(&mut mapped.constraints, facets);
            }
            _ => {}
        }

        if let Some(type_name) = type_name {
            self.apply_numeric_rules(&mut mapped, type_name, member_name);
        }
        Ok(mapped)
    }

    /// Monetary and digit rules keyed on simple type names. They apply to
    /// decimal types and to strings used as numbers.
    fn apply_numeric_rules(&self, mapped: &mut MappedType, type_name: &str, member_name: &str) {
        if !matches!(mapped.kind, FieldKind::Float | FieldKind::Char) {
            return;
        }
        if let Some(prefix) = &self.rules.monetary_type {
            if type_name.starts_with(prefix.as_str()) {
                self.make_monetary(mapped);
                return;
            }
        }
        let Some(rule) = &self.rules.num_type else {
            return;
        };
        let Some((precision, scale)) = rule.digits_of(type_name) else {
            return;
        };
        if rule.is_conditional() && scale == MONETARY_DIGITS && !is_percentage(member_name) {
            self.make_monetary(mapped);
        } else {
            mapped.kind = FieldKind::Float;
            mapped.constraints = Constraints {
                digits: Some((precision, scale)),
                lower: mapped.constraints.lower.take(),
                upper: mapped.constraints.upper.take(),
                ..Constraints::default()
            };
        }
    }

    fn make_monetary(&self, mapped: &mut MappedType) {
        mapped.kind = FieldKind::Monetary;
        mapped.constraints = Constraints {
            currency_field: Some(self.rules.currency_field.clone()),
            lower: mapped.constraints.lower.take(),
            upper: mapped.constraints.upper.take(),
            ..Constraints::default()
        };
    }
}

fn base_kind(builtin: &str) -> Option<FieldKind> {
    if CHAR_TYPES.contains(&builtin) {
        Some(FieldKind::Char)
    } else if INTEGER_TYPES.contains(&builtin) {
        Some(FieldKind::Integer)
    } else if FLOAT_TYPES.contains(&builtin) {
        Some(FieldKind::Float)
    } else {
        match builtin {
            "boolean" => Some(FieldKind::Boolean),
            "date" => Some(FieldKind::Date),
            "dateTime" | "dateTimeStamp" => Some(FieldKind::Datetime),
            _ => None,
        }
    }
}

fn apply_bounds(constraints: &mut Constraints, facets: &Facets) {
    let bound = |inclusive: &Option<String>, exclusive: &Option<String>| match (inclusive, exclusive)
    {
        (Some(v), _) => Some(Bound {
            value: v.clone(),
            inclusive: true,
        }),
        (None, Some(v)) => Some(Bound {
            value: v.clone(),
            inclusive: false,
        }),
        (None, None) => None,
    };
    constraints.lower = bound(&facets.min_inclusive, &facets.min_exclusive);
    constraints.upper = bound(&facets.max_inclusive, &facets.max_exclusive);
}

/// `pXxx` members hold percentages, never amounts.
fn is_percentage(member_name: &str) -> bool {
    let mut chars = member_name.chars();
    chars.next() == Some('p') && chars.next().is_some_and(char::is_uppercase)
}

/// Keep the first of values equal ignoring case; return (kept, dropped).
pub fn dedup_case_insensitive(values: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for v in values {
        if seen.insert(v.to_lowercase()) {
            kept.push(v.clone());
        } else {
            dropped.push(v.clone());
        }
    }
    (kept, dropped)
}

/// Values of a pattern that is nothing but a list of literal alternatives,
/// like `^(A|B|C)$` or `01|02|99`.
pub fn literal_alternation(pattern: &str) -> Option<Vec<String>> {
    let mut body = pattern.trim();
    body = body.strip_prefix('^').unwrap_or(body);
    body = body.strip_suffix('$').unwrap_or(body);
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        body = inner.strip_prefix("?:").unwrap_or(inner);
    }
    if body.is_empty() {
        return None;
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(e) if e.is_ascii_punctuation() => current.push(e),
                // Escapes like \d or \s are character classes.
                _ => return None,
            },
            '|' => {
                if current.is_empty() {
                    return None;
                }
                values.push(std::mem::take(&mut current));
            }
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' => return None,
            c => current.push(c),
        }
    }
    if current.is_empty() {
        return None;
    }
    values.push(current);
    Some(values)
}
