//! Field labels and docstrings derived from schema documentation.
//!
//! Schema documentation is usually a sentence or a paragraph. The ORM wants
//! a short label plus an optional help text, so the first line is cut at
//! strong punctuation, then at stopwords of the documentation language, until
//! it fits in [`LABEL_MAX_LEN`] characters.

use std::collections::HashSet;

/// Below this length punctuation cuts stop.
pub const LABEL_MIN_LEN: usize = 36;
/// Labels longer than this fall back to the member name.
pub const LABEL_MAX_LEN: usize = 40;
/// Docstring wrap width.
pub const DOC_WIDTH: usize = 79;

const STRONG_PUNCTUATION: [&str; 8] = [". ", ", ", " (", " - ", ".", ",", ": ", "|"];

/// Leading phrases that carry no meaning in a label.
const USELESS_STARTS: [&str; 3] = ["Informar o ", "Informar a ", "Preencher com "];

const ENGLISH: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "is", "of", "on", "or",
    "that", "the", "to", "when", "which", "with",
];

const PORTUGUESE: &[&str] = &[
    "a", "ao", "aos", "as", "com", "da", "das", "de", "do", "dos", "e", "em", "na", "nas", "no",
    "nos", "o", "os", "ou", "para", "pela", "pelo", "por", "que", "se", "um", "uma",
];

const FRENCH: &[&str] = &[
    "au", "aux", "avec", "ce", "dans", "de", "des", "du", "en", "et", "la", "le", "les", "ou",
    "par", "pour", "que", "qui", "sur", "un", "une",
];

const SPANISH: &[&str] = &[
    "a", "al", "con", "de", "del", "el", "en", "la", "las", "los", "o", "para", "por", "que",
    "se", "un", "una", "y",
];

const GERMAN: &[&str] = &[
    "am", "an", "auf", "aus", "bei", "das", "der", "die", "des", "ein", "eine", "für", "im",
    "in", "mit", "oder", "und", "von", "zu", "zum", "zur",
];

fn stopwords(language: &str) -> &'static [&'static str] {
    match language.to_lowercase().as_str() {
        "portuguese" | "pt" | "pt_br" => PORTUGUESE,
        "french" | "fr" => FRENCH,
        "spanish" | "es" => SPANISH,
        "german" | "de" => GERMAN,
        _ => ENGLISH,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Everything before the last occurrence of `token`.
fn before_last<'a>(s: &'a str, token: &str) -> &'a str {
    match s.rfind(token) {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// Extracts unique labels and help texts for the fields of one model.
#[derive(Debug, Clone)]
pub struct LabelExtractor {
    stopwords: &'static [&'static str],
    used: HashSet<String>,
}

impl LabelExtractor {
    pub fn new(language: &str) -> Self {
        LabelExtractor {
            stopwords: stopwords(language),
            used: HashSet::new(),
        }
    }

    /// Label and help text for member `name` documented by `doc`.
    ///
    /// Labels are unique per extractor; a repeated label gets ` (name)` appended.
    pub fn extract(&mut self, name: &str, doc: Option<&str>) -> (String, Option<String>) {
        let mut label = name.to_string();
        let mut help = None;
        if let Some(doc) = doc.map(|d| d.trim().replace('"', "")).filter(|d| !d.is_empty()) {
            let (cut, rest) = aggressive_cut(&doc);
            let mut candidate = self.progressive_cut(&cut);
            if candidate.contains('(') && !candidate.contains(')') {
                candidate = candidate
                    .split('(')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
            }
            if !candidate.is_empty() && char_len(&candidate) <= LABEL_MAX_LEN {
                label = candidate;
            }
            let trimmed = rest.strip_suffix('.').unwrap_or(&rest);
            if label != rest && label != trimmed {
                help = Some(rest);
            }
        }
        if self.used.contains(&label) {
            label = format!("{label} ({name})");
            if char_len(&label) > LABEL_MAX_LEN {
                label = name.to_string();
            }
        }
        self.used.insert(label.clone());
        (label, help)
    }

    fn is_cut_token(&self, s: &str) -> Option<usize> {
        for token in STRONG_PUNCTUATION {
            let token = token.trim_end();
            if s.ends_with(token) {
                return s.rfind(token);
            }
        }
        for word in self.stopwords {
            let token = format!(" {word}");
            if s.ends_with(&token) {
                return s.rfind(&token);
            }
        }
        None
    }

    /// Cut at the last stopword until the label fits, then drop dangling
    /// punctuation or stopwords at the end.
    fn progressive_cut(&self, label: &str) -> String {
        let mut s = label.to_string();
        while char_len(&s) > LABEL_MAX_LEN {
            let last = self
                .stopwords
                .iter()
                .filter_map(|w| {
                    let token = format!(" {w} ");
                    s.rfind(&token).map(|idx| (idx, token))
                })
                .max_by_key(|(idx, _)| *idx);
            match last {
                Some((idx, _)) if idx > 0 => s.truncate(idx),
                _ => break,
            }
        }
        while let Some(idx) = self.is_cut_token(&s) {
            s.truncate(idx);
        }
        s
    }
}

/// Strip meaningless leading phrases, keep the first line and cut it at strong
/// punctuation while it is long. Returns (label candidate, help text).
fn aggressive_cut(doc: &str) -> (String, String) {
    let mut doc = doc;
    for start in USELESS_STARTS {
        if doc
            .get(..start.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(start))
        {
            doc = &doc[start.len()..];
        }
    }
    let first_line = doc.lines().next().unwrap_or_default();
    let mut label = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    for token in STRONG_PUNCTUATION {
        while label.contains(token) && char_len(&label) > LABEL_MIN_LEN {
            label = before_last(&label, token).to_string();
        }
    }
    (label, doc.to_string())
}

/// Escape text for use inside a `"""` docstring.
pub fn docstring_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "'")
}

/// Wrap documentation into docstring lines of at most `width` columns once
/// indented by `indent` spaces. Line breaks of the source are kept.
pub fn wrap_doc(text: &str, width: usize, indent: usize) -> Vec<String> {
    let width = width.saturating_sub(indent).max(20);
    let mut out = Vec::new();
    for line in docstring_text(text.trim()).lines() {
        let mut current = String::new();
        for word in line.split_whitespace() {
            if !current.is_empty() && char_len(&current) + 1 + char_len(word) > width {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        out.push(current);
    }
    // Collapse runs of blank lines.
    out.dedup_by(|a, b| a.is_empty() && b.is_empty());
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_doc_becomes_label_without_help() {
        let mut labels = LabelExtractor::new("english");
        let (label, help) = labels.extract("street", Some("Street name."));
        assert_eq!(label, "Street name");
        assert_eq!(help, None);
    }

    #[test]
    fn test_no_doc_uses_name() {
        let mut labels = LabelExtractor::new("english");
        assert_eq!(labels.extract("zip", None), ("zip".to_string(), None));
        assert_eq!(labels.extract("zip2", Some("   ")), ("zip2".to_string(), None));
    }

    #[test]
    fn test_long_doc_is_cut_and_kept_as_help() {
        let mut labels = LabelExtractor::new("portuguese");
        let doc = "Informar o Código do Município de ocorrência do fato gerador do ICMS, \
                   conforme a tabela do IBGE";
        let (label, help) = labels.extract("cMunFG", Some(doc));
        assert!(char_len(&label) <= LABEL_MAX_LEN, "label too long: {label}");
        assert!(label.starts_with("Código do Município"));
        assert!(!label.ends_with(" de"));
        assert_eq!(help.as_deref(), Some(&doc["Informar o ".len()..]));
    }

    #[test]
    fn test_duplicate_labels_get_name_suffix() {
        let mut labels = LabelExtractor::new("english");
        let (a, _) = labels.extract("vProd", Some("Value"));
        let (b, _) = labels.extract("vNF", Some("Value"));
        assert_eq!(a, "Value");
        assert_eq!(b, "Value (vNF)");
    }

    #[test]
    fn test_unbalanced_parenthesis_dropped() {
        let mut labels = LabelExtractor::new("english");
        let (label, _) = labels.extract("x", Some("Tax rate (percent"));
        assert_eq!(label, "Tax rate");
    }

    #[test]
    fn test_wrap_doc() {
        let text = "An address of a person or an organization, used for both shipping and invoicing.\n\nSecond paragraph with \"quotes\".";
        let lines = wrap_doc(text, DOC_WIDTH, 4);
        assert!(lines.iter().all(|l| l.len() <= DOC_WIDTH - 4));
        assert_eq!(lines[0], "An address of a person or an organization, used for both shipping and");
        assert_eq!(lines[1], "invoicing.");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "Second paragraph with 'quotes'.");
    }
}
