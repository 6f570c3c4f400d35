//! Pluralization tables derived once from the schema's model names.
//! Lookups consult the tables first; the English rules are only a fallback for words the schema does not name.

use serde::Serialize;
use std::collections::BTreeMap;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Inflections {
    plurals: BTreeMap<String, String>,
    singulars: BTreeMap<String, String>,
}

impl Inflections {
    /// Build plural/singular tables for the given model types. `overrides` maps singular -> plural.
    pub fn for_types<'a>(types: impl IntoIterator<Item = &'a str>, overrides: &BTreeMap<String, String>) -> Self {
        let mut plurals = BTreeMap::new();
        let mut singulars = BTreeMap::new();
        for t in types {
            let plural = overrides.get(t).cloned().unwrap_or_else(|| english_plural(t));
            singulars.insert(plural.clone(), t.to_string());
            plurals.insert(t.to_string(), plural);
        }
        Inflections { plurals, singulars }
    }

    pub fn pluralize(&self, word: &str) -> String {
        self.plurals.get(word).cloned().unwrap_or_else(|| english_plural(word))
    }

    pub fn singularize(&self, word: &str) -> String {
        self.singulars.get(word).cloned().unwrap_or_else(|| english_singular(word))
    }

    pub fn plurals(&self) -> &BTreeMap<String, String> {
        &self.plurals
    }

    pub fn singulars(&self) -> &BTreeMap<String, String> {
        &self.singulars
    }
}

/// Split "solarSystem" into ("solar", "System") so rules apply to the last word only.
fn split_last_word(word: &str) -> (&str, &str) {
    match word.char_indices().rev().find(|(_, c)| c.is_uppercase() || *c == '-' || *c == '_') {
        Some((i, c)) if c == '-' || c == '_' => (&word[..=i], &word[i + 1..]),
        Some((i, _)) => (&word[..i], &word[i..]),
        None => ("", word),
    }
}

fn match_case(template: &str, word: &str) -> String {
    if template.chars().next().map(char::is_uppercase).unwrap_or(false) {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        word.to_string()
    }
}

pub fn english_plural(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();
    if lower.is_empty() {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return format!("{}{}", head, match_case(last, plural));
    }
    let out = if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", last)
    } else if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        format!("{}ies", &last[..last.len() - 1])
    } else {
        format!("{}s", last)
    };
    format!("{}{}", head, out)
}

pub fn english_singular(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return format!("{}{}", head, match_case(last, singular));
    }
    let out = if lower.ends_with("ies") && lower.len() > 3 {
        format!("{}y", &last[..last.len() - 3])
    } else if ["ses", "xes", "zes", "ches", "shes"].iter().any(|s| lower.ends_with(s)) {
        last[..last.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") {
        last[..last.len() - 1].to_string()
    } else {
        last.to_string()
    };
    format!("{}{}", head, out)
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut rev = lower.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_rules() {
        assert_eq!(english_plural("planet"), "planets");
        assert_eq!(english_plural("category"), "categories");
        assert_eq!(english_plural("day"), "days");
        assert_eq!(english_plural("box"), "boxes");
        assert_eq!(english_plural("person"), "people");
        assert_eq!(english_plural("solarSystem"), "solarSystems");
        assert_eq!(english_plural("salesPerson"), "salesPeople");
        assert_eq!(english_singular("categories"), "category");
        assert_eq!(english_singular("boxes"), "box");
        assert_eq!(english_singular("moons"), "moon");
        assert_eq!(english_singular("people"), "person");
        assert_eq!(english_singular("solarSystems"), "solarSystem");
    }

    #[test]
    fn tables_take_precedence_over_rules() {
        let mut overrides = BTreeMap::new();
        overrides.insert("octopus".to_string(), "octopi".to_string());
        let inflections = Inflections::for_types(["octopus", "planet"], &overrides);
        assert_eq!(inflections.pluralize("octopus"), "octopi");
        assert_eq!(inflections.singularize("octopi"), "octopus");
        assert_eq!(inflections.pluralize("planet"), "planets");
        assert_eq!(inflections.plurals().len(), 2);
        assert_eq!(inflections.singulars()["planets"], "planet");
    }
}
