//! English inflection for resource names: table "widgets" -> body key "widget", envelope key "widgets".
//! Only the last `_`-separated word is inflected ("order_items" -> "order_item").

const UNCOUNTABLE: &[&str] = &[
    "equipment", "information", "rice", "money", "species", "series", "fish", "sheep", "deer", "news",
    "moose", "metadata", "feedback", "software",
];

/// Singular nouns ending in "us"; other "-us" words are read as plural ("menus").
const SINGULAR_US: &[&str] = &[
    "bus", "status", "bonus", "campus", "virus", "focus", "census", "genus", "corpus", "radius", "nexus",
    "cactus", "octopus", "syllabus", "apparatus", "thesaurus", "prospectus", "stimulus", "circus", "chorus",
    "fungus", "abacus", "walrus", "nucleus", "surplus", "consensus", "minus", "plus", "sinus", "terminus",
    "platypus", "uterus", "onus", "opus", "impetus", "exodus",
];

/// Other singular nouns ending in a single "s" that pluralize with "es".
const SINGULAR_S: &[&str] = &["gas", "alias", "atlas", "canvas", "bias", "lens"];

/// Singular nouns ending in "oe" ("shoes" -> "shoe", not "sho").
const SINGULAR_OE: &[&str] = &["shoe", "toe", "canoe", "oboe", "hoe", "foe", "floe", "doe", "roe"];

/// (singular, plural)
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("quiz", "quizzes"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("index", "indices"),
    ("datum", "data"),
    ("medium", "media"),
    ("criterion", "criteria"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("movie", "movies"),
    ("status", "statuses"),
    ("bus", "buses"),
    ("alias", "aliases"),
    ("hero", "heroes"),
    ("potato", "potatoes"),
    ("tomato", "tomatoes"),
    ("echo", "echoes"),
    ("veto", "vetoes"),
];

fn split_last_word(s: &str) -> (&str, &str) {
    match s.rfind('_') {
        Some(i) => (&s[..=i], &s[i + 1..]),
        None => ("", s),
    }
}

fn ends_with_consonant_y(word: &str) -> bool {
    let mut chars = word.chars().rev();
    matches!(
        (chars.next(), chars.next()),
        (Some('y'), Some(c)) if !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
    )
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, p)| *s == word || *p == word) {
        return (*plural).to_string();
    }
    if word.ends_with("ss") || SINGULAR_US.contains(&word) || SINGULAR_S.contains(&word) {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix("is") {
        return format!("{}es", stem);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") || word.ends_with('z') {
        return format!("{}es", word);
    }
    if ends_with_consonant_y(word) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if let Some(stem) = word.strip_suffix("fe") {
        return format!("{}ves", stem);
    }
    if word.ends_with("lf") || word.ends_with("rf") {
        return format!("{}ves", &word[..word.len() - 1]);
    }
    format!("{}s", word)
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(s, p)| *p == word || *s == word) {
        return (*singular).to_string();
    }
    if word.ends_with("ss") || word.ends_with("is") || SINGULAR_US.contains(&word) || SINGULAR_S.contains(&word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = word.strip_suffix("lves").or_else(|| word.strip_suffix("rves")) {
        let tail = &word[stem.len()..stem.len() + 1];
        return format!("{}{}f", stem, tail);
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{}{}", stem, &suffix[..suffix.len() - 2]);
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        if SINGULAR_US.contains(&stem) || SINGULAR_S.contains(&stem) {
            return stem.to_string();
        }
        if stem.ends_with('o') && !SINGULAR_OE.contains(&&word[..word.len() - 1]) {
            return stem.to_string();
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}

/// Plural form of a name; already-plural names are returned unchanged.
pub fn pluralize(s: &str) -> String {
    let (head, word) = split_last_word(s);
    format!("{}{}", head, pluralize_word(word))
}

/// Singular form of a name; already-singular names are returned unchanged.
pub fn singularize(s: &str) -> String {
    let (head, word) = split_last_word(s);
    format!("{}{}", head, singularize_word(word))
}
