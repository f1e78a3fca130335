//! In-memory fuzzy search over serializable records.
//!
//! Records are flattened to JSON once when indexed. Each search key is a dotted path that
//! may walk through arrays (`images.caption` yields every caption). Matching is approximate
//! substring matching: the best edit distance between the pattern and any substring of the
//! field, divided by the pattern length, so 0.0 is a perfect match and 1.0 is no match.
//!
//! Extended query syntax (terms separated by whitespace are AND-ed, ` | ` separates OR
//! groups):
//!
//! | term     | meaning                      |
//! |----------|------------------------------|
//! | `jscript`| fuzzy match                  |
//! | `=scheme`| field equals                 |
//! | `'python`| field contains               |
//! | `^java`  | field starts with            |
//! | `.js$`   | field ends with              |
//! | `!ruby`  | field does not contain       |
//! | `!^go`   | field does not start with    |
//! | `!.rb$`  | field does not end with      |

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Substitutes for a zero score so a perfect match still weighs into the product.
const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchKey {
    pub path: String,
    pub weight: f64,
}

impl SearchKey {
    pub fn new(path: impl Into<String>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub keys: Vec<SearchKey>,
    /// Highest score still counted as a match.
    pub threshold: f64,
    /// Shortest query (and fuzzy term) that can match anything.
    pub min_match_char_length: usize,
    pub use_extended_search: bool,
    /// When false, matches starting far from `location` are penalised by `offset / distance`.
    pub ignore_location: bool,
    pub location: usize,
    pub distance: usize,
    /// Scale field scores by `1 / sqrt(word count)` so hits in short fields weigh more.
    pub ignore_field_norm: bool,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            threshold: 0.4,
            min_match_char_length: 3,
            use_extended_search: true,
            ignore_location: true,
            location: 0,
            distance: 100,
            ignore_field_norm: false,
            limit: 10,
        }
    }
}

impl SearchOptions {
    pub fn with_keys(keys: Vec<SearchKey>) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a, T> {
    pub item: &'a T,
    /// Position of the record in the indexed collection.
    pub index: usize,
    pub score: f64,
}

pub struct SearchIndex<T> {
    items: Vec<T>,
    docs: Vec<JsonValue>,
    options: SearchOptions,
    /// Key weights normalised to sum to 1.
    weights: Vec<f64>,
}

impl<T: Serialize> SearchIndex<T> {
    pub fn new(items: Vec<T>, options: SearchOptions) -> Result<Self, serde_json::Error> {
        let docs = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let weights = normalise_weights(&options.keys);
        Ok(Self {
            items,
            docs,
            options,
            weights,
        })
    }

    pub fn add(&mut self, item: T) -> Result<(), serde_json::Error> {
        self.docs.push(serde_json::to_value(&item)?);
        self.items.push(item);
        Ok(())
    }

    pub fn set_collection(&mut self, items: Vec<T>) -> Result<(), serde_json::Error> {
        self.docs = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.items = items;
        Ok(())
    }
}

impl<T> SearchIndex<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Best matches first, at most `limit` of them. Ties keep collection order.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_, T>> {
        let query = query.trim();
        if query.chars().count() < self.options.min_match_char_length {
            return Vec::new();
        }
        let parsed = if self.options.use_extended_search {
            parse_extended(query)
        } else {
            vec![vec![Term::Fuzzy(query.to_lowercase())]]
        };
        if parsed.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit<'_, T>> = self
            .docs
            .iter()
            .enumerate()
            .filter_map(|(index, doc)| {
                self.score_doc(doc, &parsed).map(|score| SearchHit {
                    item: &self.items[index],
                    index,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.index.cmp(&b.index)));
        hits.truncate(self.options.limit);
        hits
    }

    fn score_doc(&self, doc: &JsonValue, query: &[Vec<Term>]) -> Option<f64> {
        let mut total = 1.0_f64;
        let mut matched = false;

        for (key, weight) in self.options.keys.iter().zip(&self.weights) {
            let best = field_values(doc, &key.path)
                .iter()
                .filter_map(|value| {
                    let score = self.score_value(value, query)?;
                    Some(if self.options.ignore_field_norm {
                        (score, 1.0)
                    } else {
                        (score, field_norm(value))
                    })
                })
                .min_by(|a, b| a.0.total_cmp(&b.0));

            if let Some((score, norm)) = best {
                matched = true;
                let base = if score == 0.0 && *weight > 0.0 { EPSILON } else { score };
                total *= base.powf(weight * norm);
            }
        }

        matched.then_some(total)
    }

    /// Score of the best OR group that fully matches this value.
    fn score_value(&self, value: &str, query: &[Vec<Term>]) -> Option<f64> {
        let text = value.to_lowercase();
        query
            .iter()
            .filter_map(|group| {
                let mut sum = 0.0;
                for term in group {
                    sum += self.score_term(term, &text)?;
                }
                Some(sum / group.len() as f64)
            })
            .min_by(f64::total_cmp)
    }

    fn score_term(&self, term: &Term, text: &str) -> Option<f64> {
        let hit = |ok: bool| if ok { Some(0.0) } else { None };
        match term {
            Term::Fuzzy(pattern) => self.fuzzy_score(pattern, text),
            Term::Exact(p) => hit(text == p.as_str()),
            Term::Include(p) => hit(text.contains(p.as_str())),
            Term::Prefix(p) => hit(text.starts_with(p.as_str())),
            Term::Suffix(p) => hit(text.ends_with(p.as_str())),
            Term::Inverse(p) => hit(!text.contains(p.as_str())),
            Term::InversePrefix(p) => hit(!text.starts_with(p.as_str())),
            Term::InverseSuffix(p) => hit(!text.ends_with(p.as_str())),
        }
    }

    fn fuzzy_score(&self, pattern: &str, text: &str) -> Option<f64> {
        let pattern: Vec<char> = pattern.chars().collect();
        if pattern.len() < self.options.min_match_char_length {
            return None;
        }
        let text: Vec<char> = text.chars().collect();
        let (errors, end) = best_substring_distance(&pattern, &text);

        let mut score = errors as f64 / pattern.len() as f64;
        if !self.options.ignore_location && self.options.distance > 0 {
            let start = (end + 1).saturating_sub(pattern.len());
            let proximity = start.abs_diff(self.options.location);
            score += proximity as f64 / self.options.distance as f64;
        }
        (score <= self.options.threshold).then_some(score.min(1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Fuzzy(String),
    Exact(String),
    Include(String),
    Prefix(String),
    Suffix(String),
    Inverse(String),
    InversePrefix(String),
    InverseSuffix(String),
}

/// OR groups of AND-ed terms. Empty terms (a lone operator) are dropped.
fn parse_extended(query: &str) -> Vec<Vec<Term>> {
    query
        .split(" | ")
        .map(|group| {
            group
                .split_whitespace()
                .filter_map(|token| parse_term(&token.to_lowercase()))
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

fn parse_term(token: &str) -> Option<Term> {
    let term = if let Some(rest) = token.strip_prefix("!^") {
        Term::InversePrefix(rest.to_string())
    } else if let Some(rest) = token.strip_prefix('!') {
        match rest.strip_suffix('$') {
            Some(inner) => Term::InverseSuffix(inner.to_string()),
            None => Term::Inverse(rest.to_string()),
        }
    } else if let Some(rest) = token.strip_prefix('=') {
        Term::Exact(rest.to_string())
    } else if let Some(rest) = token.strip_prefix('\'') {
        Term::Include(rest.to_string())
    } else if let Some(rest) = token.strip_prefix('^') {
        Term::Prefix(rest.to_string())
    } else if let Some(rest) = token.strip_suffix('$') {
        Term::Suffix(rest.to_string())
    } else {
        Term::Fuzzy(token.to_string())
    };

    let empty = match &term {
        Term::Fuzzy(s)
        | Term::Exact(s)
        | Term::Include(s)
        | Term::Prefix(s)
        | Term::Suffix(s)
        | Term::Inverse(s)
        | Term::InversePrefix(s)
        | Term::InverseSuffix(s) => s.is_empty(),
    };
    (!empty).then_some(term)
}

/// Fewest edits turning `pattern` into some substring of `text`, and the index in `text`
/// where that substring ends.
fn best_substring_distance(pattern: &[char], text: &[char]) -> (usize, usize) {
    if text.is_empty() {
        return (pattern.len(), 0);
    }
    // prev[j] = edits for pattern[..i] ending at text[..j]; row 0 is free (match may start anywhere).
    let mut prev = vec![0usize; text.len() + 1];
    let mut curr = vec![0usize; text.len() + 1];
    for (i, pc) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, tc) in text.iter().enumerate() {
            let substitution = prev[j] + usize::from(pc != tc);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let mut best = (pattern.len(), 0);
    for (j, &errors) in prev.iter().enumerate().skip(1) {
        if errors < best.0 {
            best = (errors, j - 1);
        }
    }
    best
}

/// Every scalar reachable through `path`, descending into arrays at any depth.
pub fn field_values(doc: &JsonValue, path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let mut out = Vec::new();
    collect(doc, &segments, &mut out);
    out
}

fn collect(value: &JsonValue, segments: &[&str], out: &mut Vec<String>) {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        _ if segments.is_empty() => match value {
            JsonValue::String(s) => out.push(s.clone()),
            JsonValue::Number(n) => out.push(n.to_string()),
            JsonValue::Bool(b) => out.push(b.to_string()),
            _ => {}
        },
        JsonValue::Object(map) => {
            if let Some(next) = map.get(segments[0]) {
                collect(next, &segments[1..], out);
            }
        }
        _ => {}
    }
}

fn field_norm(value: &str) -> f64 {
    let words = value.split_whitespace().count().max(1);
    1.0 / (words as f64).sqrt()
}

fn normalise_weights(keys: &[SearchKey]) -> Vec<f64> {
    let total: f64 = keys.iter().map(|k| k.weight.max(0.0)).sum();
    if total <= 0.0 {
        return vec![1.0; keys.len()];
    }
    keys.iter().map(|k| k.weight.max(0.0) / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Car {
        title: String,
        city: String,
        tags: Vec<Tag>,
    }

    #[derive(Serialize)]
    struct Tag {
        name: String,
    }

    fn car(title: &str, city: &str, tags: &[&str]) -> Car {
        Car {
            title: title.to_string(),
            city: city.to_string(),
            tags: tags
                .iter()
                .map(|t| Tag {
                    name: t.to_string(),
                })
                .collect(),
        }
    }

    fn index(cars: Vec<Car>) -> SearchIndex<Car> {
        let options = SearchOptions::with_keys(vec![
            SearchKey::new("title", 2.0),
            SearchKey::new("city", 1.0),
            SearchKey::new("tags.name", 1.0),
        ]);
        SearchIndex::new(cars, options).unwrap()
    }

    #[test]
    fn short_queries_return_nothing() {
        let idx = index(vec![car("BMW X5", "Jeddah", &[])]);
        assert!(idx.search("bm").is_empty());
        assert!(idx.search("  x ").is_empty());
        assert_eq!(idx.search("bmw").len(), 1);
    }

    #[test]
    fn tolerates_typos() {
        let idx = index(vec![
            car("Toyota Camry", "Riyadh", &[]),
            car("Hyundai Sonata", "Dammam", &[]),
        ]);
        let hits = idx.search("toyta");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn results_are_ordered_and_capped() {
        let mut cars: Vec<Car> = (0..15)
            .map(|i| car(&format!("Camry {}", i), "Riyadh", &[]))
            .collect();
        cars.push(car("Camri", "Riyadh", &[]));
        let idx = index(cars);

        let hits = idx.search("camry");
        assert_eq!(hits.len(), 10);
        for pair in hits.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        assert!(hits.iter().all(|h| h.index != 15));
    }

    #[test]
    fn walks_into_arrays_of_objects() {
        let idx = index(vec![
            car("Sedan", "Riyadh", &["sunroof", "leather"]),
            car("Pickup", "Riyadh", &["towbar"]),
        ]);
        let hits = idx.search("leather");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
    }

    #[test]
    fn field_values_flatten_nested_arrays() {
        let doc = serde_json::json!({
            "images": [{ "caption": "front" }, { "caption": "rear" }, {}],
            "details": { "features": ["gps", ["nested"]] }
        });
        assert_eq!(field_values(&doc, "images.caption"), vec!["front", "rear"]);
        assert_eq!(field_values(&doc, "details.features"), vec!["gps", "nested"]);
        assert!(field_values(&doc, "missing.path").is_empty());
    }

    #[test]
    fn extended_operators() {
        let idx = index(vec![
            car("Nissan Patrol", "Riyadh", &[]),
            car("Nissan Sunny", "Jeddah", &[]),
            car("Patrol Boat", "Jeddah", &[]),
        ]);

        let prefix: Vec<usize> = idx.search("^nissan").iter().map(|h| h.index).collect();
        assert_eq!(prefix, vec![0, 1]);

        let and: Vec<usize> = idx.search("'nissan !sunny").iter().map(|h| h.index).collect();
        assert_eq!(and, vec![0]);

        let exact: Vec<usize> = idx.search("=jeddah").iter().map(|h| h.index).collect();
        assert_eq!(exact, vec![1, 2]);

        let or: Vec<usize> = idx.search("sunny | boat$").iter().map(|h| h.index).collect();
        assert_eq!(or, vec![1, 2]);
    }

    #[test]
    fn exact_hit_scores_better_than_fuzzy_hit() {
        let idx = index(vec![car("Lexus LX", "Riyadh", &[]), car("Lexas", "Riyadh", &[])]);
        let hits = idx.search("lexus");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 0);
        assert!(hits[0].score < hits[1].score);
    }

    #[test]
    fn edit_distance_finds_best_substring() {
        let p: Vec<char> = "abc".chars().collect();
        let t: Vec<char> = "xxabcxx".chars().collect();
        assert_eq!(best_substring_distance(&p, &t), (0, 4));
        let t2: Vec<char> = "xxabxx".chars().collect();
        assert_eq!(best_substring_distance(&p, &t2).0, 1);
    }
}
