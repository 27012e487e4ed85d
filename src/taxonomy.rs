use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Per-source lookup from an original class id to its id in the unified
/// taxonomy.
///
/// Ids without an entry resolve to themselves, so a label referencing a class
/// the taxonomy never named keeps its original id instead of failing the
/// copy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdMap {
    entries: HashMap<usize, usize>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, original: usize, unified: usize) {
        self.entries.insert(original, unified);
    }

    pub fn get(&self, original: usize) -> Option<usize> {
        self.entries.get(&original).copied()
    }

    /// Unified id for `original`, falling back to `original` when unmapped.
    pub fn remap(&self, original: usize) -> usize {
        self.get(original).unwrap_or(original)
    }
}

impl FromIterator<(usize, usize)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Ordered, de-duplicated union of two taxonomies.
///
/// Names from `first` keep their relative order; names from `second` are
/// appended in order when not already present. Comparison is exact string
/// equality, with no case-folding or trimming.
pub fn unify(first: &[String], second: &[String]) -> Vec<String> {
    let mut unified: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for name in first.iter().chain(second.iter()) {
        if !unified.iter().any(|existing| existing == name) {
            unified.push(name.clone());
        }
    }
    unified
}

/// Id map for one source against the unified taxonomy.
///
/// Each source name found in `unified` maps its position in `source` to its
/// position in `unified`. Names missing from `unified` stay unmapped and
/// resolve through the original-id fallback.
pub fn build_id_map(source: &[String], unified: &[String]) -> IdMap {
    let mut map = IdMap::new();
    for (original, name) in source.iter().enumerate() {
        if let Some(position) = unified.iter().position(|candidate| candidate == name) {
            map.insert(original, position);
        }
    }
    map
}

/// Class names from the `names` list of a dataset YAML file.
///
/// Scalar entries are read by their string form, so an unquoted numeric name
/// keeps its position and later ids stay aligned. An absent file, an
/// unparseable document, a `names` field that is not a list and a list
/// holding non-scalar entries all degrade to an empty taxonomy so the caller
/// can continue without that source.
pub fn read_set_names(path: &Path) -> Vec<String> {
    if !path.is_file() {
        return Vec::new();
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let doc: serde_yaml::Value = match serde_yaml::from_str(&text) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match doc.get("names") {
        Some(serde_yaml::Value::Sequence(entries)) => {
            let mut names = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    serde_yaml::Value::String(name) => names.push(name.clone()),
                    serde_yaml::Value::Number(number) => names.push(number.to_string()),
                    serde_yaml::Value::Bool(flag) => names.push(flag.to_string()),
                    _ => {
                        warn!(
                            "'names' in {} holds a non-scalar entry; ignoring the list",
                            path.display()
                        );
                        return Vec::new();
                    }
                }
            }
            names
        }
        Some(_) => {
            warn!("'names' in {} is not a list; ignoring it", path.display());
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Class names from a plain text file, one per non-empty line.
pub fn read_classes_txt(path: &Path) -> Vec<String> {
    if !path.is_file() {
        return Vec::new();
    }
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
