//! Dotted paths, form input names, and JSON tree access.
//!
//! State paths are dot-separated (`macros.0.value`); form controls use the
//! bracketed input-name form (`macros[0][value]`). A segment made only of
//! digits without a leading zero is an array index, everything else is an
//! object key.

use serde_json::{Map, Value};

/// One component of a dotted path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn parse(raw: &str) -> Segment {
        if is_index(raw)
            && let Ok(n) = raw.parse::<usize>()
        {
            return Segment::Index(n);
        }
        Segment::Key(raw.to_string())
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(n) => n.to_string(),
        }
    }
}

fn is_index(raw: &str) -> bool {
    !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw.len() == 1 || !raw.starts_with('0'))
}

/// Splits a dotted path into segments. Empty components are dropped.
pub fn split_path(path: &str) -> Vec<Segment> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(Segment::parse)
        .collect()
}

/// Joins a parent path and a child key.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

// ─── Input names ─────────────────────────────────────────────────────────────

/// Converts a form input name into a dotted state path.
///
/// `macros[0][value]` becomes `macros.0.value`. Empty bracket groups are
/// ignored.
pub fn input_name_to_path(name: &str) -> String {
    let (head, rest) = match name.find('[') {
        Some(pos) => name.split_at(pos),
        None => return name.to_string(),
    };

    let mut parts: Vec<&str> = Vec::new();
    if !head.is_empty() {
        parts.push(head);
    }

    let mut remaining = rest;
    while let Some(open) = remaining.find('[') {
        let after = &remaining[open + 1..];
        match after.find(']') {
            Some(close) => {
                let inner = &after[..close];
                if !inner.is_empty() {
                    parts.push(inner);
                }
                remaining = &after[close + 1..];
            }
            None => {
                // Unterminated bracket: keep the tail as a literal key.
                if !after.is_empty() {
                    parts.push(after);
                }
                break;
            }
        }
    }

    parts.join(".")
}

/// Converts a dotted state path into a form input name.
///
/// `macros.0.value` becomes `macros[0][value]`.
pub fn path_to_input_name(path: &str) -> String {
    let mut parts = path.split('.').filter(|s| !s.is_empty());
    let mut name = match parts.next() {
        Some(first) => first.to_string(),
        None => return String::new(),
    };
    for part in parts {
        name.push('[');
        name.push_str(part);
        name.push(']');
    }
    name
}

// ─── Tree access ─────────────────────────────────────────────────────────────

/// Resolves a dotted path against a value tree.
///
/// Returns `None` if any segment fails to resolve. Empty path returns the root.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in split_path(path) {
        current = match (current, &segment) {
            (Value::Array(arr), Segment::Index(n)) => arr.get(*n)?,
            (Value::Object(obj), seg) => obj.get(&seg.as_key())?,
            _ => return None,
        };
    }
    Some(current)
}

fn resolve_mut<'a>(value: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in segments {
        current = match (current, segment) {
            (Value::Array(arr), Segment::Index(n)) => arr.get_mut(*n)?,
            (Value::Object(obj), seg) => obj.get_mut(&seg.as_key())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Whether `path` can be assigned without discarding existing data.
///
/// A key segment addressing an existing array cannot: the rows would have to
/// be replaced by an object.
pub fn is_assignable(root: &Value, path: &str) -> bool {
    let mut current = Some(root);
    for segment in split_path(path) {
        current = match (current, &segment) {
            (Some(Value::Array(_)), Segment::Key(_)) => return false,
            (Some(Value::Array(arr)), Segment::Index(n)) => arr.get(*n),
            (Some(Value::Object(obj)), seg) => obj.get(&seg.as_key()),
            _ => None,
        };
    }
    true
}

/// Makes sure `slot` can hold children addressed by `segment`.
///
/// Scalars (including `null`) are replaced by an array when the segment is an
/// index and by an object otherwise. An object addressed by an index keeps its
/// shape and is indexed by the decimal key. Arrays are never replaced.
fn ensure_container(slot: &mut Value, segment: &Segment) {
    match (&*slot, segment) {
        (Value::Object(_) | Value::Array(_), _) => {}
        (_, Segment::Index(_)) => *slot = Value::Array(Vec::new()),
        (_, Segment::Key(_)) => *slot = Value::Object(Map::new()),
    }
}

fn child_slot<'a>(container: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    ensure_container(container, segment);
    match (container, segment) {
        (Value::Array(arr), Segment::Index(n)) => {
            if arr.len() <= *n {
                arr.resize(n + 1, Value::Null);
            }
            arr.get_mut(*n)
        }
        (Value::Object(obj), seg) => Some(obj.entry(seg.as_key()).or_insert(Value::Null)),
        _ => None,
    }
}

/// Assigns `new` at `path`, creating intermediate containers as needed.
///
/// Returns the previous value, or `None` if the leaf did not exist. A path
/// that fails [`is_assignable`] leaves the tree untouched and returns `None`.
pub fn assign(root: &mut Value, path: &str, new: Value) -> Option<Value> {
    if !is_assignable(root, path) {
        return None;
    }
    let segments = split_path(path);
    let Some((leaf, parents)) = segments.split_last() else {
        return Some(std::mem::replace(root, new));
    };

    let mut current = root;
    for segment in parents {
        current = child_slot(current, segment)?;
    }

    ensure_container(current, leaf);
    match (current, leaf) {
        (Value::Array(arr), Segment::Index(n)) => {
            if *n < arr.len() {
                Some(std::mem::replace(&mut arr[*n], new))
            } else {
                arr.resize(*n, Value::Null);
                arr.push(new);
                None
            }
        }
        (Value::Object(obj), seg) => obj.insert(seg.as_key(), new),
        _ => None,
    }
}

/// Removes the value at `path`.
///
/// Array elements after the removed one shift down by one; object keys keep
/// their relative order.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let segments = split_path(path);
    let (leaf, parents) = segments.split_last()?;
    let parent = resolve_mut(root, parents)?;
    match (parent, leaf) {
        (Value::Array(arr), Segment::Index(n)) if *n < arr.len() => Some(arr.remove(*n)),
        (Value::Object(obj), seg) => obj.shift_remove(&seg.as_key()),
        _ => None,
    }
}

/// Flattens a state tree into `(input name, value)` pairs.
///
/// Objects contribute `name[key]`, arrays `name[index]`. Empty containers are
/// emitted as values of their own so they are visible to callers.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let Value::Object(obj) = value {
        for (key, child) in obj {
            flatten_into(key.clone(), child, &mut out);
        }
    }
    out
}

fn flatten_into(name: String, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (key, child) in obj {
                flatten_into(format!("{}[{}]", name, key), child, out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, child) in arr.iter().enumerate() {
                flatten_into(format!("{}[{}]", name, i), child, out);
            }
        }
        _ => out.push((name, value.clone())),
    }
}

/// Whether a value counts as empty for required-ness: `null`, `""` or `[]`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Renders a scalar for a text control.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}
