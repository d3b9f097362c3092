//! The matching view of a parsed sentence.
//!
//! A [`Fact`] is flattened into the list of root-to-leaf [`Path`]s of its parse tree. A
//! path stops early at a node whose rule name marks it as a variable, so every variable
//! occurrence is addressed by exactly one path. Literal text between the children of a
//! node becomes a leaf of its own, under the [`LITERAL`] category.
//!
//! A variable's *slot* is the node it stands in for, and the span of text it binds to
//! when matched against a fact. When the variable's node is the only child of its
//! parent (`term = { v_var | word }`) the slot is the parent; otherwise it is the
//! position of the variable itself.

use crate::{
    error::KbError,
    grammar::Grammar,
    matching::{Matching, VarMap},
};

use ::{
    itertools::Itertools,
    smallvec::SmallVec,
    std::{
        collections::HashMap,
        fmt,
        hash::{Hash, Hasher},
        rc::Rc,
    },
};

/// Category of the leaves made from literal text.
pub const LITERAL: &str = "__literal";

/// One node of a parse tree. Offsets are relative to the start of the parent node.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: Rc<str>,
    pub category: Rc<str>,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub leaf: bool,
    pub var: bool,
    /// The only child of its parent, spanning all of it.
    pub sole: bool,
}

impl Segment {
    /// Same rule at the same position under the same parent, regardless of content.
    pub fn same_slot(&self, other: &Segment) -> bool {
        self.index == other.index && self.category == other.category
    }
}

// Inner text is implied by the leaves below it, and offsets shift with the length of
// sibling words, so only leaves compare by text. A variable's slot depends on `sole`.
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.same_slot(other)
            && self.leaf == other.leaf
            && (!self.leaf || self.text == other.text)
            && (!self.var || self.sole == other.sole)
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category.hash(state);
        self.index.hash(state);
        self.leaf.hash(state);
        if self.leaf {
            self.text.hash(state);
        }
        if self.var {
            self.sole.hash(state);
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: SmallVec<[Segment; 4]>,
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Path({})",
            self.segments.iter().format_with("/", |seg, f| if seg.leaf {
                f(&format_args!("{}[{}]={:?}", seg.category, seg.index, seg.text))
            } else {
                f(&format_args!("{}[{}]", seg.category, seg.index))
            })
        )
    }
}

impl Path {
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The text of the addressed node.
    pub fn value(&self) -> &str {
        self.segments.last().map(|seg| &*seg.text).unwrap_or("")
    }

    pub fn is_var(&self) -> bool {
        self.segments.last().map(|seg| seg.var).unwrap_or(false)
    }

    /// Length of the prefix of a variable path that addresses its slot.
    fn slot_len(&self) -> usize {
        match self.segments.last() {
            Some(last) if last.sole && self.len() > 1 => self.len() - 1,
            _ => self.len(),
        }
    }

    /// The prefix of `self` that occupies the slot `var` stands in for, if `self`
    /// passes through that slot.
    pub fn get_subpath(&self, var: &Path) -> Option<Path> {
        let depth = var.slot_len();
        if depth == 0 || self.len() < depth {
            return None;
        }

        let prefix = &self.segments[..depth];
        let (last, init) = prefix.split_last()?;
        let (var_last, var_init) = var.segments[..depth].split_last()?;

        // A variable in its own slot is matched by whatever fills its position.
        let last_fits = if depth == var.len() {
            last.index == var_last.index
        } else {
            last.same_slot(var_last)
        };

        if last_fits && init.iter().zip(var_init).all(|(a, b)| a.same_slot(b)) {
            Some(Path::new(prefix.iter().cloned()))
        } else {
            None
        }
    }

    /// Whether `other` lies under the node this path addresses.
    pub fn contains(&self, other: &Path) -> bool {
        other.len() >= self.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a.same_slot(b))
    }

    /// Drop the leading paths of `paths` that lie under this one. Binding a variable to
    /// a subtree consumes every leaf below it at once.
    pub fn paths_after<'p>(&self, paths: &'p [Path]) -> &'p [Path] {
        let consumed = paths.iter().take_while(|path| self.contains(path)).count();
        &paths[consumed..]
    }

    /// Absolute byte range, within the fact text, of the node this path addresses.
    pub fn span(&self) -> (usize, usize) {
        match self.segments.split_last() {
            Some((last, init)) => {
                let base: usize = init.iter().map(|seg| seg.start).sum();
                (base + last.start, base + last.end)
            }
            None => (0, 0),
        }
    }

    /// Absolute byte range of the slot a variable path stands in for.
    pub fn slot_span(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let slot = Path::new(self.segments[..self.slot_len()].iter().cloned());
        Some(slot.span())
    }

    /// A copy of this path with the text of its last segment replaced.
    pub fn renamed(&self, text: &str) -> Path {
        let mut renamed = self.clone();
        if let Some(last) = renamed.segments.last_mut() {
            last.text = text.into();
        }
        renamed
    }
}

/// A parsed sentence. Equality and hashing look only at the leaf paths, so two texts
/// that parse to the same tree are the same fact.
#[derive(Clone)]
pub struct Fact {
    text: Rc<str>,
    paths: Rc<[Path]>,
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fact({:?})", self.text)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.paths == other.paths
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.paths.hash(state);
    }
}

impl Fact {
    pub fn new(text: &str, paths: Vec<Path>) -> Self {
        Self {
            text: text.into(),
            paths: paths.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn leaf_paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn has_vars(&self) -> bool {
        self.paths.iter().any(Path::is_var)
    }

    /// Distinct variable names, in order of first occurrence.
    pub fn vars(&self) -> Vec<&str> {
        self.paths
            .iter()
            .filter(|path| path.is_var())
            .map(Path::value)
            .unique()
            .collect()
    }

    /// Replace every bound variable's slot by its value and parse the result.
    pub fn substitute(&self, matching: &Matching, grammar: &Grammar) -> Result<Fact, KbError> {
        let mut edits = self
            .paths
            .iter()
            .filter(|path| path.is_var())
            .filter_map(|path| {
                let value = matching.get(path.value())?;
                let (start, end) = path.slot_span()?;
                Some((start, end, value))
            })
            .collect::<Vec<_>>();

        if edits.is_empty() {
            return Ok(self.clone());
        }

        edits.sort_by_key(|&(start, _, _)| start);
        let mut text = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (start, end, value) in edits {
            // Variables sharing a slot replace it once.
            if start < cursor {
                continue;
            }
            text.push_str(&self.text[cursor..start]);
            text.push_str(value);
            cursor = end;
        }
        text.push_str(&self.text[cursor..]);

        grammar.parse_fact(&text)
    }

    /// Rename variables to `v_0`, `v_1`, ... in order of first occurrence. The returned
    /// map takes each canonical name back to the one written in this fact.
    pub fn normalize(&self) -> (VarMap, Vec<Path>) {
        let mut canonical: HashMap<&str, String> = HashMap::new();
        let mut varmap = VarMap::new();

        let paths = self
            .paths
            .iter()
            .map(|path| {
                if !path.is_var() {
                    return path.clone();
                }

                let next = canonical.len();
                let name = canonical.entry(path.value()).or_insert_with(|| {
                    let name = format!("v_{}", next);
                    varmap.insert(name.clone(), path.value().to_string());
                    name
                });
                path.renamed(name)
            })
            .collect();

        (varmap, paths)
    }

    /// Match `self`, as a pattern, against a fact.
    pub fn match_against(&self, fact: &Fact) -> Option<Matching> {
        let mut matching = Matching::new();
        let mut remaining = fact.leaf_paths();

        for pattern in self.paths.iter() {
            let next = remaining.first()?;
            if pattern.is_var() {
                let subpath = next.get_subpath(pattern)?;
                matching = matching.bind(pattern.value(), subpath.value())?;
                remaining = subpath.paths_after(remaining);
            } else if pattern == next {
                remaining = &remaining[1..];
            } else {
                return None;
            }
        }

        if remaining.is_empty() {
            Some(matching.with_origin(fact.clone()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests;
