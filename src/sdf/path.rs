use std::{fmt, result, str::FromStr, sync::Arc};

use anyhow::{bail, ensure, Result};

use super::{parser, ElementKind};
use crate::tf::{self, Interner, Token};

#[inline]
pub fn path(str: impl AsRef<str>) -> Result<Path> {
    let path = str.as_ref();
    Path::new(path)
}

/// Where a path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anchor {
    /// `/`
    AbsoluteRoot,
    /// `.`, or an implicit start of a relative path like `foo/bar`.
    ReflexiveRelative,
    /// One or more `..` steps.
    Parent(usize),
}

/// A single element of a [`Path`] after its anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Prim(Token),
    VariantSelection { set: Token, selection: Token },
    Property(Token),
    /// Relationship target (`[/Target]`).
    Target(Path),
    /// Property of a relationship target (`.rel[/Target].attr`).
    RelationalAttribute(Token),
    /// `.mapper[/Path]`
    Mapper(Path),
    MapperArg(Token),
    /// `.expression`
    Expression,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Prim(_) => ElementKind::Prim,
            Element::VariantSelection { .. } => ElementKind::VariantSelection,
            Element::Property(_) => ElementKind::Property,
            Element::Target(_) => ElementKind::Target,
            Element::RelationalAttribute(_) => ElementKind::RelationalAttribute,
            Element::Mapper(_) => ElementKind::Mapper,
            Element::MapperArg(_) => ElementKind::MapperArg,
            Element::Expression => ElementKind::Expression,
        }
    }

    /// Element name, empty for targets, mappers and variant selections.
    pub fn name(&self) -> &str {
        match self {
            Element::Prim(name)
            | Element::Property(name)
            | Element::RelationalAttribute(name)
            | Element::MapperArg(name) => name.as_str(),
            Element::Expression => Path::EXPRESSION_KEYWORD,
            Element::VariantSelection { .. } | Element::Target(_) | Element::Mapper(_) => "",
        }
    }
}

/// Element text without the prim separator.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Prim(name) => write!(f, "{}", name),
            Element::VariantSelection { set, selection } => write!(f, "{{{}={}}}", set, selection),
            Element::Property(name) | Element::RelationalAttribute(name) | Element::MapperArg(name) => {
                write!(f, ".{}", name)
            }
            Element::Target(path) => write!(f, "[{}]", path),
            Element::Mapper(path) => write!(f, ".{}[{}]", Path::MAPPER_KEYWORD, path),
            Element::Expression => write!(f, ".{}", Path::EXPRESSION_KEYWORD),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PathData {
    anchor: Anchor,
    elements: Vec<Element>,
}

/// `SdfPath` implementation.
///
/// # Syntax
/// - Two separators are used between parts of a path. A slash ("/")
/// following an identifier is used to introduce a namespace child.
/// - A period (".") following an identifier is used to introduce a property.
/// - A property may also have several non-sequential colons (':') in its name
/// to provide a rudimentary namespace within properties but may not end or
/// begin with a colon.
/// - Brackets ("[" and "]") are used to indicate relationship target paths for
/// relational attributes.
/// - Braces ("{" and "}") hold variant selections (`{set=selection}`).
///
/// Paths are immutable values: every transformation returns a new path and
/// equality is structural. Cloning is a reference count bump.
///
/// Names passed to [`Path::new`] and the `append_*` methods are interned
/// through [`Interner::global`]. Use [`parser::Parser`] to parse with another
/// interner; its paths still compare equal to globally interned ones.
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    data: Option<Arc<PathData>>,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(data) = &self.data else {
            return Ok(());
        };

        match data.anchor {
            Anchor::AbsoluteRoot => f.write_str("/")?,
            Anchor::ReflexiveRelative if data.elements.is_empty() => f.write_str(".")?,
            Anchor::ReflexiveRelative => {}
            Anchor::Parent(count) => {
                for i in 0..count {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    f.write_str("..")?;
                }
            }
        }

        let after_parent = matches!(data.anchor, Anchor::Parent(_));

        for (index, element) in data.elements.iter().enumerate() {
            let prev = index.checked_sub(1).map(|i| &data.elements[i]);

            let slash = match (element, prev) {
                (Element::Prim(_), Some(Element::Prim(_))) => true,
                (Element::Prim(_) | Element::Property(_), None) => after_parent,
                _ => false,
            };

            if slash {
                f.write_str("/")?;
            }

            write!(f, "{}", element)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Path").field(&self.to_string()).finish()
    }
}

impl FromStr for Path {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> result::Result<Path, Self::Err> {
        if s.is_empty() {
            return Ok(Path::empty());
        }

        Ok(parser::parse_path(s)?)
    }
}

impl Path {
    pub const MAPPER_KEYWORD: &'static str = "mapper";
    pub const EXPRESSION_KEYWORD: &'static str = "expression";

    pub fn new(path: &str) -> Result<Self> {
        Path::from_str(path)
    }

    /// The empty path, which identifies nothing.
    #[inline]
    pub fn empty() -> Path {
        Path { data: None }
    }

    #[inline]
    pub fn abs_root() -> Path {
        Path::from_parts(Anchor::AbsoluteRoot, Vec::new())
    }

    /// The `.` path.
    #[inline]
    pub fn reflexive_relative() -> Path {
        Path::from_parts(Anchor::ReflexiveRelative, Vec::new())
    }

    /// Assembles a path without validation. The caller guarantees that the
    /// elements follow the path grammar.
    pub(crate) fn from_parts(anchor: Anchor, elements: Vec<Element>) -> Path {
        Path {
            data: Some(Arc::new(PathData { anchor, elements })),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    #[inline]
    pub fn anchor(&self) -> Option<Anchor> {
        self.data.as_ref().map(|data| data.anchor)
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        self.data.as_ref().map_or(&[], |data| data.elements.as_slice())
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements().len()
    }

    #[inline]
    fn last(&self) -> Option<&Element> {
        self.elements().last()
    }

    /// Number of leading `..` steps.
    pub fn parent_count(&self) -> usize {
        match self.anchor() {
            Some(Anchor::Parent(count)) => count,
            _ => 0,
        }
    }

    #[inline]
    pub fn is_abs(&self) -> bool {
        self.anchor() == Some(Anchor::AbsoluteRoot)
    }

    #[inline]
    pub fn is_absolute_root(&self) -> bool {
        self.is_abs() && self.elements().is_empty()
    }

    #[inline]
    pub fn is_reflexive_relative(&self) -> bool {
        self.anchor() == Some(Anchor::ReflexiveRelative) && self.elements().is_empty()
    }

    /// Name of the last element.
    ///
    /// Returns `..` and `.` for anchor-only relative paths and an empty string
    /// for the absolute root, the empty path, target, mapper and variant
    /// selection paths.
    pub fn name(&self) -> &str {
        match (self.last(), self.anchor()) {
            (Some(element), _) => element.name(),
            (None, Some(Anchor::Parent(_))) => "..",
            (None, Some(Anchor::ReflexiveRelative)) => ".",
            (None, _) => "",
        }
    }

    /// Interned name of the last element, if it has one.
    pub fn name_token(&self) -> Option<&Token> {
        match self.last()? {
            Element::Prim(name)
            | Element::Property(name)
            | Element::RelationalAttribute(name)
            | Element::MapperArg(name) => Some(name),
            _ => None,
        }
    }

    /// Returns whether the path identifies a prim. `.` and `..` count as prim
    /// paths, the absolute root does not.
    pub fn is_prim_path(&self) -> bool {
        match self.last() {
            Some(element) => matches!(element, Element::Prim(_)),
            None => matches!(self.anchor(), Some(Anchor::ReflexiveRelative | Anchor::Parent(_))),
        }
    }

    pub fn is_absolute_root_or_prim_path(&self) -> bool {
        self.is_absolute_root() || self.is_prim_path()
    }

    pub fn is_prim_variant_selection_path(&self) -> bool {
        matches!(self.last(), Some(Element::VariantSelection { .. }))
    }

    pub fn contains_prim_variant_selection(&self) -> bool {
        self.elements()
            .iter()
            .any(|element| matches!(element, Element::VariantSelection { .. }))
    }

    pub fn is_property_path(&self) -> bool {
        matches!(self.last(), Some(Element::Property(_) | Element::RelationalAttribute(_)))
    }

    pub fn is_prim_property_path(&self) -> bool {
        matches!(self.last(), Some(Element::Property(_)))
    }

    pub fn is_namespaced_property_path(&self) -> bool {
        self.is_property_path() && self.name().contains(Self::NS_DELIMITER_CHAR)
    }

    pub fn is_target_path(&self) -> bool {
        matches!(self.last(), Some(Element::Target(_)))
    }

    pub fn is_relational_attribute_path(&self) -> bool {
        matches!(self.last(), Some(Element::RelationalAttribute(_)))
    }

    pub fn is_mapper_path(&self) -> bool {
        matches!(self.last(), Some(Element::Mapper(_)))
    }

    pub fn is_mapper_arg_path(&self) -> bool {
        matches!(self.last(), Some(Element::MapperArg(_)))
    }

    pub fn is_expression_path(&self) -> bool {
        matches!(self.last(), Some(Element::Expression))
    }

    /// Returns whether the path is or has a prefix that is a target or
    /// mapper path.
    pub fn contains_target_path(&self) -> bool {
        self.elements()
            .iter()
            .any(|element| matches!(element, Element::Target(_) | Element::Mapper(_)))
    }

    /// The last variant selection in the path.
    pub fn variant_selection(&self) -> Option<(&Token, &Token)> {
        self.variant_selections().last()
    }

    pub fn variant_selections(&self) -> impl Iterator<Item = (&Token, &Token)> + '_ {
        self.elements().iter().filter_map(|element| match element {
            Element::VariantSelection { set, selection } => Some((set, selection)),
            _ => None,
        })
    }

    /// For target and relational attribute paths, the relationship target.
    pub fn target_path(&self) -> Option<&Path> {
        self.elements().iter().rev().find_map(|element| match element {
            Element::Target(path) => Some(path),
            _ => None,
        })
    }

    /// For mapper and mapper arg paths, the mapped path.
    pub fn mapper_path(&self) -> Option<&Path> {
        let mut iter = self.elements().iter().rev();

        match iter.next()? {
            Element::Mapper(path) => Some(path),
            Element::MapperArg(_) => match iter.next()? {
                Element::Mapper(path) => Some(path),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns a copy of this path with `count` elements.
    fn truncated(&self, count: usize) -> Path {
        match &self.data {
            Some(data) => Path::from_parts(data.anchor, data.elements[..count].to_vec()),
            None => Path::empty(),
        }
    }

    /// Returns the path with the last element removed.
    ///
    /// For anchor-only paths: `/` has no parent (empty path is returned), the
    /// parent of `.` is `..`, and the parent of `..` is `../..`.
    pub fn parent_path(&self) -> Path {
        let Some(data) = &self.data else {
            return Path::empty();
        };

        if !data.elements.is_empty() {
            return self.truncated(data.elements.len() - 1);
        }

        match data.anchor {
            Anchor::AbsoluteRoot => Path::empty(),
            Anchor::ReflexiveRelative => Path::from_parts(Anchor::Parent(1), Vec::new()),
            Anchor::Parent(count) => Path::from_parts(Anchor::Parent(count + 1), Vec::new()),
        }
    }

    /// Strips everything after the last prim element.
    ///
    /// `/A/B/C.foo[target].bar` becomes `/A/B/C`, `/A/B/C{set=sel}` becomes
    /// `/A/B/C`, `../.foo` becomes `..`.
    pub fn prim_path(&self) -> Path {
        let count = self
            .elements()
            .iter()
            .rposition(|element| matches!(element, Element::Prim(_)))
            .map_or(0, |pos| pos + 1);

        self.truncated(count)
    }

    /// Like [`Path::prim_path`], but keeps trailing variant selections.
    pub fn prim_or_prim_variant_selection_path(&self) -> Path {
        let count = self
            .elements()
            .iter()
            .rposition(|element| matches!(element, Element::Prim(_) | Element::VariantSelection { .. }))
            .map_or(0, |pos| pos + 1);

        self.truncated(count)
    }

    /// Removes every variant selection: `/A{v=s}B.attr` becomes `/A/B.attr`.
    pub fn strip_all_variant_selections(&self) -> Path {
        let Some(data) = &self.data else {
            return Path::empty();
        };

        if !self.contains_prim_variant_selection() {
            return self.clone();
        }

        let elements = data
            .elements
            .iter()
            .filter(|element| !matches!(element, Element::VariantSelection { .. }))
            .cloned()
            .collect();

        Path::from_parts(data.anchor, elements)
    }

    /// Returns whether `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        let (Some(anchor), Some(prefix_anchor)) = (self.anchor(), prefix.anchor()) else {
            return false;
        };

        anchor == prefix_anchor && self.elements().starts_with(prefix.elements())
    }

    /// All prefixes of this path, from the shortest to the path itself,
    /// not including the bare anchor.
    pub fn prefixes(&self) -> Vec<Path> {
        (1..=self.element_count()).map(|count| self.truncated(count)).collect()
    }

    /// Returns whether `kind` may be appended to this path.
    fn can_append(&self, kind: ElementKind) -> bool {
        let Some(anchor) = self.anchor() else {
            return false;
        };

        let elements = self.elements();
        let last = elements.last();

        match kind {
            ElementKind::Prim => matches!(last, None | Some(Element::Prim(_) | Element::VariantSelection { .. })),
            ElementKind::VariantSelection => matches!(last, Some(Element::Prim(_) | Element::VariantSelection { .. })),
            ElementKind::Property => match last {
                None => anchor != Anchor::AbsoluteRoot,
                Some(element) => matches!(element, Element::Prim(_) | Element::VariantSelection { .. }),
            },
            ElementKind::Target | ElementKind::Mapper | ElementKind::Expression => {
                matches!(last, Some(Element::Property(_) | Element::RelationalAttribute(_)))
            }
            ElementKind::RelationalAttribute => matches!(
                elements,
                [.., Element::Property(_), Element::Target(_)]
            ),
            ElementKind::MapperArg => matches!(last, Some(Element::Mapper(_))),
        }
    }

    fn append(&self, element: Element) -> Result<Path> {
        let kind = element.kind();

        ensure!(
            self.can_append(kind),
            "Cannot append {} '{}' to path <{}>",
            kind,
            element,
            self
        );

        let Some(data) = &self.data else {
            bail!("Cannot append {} to empty path", kind);
        };

        let mut elements = Vec::with_capacity(data.elements.len() + 1);
        elements.extend_from_slice(&data.elements);
        elements.push(element);

        Ok(Path::from_parts(data.anchor, elements))
    }

    pub fn append_child(&self, name: &str) -> Result<Path> {
        ensure!(tf::unicode::is_valid_identifier(name), "Invalid prim name: '{}'", name);
        self.append(Element::Prim(Interner::global().intern(name)))
    }

    pub fn append_property(&self, property: &str) -> Result<Path> {
        ensure!(!property.is_empty(), "Property name cannot be empty");
        ensure!(!self.is_property_path(), "Cannot append property to property path");
        ensure!(
            tf::unicode::is_valid_namespaced_identifier(property),
            "Invalid property name: '{}'",
            property
        );

        self.append(Element::Property(Interner::global().intern(property)))
    }

    /// Appends `{set=selection}`. The selection may be empty.
    pub fn append_variant_selection(&self, set: &str, selection: &str) -> Result<Path> {
        ensure!(Self::is_valid_variant_set_name(set), "Invalid variant set name: '{}'", set);
        ensure!(
            Self::is_valid_variant_name(selection),
            "Invalid variant name: '{}'",
            selection
        );

        let interner = Interner::global();
        self.append(Element::VariantSelection {
            set: interner.intern(set),
            selection: interner.intern(selection),
        })
    }

    pub fn append_target(&self, target: &Path) -> Result<Path> {
        ensure!(!target.is_empty(), "Target path cannot be empty");
        self.append(Element::Target(target.clone()))
    }

    pub fn append_relational_attribute(&self, name: &str) -> Result<Path> {
        ensure!(
            tf::unicode::is_valid_namespaced_identifier(name),
            "Invalid relational attribute name: '{}'",
            name
        );

        self.append(Element::RelationalAttribute(Interner::global().intern(name)))
    }

    pub fn append_mapper(&self, target: &Path) -> Result<Path> {
        ensure!(!target.is_empty(), "Mapper path cannot be empty");
        self.append(Element::Mapper(target.clone()))
    }

    pub fn append_mapper_arg(&self, name: &str) -> Result<Path> {
        ensure!(Self::is_valid_mapper_arg(name), "Invalid mapper arg name: '{}'", name);
        self.append(Element::MapperArg(Interner::global().intern(name)))
    }

    pub fn append_expression(&self) -> Result<Path> {
        self.append(Element::Expression)
    }

    /// Appends a relative path to this one, element by element.
    pub fn append_path<P>(&self, path: P) -> Result<Path>
    where
        P: TryInto<Path>,
        P::Error: Into<anyhow::Error>,
    {
        let append = path.try_into().map_err(Into::into)?;

        ensure!(!self.is_empty(), "Cannot append path to empty path");
        ensure!(!append.is_empty(), "Cannot append empty path");

        if self.is_abs() && append.is_abs() {
            bail!("Cannot append absolute path to absolute path");
        }

        ensure!(!append.is_abs(), "Cannot append absolute path <{}>", append);
        ensure!(
            append.parent_count() == 0,
            "Cannot append path with parent references <{}>",
            append
        );

        // "/prim" + "." => "/prim"
        if append.is_reflexive_relative() {
            return Ok(self.clone());
        }

        ensure!(!self.is_property_path(), "Cannot append path to property path");

        append
            .elements()
            .iter()
            .try_fold(self.clone(), |acc, element| acc.append(element.clone()))
    }

    /// Resolves a relative path against `anchor`, which must be an absolute
    /// prim path or the absolute root. `..` steps skip over variant
    /// selections.
    pub fn make_absolute(&self, anchor: &Path) -> Result<Path> {
        ensure!(!self.is_empty(), "Cannot make empty path absolute");

        if self.is_abs() {
            return Ok(self.clone());
        }

        ensure!(
            anchor.is_abs() && anchor.is_absolute_root_or_prim_path(),
            "Anchor <{}> must be an absolute prim path",
            anchor
        );

        let mut base = anchor.clone();
        for _ in 0..self.parent_count() {
            base = base.parent_path();
            while base.is_prim_variant_selection_path() {
                base = base.parent_path();
            }

            ensure!(!base.is_empty(), "Path <{}> escapes the root of <{}>", self, anchor);
        }

        let suffix = Path::from_parts(Anchor::ReflexiveRelative, self.elements().to_vec());
        if suffix.is_reflexive_relative() {
            return Ok(base);
        }

        base.append_path(suffix)
    }

    pub const NS_DELIMITER_CHAR: char = ':';

    /// Validate identifier.
    ///
    /// See [`tf::unicode::is_valid_identifier`].
    pub fn is_valid_identifier(name: &str) -> bool {
        tf::unicode::is_valid_identifier(name)
    }

    pub fn is_valid_namespace_identifier(name: &str) -> bool {
        tf::unicode::is_valid_namespaced_identifier(name)
    }

    /// Variant set names are identifiers that may also contain `-`.
    pub fn is_valid_variant_set_name(name: &str) -> bool {
        let mut chars = name.chars();

        match chars.next() {
            Some(first) if tf::unicode::is_identifier_start(first as u32) => {
                chars.all(|c| c == '-' || tf::unicode::is_identifier_continue(c as u32))
            }
            _ => false,
        }
    }

    /// Variant names may be empty, start with `.`, and contain `|` and `-`.
    pub fn is_valid_variant_name(name: &str) -> bool {
        name.strip_prefix('.')
            .unwrap_or(name)
            .chars()
            .all(|c| c == '|' || c == '-' || tf::unicode::is_identifier_continue(c as u32))
    }

    fn is_valid_mapper_arg(name: &str) -> bool {
        let mut chars = name.chars();

        match chars.next() {
            Some(first) if first == '_' || first.is_ascii_alphabetic() => {
                chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
            }
            _ => false,
        }
    }
}

impl TryFrom<&str> for Path {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> result::Result<Path, Self::Error> {
        Path::from_str(s)
    }
}

impl TryFrom<String> for Path {
    type Error = anyhow::Error;

    fn try_from(value: String) -> result::Result<Self, Self::Error> {
        Path::from_str(&value)
    }
}
