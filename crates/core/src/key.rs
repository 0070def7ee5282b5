//! Key and path model
//!
//! A key identifies one entity: it is scoped by an application id and a
//! namespace, and carries an ordered path of (kind, identifier) elements.
//! The first path element is the **entity group root**, the unit of
//! transactional atomicity, and it never changes for a given entity.
//!
//! Keys have a single, explicit total order (`Key::cmp`) used for both
//! storage ordering and range-query bound tightening: application id,
//! then namespace, then path elements in order (kind first, then numeric
//! ids before names), then path length.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reserved property name standing for the entity's key in filters/orders
pub const KEY_PROPERTY: &str = "__key__";

/// Identifier of one path element: a numeric id or a string name
///
/// `Id(0)` denotes an incomplete key whose id has not been assigned yet;
/// the engine completes it from the id allocator at put time. Incomplete
/// keys never appear in stored data.
///
/// The derived ordering sorts all ids before all names, matching the
/// storage order of the emulated product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Numeric id (0 = unassigned)
    Id(i64),
    /// String name
    Name(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// One (kind, identifier) element of a key path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind
    pub kind: String,
    /// Numeric id or string name
    pub id: Identifier,
}

impl PathElement {
    /// Create a path element with a numeric id
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        PathElement {
            kind: kind.into(),
            id: Identifier::Id(id),
        }
    }

    /// Create a path element with a string name
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        PathElement {
            kind: kind.into(),
            id: Identifier::Name(name.into()),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// Application/namespace-scoped entity key
///
/// Two keys are equal iff application, namespace, and full path match.
///
/// # Example
///
/// ```
/// use burrow_core::key::Key;
///
/// let parent = Key::with_name("demo-app", "", "Author", "tolkien");
/// let child = parent.child_id("Book", 42);
/// assert_eq!(child.kind(), "Book");
/// assert_eq!(child.root(), parent);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Owning application id
    pub app: String,
    /// Namespace ("" = default namespace)
    pub namespace: String,
    /// Ordered path; the first element is the entity group root
    pub path: Vec<PathElement>,
}

impl Key {
    /// Create a key from an explicit path
    pub fn new(app: impl Into<String>, namespace: impl Into<String>, path: Vec<PathElement>) -> Self {
        Key {
            app: app.into(),
            namespace: namespace.into(),
            path,
        }
    }

    /// Create a single-element key with a numeric id
    pub fn with_id(
        app: impl Into<String>,
        namespace: impl Into<String>,
        kind: impl Into<String>,
        id: i64,
    ) -> Self {
        Key::new(app, namespace, vec![PathElement::with_id(kind, id)])
    }

    /// Create a single-element key with a string name
    pub fn with_name(
        app: impl Into<String>,
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Key::new(app, namespace, vec![PathElement::with_name(kind, name)])
    }

    /// Create a child key of this one with a numeric id
    pub fn child_id(&self, kind: impl Into<String>, id: i64) -> Key {
        let mut path = self.path.clone();
        path.push(PathElement::with_id(kind, id));
        Key::new(self.app.clone(), self.namespace.clone(), path)
    }

    /// Create a child key of this one with a string name
    pub fn child_name(&self, kind: impl Into<String>, name: impl Into<String>) -> Key {
        let mut path = self.path.clone();
        path.push(PathElement::with_name(kind, name));
        Key::new(self.app.clone(), self.namespace.clone(), path)
    }

    /// Kind of the entity this key identifies (last path element)
    ///
    /// # Panics
    ///
    /// Panics on an empty path; construct keys through the helpers or run
    /// [`Key::validate`] on externally supplied keys first.
    pub fn kind(&self) -> &str {
        &self.path.last().expect("key has empty path").kind
    }

    /// Last path element
    pub fn leaf(&self) -> Option<&PathElement> {
        self.path.last()
    }

    /// Entity group root: a key containing only the first path element
    ///
    /// Every entity's owning entity group is determined solely by its key
    /// path; this is the identity of that group.
    pub fn root(&self) -> Key {
        Key::new(
            self.app.clone(),
            self.namespace.clone(),
            self.path.first().cloned().into_iter().collect(),
        )
    }

    /// True if this key is its own entity group root
    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }

    /// Parent key, if any (path minus the last element)
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Key::new(
            self.app.clone(),
            self.namespace.clone(),
            self.path[..self.path.len() - 1].to_vec(),
        ))
    }

    /// True if every path element has an assigned identifier
    ///
    /// A key with a trailing `Id(0)` is incomplete and must be completed
    /// by the id allocator before it can be stored.
    pub fn is_complete(&self) -> bool {
        self.path
            .iter()
            .all(|elem| !matches!(elem.id, Identifier::Id(0)))
    }

    /// Return a copy of this key with the leaf id replaced
    pub fn with_assigned_id(&self, id: i64) -> Key {
        let mut key = self.clone();
        if let Some(leaf) = key.path.last_mut() {
            leaf.id = Identifier::Id(id);
        }
        key
    }

    /// True if `ancestor`'s path is a prefix of this key's path
    /// (same application and namespace)
    pub fn has_ancestor(&self, ancestor: &Key) -> bool {
        self.app == ancestor.app
            && self.namespace == ancestor.namespace
            && self.path.len() >= ancestor.path.len()
            && self.path[..ancestor.path.len()] == ancestor.path[..]
    }

    /// Validate basic key structure
    ///
    /// Rejects empty paths, empty application ids, empty kinds, and empty
    /// name identifiers. Id values are unrestricted (0 = incomplete).
    pub fn validate(&self) -> Result<()> {
        if self.app.is_empty() {
            return Err(Error::BadKey("empty application id".to_string()));
        }
        if self.path.is_empty() {
            return Err(Error::BadKey("empty key path".to_string()));
        }
        for elem in &self.path {
            if elem.kind.is_empty() {
                return Err(Error::BadKey("empty kind in key path".to_string()));
            }
            if matches!(&elem.id, Identifier::Name(name) if name.is_empty()) {
                return Err(Error::BadKey("empty name in key path".to_string()));
            }
        }
        Ok(())
    }
}

// The single total order for keys: app, namespace, then path elements in
// order (kind, then ids-before-names), then path length. Storage ordering
// and range-bound tightening both go through this.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.app
            .cmp(&other.app)
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.app)?;
        if !self.namespace.is_empty() {
            write!(f, "!{}", self.namespace)?;
        }
        write!(f, ":")?;
        for (i, elem) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", elem)?;
        }
        Ok(())
    }
}
