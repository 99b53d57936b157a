//! Hierarchical entity keys.
//!
//! A key is the serialization of its own ancestor chain. The decoded layout
//! is
//!
//! ```text
//! app@namespace!!RootKind\n50001\tChildKind\bkey_name
//!  |      |          |        |        |          |
//! app  namespace   parent  numeric   entity    key name
//!                    kind     id       kind
//! ```
//!
//! and the external form is that string run through the text-safe codec, so
//! it can be used directly as a flat store key. Numeric id `0` marks an
//! incomplete key that has not been assigned an identity yet.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Application id used for root keys when none is given.
pub const DEFAULT_APPLICATION_ID: &str = "synkit";

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Maximum namespace length in characters.
pub const MAX_NAMESPACE_LEN: usize = 100;

const KIND_ID_SEP: char = '\n';
const KIND_NAME_SEP: char = '\u{8}';
const APP_ID_SEP: char = '@';
const NAMESPACE_SEP: &str = "!!";
const PATH_SEP: char = '\t';

/// Caller-supplied identity for a new path element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdOrName {
    /// Numeric id; `0` requests an incomplete key.
    Id(u64),
    /// Key name; must be non-empty.
    Name(String),
}

impl From<u64> for IdOrName {
    fn from(id: u64) -> Self {
        IdOrName::Id(id)
    }
}

impl From<u32> for IdOrName {
    fn from(id: u32) -> Self {
        IdOrName::Id(u64::from(id))
    }
}

impl From<&str> for IdOrName {
    fn from(name: &str) -> Self {
        IdOrName::Name(name.to_string())
    }
}

impl From<String> for IdOrName {
    fn from(name: String) -> Self {
        IdOrName::Name(name)
    }
}

impl From<&String> for IdOrName {
    fn from(name: &String) -> Self {
        IdOrName::Name(name.clone())
    }
}

impl TryFrom<i64> for IdOrName {
    type Error = CoreError;

    fn try_from(id: i64) -> CoreResult<Self> {
        u64::try_from(id)
            .map(IdOrName::Id)
            .map_err(|_| CoreError::invalid_identity(format!("negative id {id}")))
    }
}

impl TryFrom<&serde_json::Value> for IdOrName {
    type Error = CoreError;

    fn try_from(value: &serde_json::Value) -> CoreResult<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(IdOrName::Id).ok_or_else(|| {
                CoreError::invalid_identity(format!("{n} is not a non-negative integer"))
            }),
            serde_json::Value::String(s) => Ok(IdOrName::Name(s.clone())),
            other => Err(CoreError::invalid_identity(format!(
                "expected number or string, got {other}"
            ))),
        }
    }
}

/// The identity of one path element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Not yet assigned (encoded as numeric id `0`).
    Incomplete,
    /// A positive numeric id.
    Id(u64),
    /// A key name.
    Name(String),
}

impl Identity {
    fn from_input(input: IdOrName) -> CoreResult<Self> {
        match input {
            IdOrName::Id(0) => Ok(Identity::Incomplete),
            IdOrName::Id(id) => Ok(Identity::Id(id)),
            IdOrName::Name(name) => {
                validate_name(&name)?;
                Ok(Identity::Name(name))
            }
        }
    }
}

/// One `(kind, id | name)` step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    kind: String,
    identity: Identity,
}

impl PathElement {
    /// Returns the element's kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the element's identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the numeric id, if the element has one.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self.identity {
            Identity::Id(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the key name, if the element has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.identity {
            Identity::Name(name) => Some(name),
            _ => None,
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.kind);
        match &self.identity {
            Identity::Incomplete => {
                out.push(KIND_ID_SEP);
                out.push('0');
            }
            Identity::Id(id) => {
                out.push(KIND_ID_SEP);
                out.push_str(&id.to_string());
            }
            Identity::Name(name) => {
                out.push(KIND_NAME_SEP);
                out.push_str(name);
            }
        }
    }

    fn parse(raw: &str) -> CoreResult<Self> {
        if let Some((kind, id)) = raw.split_once(KIND_ID_SEP) {
            let parsed: u64 = id
                .parse()
                .map_err(|_| CoreError::invalid_key(format!("bad numeric id {id:?}")))?;
            validate_kind(kind)?;
            let identity = if parsed == 0 {
                Identity::Incomplete
            } else {
                Identity::Id(parsed)
            };
            return Ok(Self {
                kind: kind.to_string(),
                identity,
            });
        }

        if let Some((kind, name)) = raw.split_once(KIND_NAME_SEP) {
            validate_kind(kind)?;
            validate_name(name)?;
            return Ok(Self {
                kind: kind.to_string(),
                identity: Identity::Name(name.to_string()),
            });
        }

        Err(CoreError::invalid_key(format!(
            "path element {raw:?} has no id or name"
        )))
    }
}

impl Serialize for PathElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            kind: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<u64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<&'a str>,
        }

        let id = match self.identity {
            Identity::Incomplete => Some(0),
            Identity::Id(id) => Some(id),
            Identity::Name(_) => None,
        };
        View {
            kind: &self.kind,
            id,
            name: self.name(),
        }
        .serialize(serializer)
    }
}

/// Structured form of a key: `{application, namespace, elements}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DecodedKey {
    /// Owning application id.
    pub application: String,
    /// Namespace shared by every element.
    pub namespace: String,
    /// Ancestor chain, root first; never empty.
    pub elements: Vec<PathElement>,
}

impl DecodedKey {
    fn to_raw(&self) -> String {
        let mut raw = String::new();
        raw.push_str(&self.application);
        raw.push(APP_ID_SEP);
        raw.push_str(&self.namespace);
        raw.push_str(NAMESPACE_SEP);
        raw.push_str(&path_string(&self.elements));
        raw
    }
}

fn path_string(elements: &[PathElement]) -> String {
    let mut out = String::new();
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push(PATH_SEP);
        }
        element.write_to(&mut out);
    }
    out
}

/// An immutable, hierarchical entity key.
///
/// Two keys are equal iff their decoded `(application, namespace, path)`
/// tuples are equal; the encoded string is canonical, so this is the same as
/// comparing encoded strings.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    encoded: String,
    decoded: DecodedKey,
}

impl KeyPath {
    /// Builds a key for `(kind, id_or_name)`, appended to `parent`'s path or
    /// as a new root.
    ///
    /// Root keys belong to [`DEFAULT_APPLICATION_ID`] and, unless given, to
    /// [`DEFAULT_NAMESPACE`]. Child keys inherit both from `parent`.
    ///
    /// # Errors
    ///
    /// - `InvalidKind` / `InvalidIdentity` for malformed components
    /// - `NamespaceMismatch` if `namespace` differs from `parent`'s
    /// - `InvalidNamespace` for a malformed root namespace
    pub fn from_path(
        kind: &str,
        id_or_name: impl Into<IdOrName>,
        parent: Option<&KeyPath>,
        namespace: Option<&str>,
    ) -> CoreResult<Self> {
        let application = parent
            .map(|p| p.application().to_string())
            .unwrap_or_else(|| DEFAULT_APPLICATION_ID.to_string());
        Self::from_path_in_app(&application, kind, id_or_name, parent, namespace)
    }

    /// Like [`KeyPath::from_path`], with an explicit application id.
    ///
    /// # Errors
    ///
    /// As [`KeyPath::from_path`], plus `InvalidApplication` for a malformed
    /// application id and `ApplicationMismatch` if `parent` belongs to a
    /// different application.
    pub fn from_path_in_app(
        application: &str,
        kind: &str,
        id_or_name: impl Into<IdOrName>,
        parent: Option<&KeyPath>,
        namespace: Option<&str>,
    ) -> CoreResult<Self> {
        validate_kind(kind)?;
        let element = PathElement {
            kind: kind.to_string(),
            identity: Identity::from_input(id_or_name.into())?,
        };

        let decoded = match parent {
            Some(parent) => {
                if let Some(requested) = namespace {
                    if requested != parent.namespace() {
                        return Err(CoreError::NamespaceMismatch {
                            parent: parent.namespace().to_string(),
                            requested: requested.to_string(),
                        });
                    }
                }
                if application != parent.application() {
                    return Err(CoreError::ApplicationMismatch {
                        parent: parent.application().to_string(),
                        requested: application.to_string(),
                    });
                }
                let mut decoded = parent.decoded.clone();
                decoded.elements.push(element);
                decoded
            }
            None => {
                let namespace = namespace.unwrap_or(DEFAULT_NAMESPACE);
                validate_application(application)?;
                validate_namespace(namespace)?;
                DecodedKey {
                    application: application.to_string(),
                    namespace: namespace.to_string(),
                    elements: vec![element],
                }
            }
        };

        Ok(Self::from_decoded(decoded))
    }

    /// Parses an encoded key string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the string is not a canonical encoded key, or
    /// a component validation error if a decoded component is malformed.
    pub fn from_encoded(encoded: &str) -> CoreResult<Self> {
        let raw = synkit_codec::decode(encoded)
            .map_err(|e| CoreError::invalid_key(format!("not an encoded key: {e}")))?;

        let (prefix, path) = raw
            .split_once(NAMESPACE_SEP)
            .ok_or_else(|| CoreError::invalid_key("missing namespace separator"))?;
        let (application, namespace) = prefix
            .split_once(APP_ID_SEP)
            .ok_or_else(|| CoreError::invalid_key("missing application separator"))?;
        validate_application(application)?;
        validate_namespace(namespace)?;

        if path.is_empty() {
            return Err(CoreError::invalid_key("empty path"));
        }
        let elements = path
            .split(PATH_SEP)
            .map(PathElement::parse)
            .collect::<CoreResult<Vec<_>>>()?;

        let key = Self::from_decoded(DecodedKey {
            application: application.to_string(),
            namespace: namespace.to_string(),
            elements,
        });

        if key.encoded != encoded {
            return Err(CoreError::invalid_key("non-canonical encoding"));
        }
        Ok(key)
    }

    fn from_decoded(decoded: DecodedKey) -> Self {
        let encoded = synkit_codec::encode(&decoded.to_raw());
        Self { encoded, decoded }
    }

    /// Returns the opaque encoded form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Returns the structured form.
    #[must_use]
    pub fn decode(&self) -> &DecodedKey {
        &self.decoded
    }

    /// Returns the path elements, root first.
    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.decoded.elements
    }

    /// Returns the path without application and namespace, using the raw
    /// separators (`Person\n42\tSong\bimagine`).
    #[must_use]
    pub fn path_string(&self) -> String {
        path_string(&self.decoded.elements)
    }

    /// Returns the owning application id.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.decoded.application
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.decoded.namespace
    }

    fn last(&self) -> &PathElement {
        // Construction guarantees at least one element
        &self.decoded.elements[self.decoded.elements.len() - 1]
    }

    /// Returns the kind of the key's own (last) element.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.last().kind()
    }

    /// Returns the identity of the key's own (last) element.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        self.last().identity()
    }

    /// Returns the numeric id of the last element, if any.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.last().id()
    }

    /// Returns the key name of the last element, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.last().name()
    }

    /// Returns true iff the last element has a numeric id or a name.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !matches!(self.identity(), Identity::Incomplete)
    }

    /// Returns the key of the parent entity, or `None` for a root key.
    #[must_use]
    pub fn parent(&self) -> Option<KeyPath> {
        let elements = &self.decoded.elements;
        if elements.len() < 2 {
            return None;
        }
        Some(Self::from_decoded(DecodedKey {
            application: self.decoded.application.clone(),
            namespace: self.decoded.namespace.clone(),
            elements: elements[..elements.len() - 1].to_vec(),
        }))
    }

    /// Returns the root ancestor's key (itself for a root key).
    #[must_use]
    pub fn root(&self) -> KeyPath {
        Self::from_decoded(DecodedKey {
            application: self.decoded.application.clone(),
            namespace: self.decoded.namespace.clone(),
            elements: self.decoded.elements[..1].to_vec(),
        })
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &KeyPath) -> bool {
        let mine = &self.decoded.elements;
        let theirs = &other.decoded.elements;
        self.decoded.application == other.decoded.application
            && self.decoded.namespace == other.decoded.namespace
            && mine.len() < theirs.len()
            && theirs.starts_with(mine)
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyPath({}@{}!!{:?})",
            self.application(),
            self.namespace(),
            self.path_string()
        )
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for KeyPath {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::from_encoded(s)
    }
}

impl AsRef<str> for KeyPath {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> Deserialize<'de> for KeyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        KeyPath::from_encoded(&encoded).map_err(serde::de::Error::custom)
    }
}

fn contains_separator(s: &str) -> bool {
    s.contains([KIND_ID_SEP, KIND_NAME_SEP, PATH_SEP])
}

fn validate_kind(kind: &str) -> CoreResult<()> {
    if kind.is_empty() {
        return Err(CoreError::MissingKind);
    }
    if contains_separator(kind) {
        return Err(CoreError::InvalidKind {
            kind: kind.to_string(),
            reason: "contains a reserved separator",
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_identity("key name must not be empty"));
    }
    if contains_separator(name) {
        return Err(CoreError::invalid_identity(format!(
            "key name {name:?} contains a reserved separator"
        )));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> CoreResult<()> {
    let valid = !namespace.is_empty()
        && namespace.chars().count() <= MAX_NAMESPACE_LEN
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidNamespace {
            namespace: namespace.to_string(),
        })
    }
}

fn validate_application(application: &str) -> CoreResult<()> {
    let valid = !application.is_empty()
        && application
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '~'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidApplication {
            application: application.to_string(),
        })
    }
}
