//! Entities: a key, a version and a bag of typed properties.

mod record;

pub use record::EntityRecord;

use crate::error::{CoreError, CoreResult};
use crate::key::{IdOrName, KeyPath};
use crate::value::{classify, Value};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A typed property bag identified by a [`KeyPath`].
///
/// An entity always has a key; a fresh entity without a name or id carries
/// an incomplete key that [`Storage::put`](crate::Storage::put) completes.
/// The version starts at 0 and only moves when a sync is confirmed by the
/// server.
///
/// Properties are kept sorted by name, so iteration order and the content
/// digest do not depend on insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: KeyPath,
    version: u64,
    properties: BTreeMap<String, Value>,
}

/// Builder for [`Entity`].
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    kind: String,
    name: Option<String>,
    id: Option<u64>,
    parent: Option<KeyPath>,
    namespace: Option<String>,
    application: Option<String>,
    version: u64,
}

impl EntityBuilder {
    /// Sets the key name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the numeric id. `0` means "assign on put".
    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Places the entity under `parent`.
    pub fn parent(mut self, parent: &KeyPath) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Sets the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the application id (root entities only; children inherit).
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Sets the initial version.
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Builds the entity and its key.
    ///
    /// # Errors
    ///
    /// - `MissingKind` if the kind is empty
    /// - `AmbiguousIdentity` if both a name and a non-zero id were given
    /// - any [`KeyPath::from_path`] error
    pub fn build(self) -> CoreResult<Entity> {
        if self.kind.is_empty() {
            return Err(CoreError::MissingKind);
        }

        let id = self.id.filter(|&id| id != 0);
        let identity = match (self.name, id) {
            (Some(_), Some(_)) => return Err(CoreError::AmbiguousIdentity),
            (Some(name), None) => IdOrName::Name(name),
            (None, Some(id)) => IdOrName::Id(id),
            (None, None) => IdOrName::Id(0),
        };

        let parent = self.parent.as_ref();
        let namespace = self.namespace.as_deref();
        let key = match self.application.as_deref() {
            Some(app) => KeyPath::from_path_in_app(app, &self.kind, identity, parent, namespace)?,
            None => KeyPath::from_path(&self.kind, identity, parent, namespace)?,
        };

        Ok(Entity {
            key,
            version: self.version,
            properties: BTreeMap::new(),
        })
    }
}

impl Entity {
    /// Starts building an entity of `kind`.
    pub fn builder(kind: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            kind: kind.into(),
            name: None,
            id: None,
            parent: None,
            namespace: None,
            application: None,
            version: 0,
        }
    }

    /// Creates a root entity of `kind` with an incomplete key.
    pub fn new(kind: impl Into<String>) -> CoreResult<Self> {
        Self::builder(kind).build()
    }

    /// Creates an entity around an existing key.
    #[must_use]
    pub fn with_key(key: KeyPath) -> Self {
        Self {
            key,
            version: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    pub(crate) fn set_key(&mut self, key: KeyPath) {
        self.key = key;
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.key.kind()
    }

    /// Returns the last server-confirmed version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Overwrites the version.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Sets one property.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `name` is empty
    /// - `InvalidValue` if `value` is a non-finite float
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> CoreResult<&mut Self> {
        self.install(vec![(name.into(), value.into())])
    }

    /// Sets several properties, overwriting existing ones.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if any name is empty and `InvalidValue` for
    /// a non-finite float; no property is changed in either case.
    pub fn update<I, K, V>(&mut self, properties: I) -> CoreResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let staged: Vec<(String, Value)> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.install(staged)
    }

    /// Sets properties from a JSON object, boxing each raw value with
    /// [`classify`].
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `object` is not a JSON object
    /// - `UnknownValueType` if a value has no matching variant
    ///
    /// On error no property is changed.
    pub fn update_json(&mut self, object: &JsonValue) -> CoreResult<&mut Self> {
        let map = object
            .as_object()
            .ok_or_else(|| CoreError::invalid_argument("properties must be a JSON object"))?;
        let staged = map
            .iter()
            .map(|(name, raw)| classify(raw).map(|value| (name.clone(), value)))
            .collect::<CoreResult<Vec<_>>>()?;
        self.install(staged)
    }

    fn install(&mut self, staged: Vec<(String, Value)>) -> CoreResult<&mut Self> {
        if staged.iter().any(|(name, _)| name.is_empty()) {
            return Err(CoreError::invalid_argument("property name must not be empty"));
        }
        for (_, value) in &staged {
            value.validate()?;
        }
        self.properties.extend(staged);
        Ok(self)
    }

    /// Returns a property, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns a property.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` if it is not set.
    pub fn get_property(&self, name: &str) -> CoreResult<&Value> {
        self.properties.get(name).ok_or_else(|| CoreError::UnknownProperty {
            name: name.to_string(),
        })
    }

    /// Removes a property and returns its value.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `name` is empty
    /// - `UnknownProperty` if it is not set
    pub fn delete_property(&mut self, name: &str) -> CoreResult<Value> {
        if name.is_empty() {
            return Err(CoreError::invalid_argument("property name must not be empty"));
        }
        self.properties.remove(name).ok_or_else(|| CoreError::UnknownProperty {
            name: name.to_string(),
        })
    }

    /// Returns true if the property is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Returns the property names in ascending order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Returns the properties in ascending name order.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns the serializable record form.
    #[must_use]
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            kind: self.kind().to_string(),
            key: self.key.clone(),
            version: self.version,
            name: self.key.name().map(str::to_string),
            id: self.key.id(),
            properties: self
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), value.to_wire()))
                .collect(),
        }
    }

    /// Returns the record form as a JSON value.
    pub fn to_json(&self) -> CoreResult<JsonValue> {
        Ok(serde_json::to_value(self.to_record())?)
    }

    /// Returns the record form as compact JSON text.
    pub fn to_json_string(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Reconstructs an entity from its record, using the record's key.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `kind` disagrees with the key
    /// - any [`Value::from_wire`] error
    pub fn from_record(record: EntityRecord) -> CoreResult<Self> {
        if record.kind != record.key.kind() {
            return Err(CoreError::invalid_argument(format!(
                "record kind {:?} does not match key kind {:?}",
                record.kind,
                record.key.kind()
            )));
        }
        let key = record.key.clone();
        Self::from_record_with_key(key, &record)
    }

    /// Reconstructs an entity from `record`'s version and properties under
    /// `key`.
    ///
    /// # Errors
    ///
    /// Any [`Value::from_wire`] error.
    pub fn from_record_with_key(key: KeyPath, record: &EntityRecord) -> CoreResult<Self> {
        let properties = record
            .properties
            .iter()
            .map(|(name, wire)| wire.to_value().map(|value| (name.clone(), value)))
            .collect::<CoreResult<BTreeMap<_, _>>>()?;
        Ok(Self {
            key,
            version: record.version,
            properties,
        })
    }

    /// Returns the content digest used for change detection.
    ///
    /// The input is the encoded key followed by the compact JSON of each
    /// property's wire form, in ascending name order. Neither property names
    /// nor the version are part of the digest.
    pub fn content_digest(&self) -> CoreResult<String> {
        let mut input = String::from(self.key.as_str());
        for value in self.properties.values() {
            input.push_str(&value.to_wire().to_json_string()?);
        }
        Ok(synkit_codec::digest(&input))
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}
