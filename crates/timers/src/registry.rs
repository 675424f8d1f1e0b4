//! Tag-to-schema registry for callback variants.
//!
//! A [`CallbackRegistry`] is assembled once at startup through
//! [`CallbackRegistryBuilder`] and is read-only afterwards. It is usually
//! wrapped in an `Arc` and shared by every [`TimerQueue`](crate::TimerQueue)
//! that stores callbacks of the registered variants.
//!
//! Encoded callbacks are JSON objects whose reserved [`TYPE_FIELD`] carries
//! the tag, followed by the variant's own fields:
//!
//! ```text
//! { "Type": "function", "Name": "daily_reset" }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tickq_core::{Error, Result};

use crate::callback::Callback;

/// Reserved discriminator field carrying the registry tag.
pub const TYPE_FIELD: &str = "Type";

/// Reads and writes exactly one concrete [`Callback`] type.
pub trait CallbackSchema<C>: Send + Sync {
    /// The tag written to [`TYPE_FIELD`].
    fn callback_type(&self) -> &str;

    /// `TypeId` of the concrete variant this schema handles.
    fn variant_id(&self) -> TypeId;

    /// Encode the variant's own fields, without the tag.
    ///
    /// # Errors
    ///
    /// Returns an error if `callback` is not this schema's variant or cannot
    /// be represented as an object.
    fn encode(&self, callback: &dyn Callback<C>) -> Result<Map<String, Value>>;

    /// Decode the variant from its fields, the tag already stripped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCallback`] if the fields do not describe a
    /// valid variant.
    fn decode(&self, fields: Map<String, Value>) -> Result<Box<dyn Callback<C>>>;
}

/// Schema for any variant that derives serde's `Serialize`/`Deserialize`.
pub struct SerdeSchema<T> {
    tag: String,
    _variant: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    /// Create a schema writing `tag` as the discriminator.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            _variant: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeSchema")
            .field("tag", &self.tag)
            .field("variant", &std::any::type_name::<T>())
            .finish()
    }
}

impl<C, T> CallbackSchema<C> for SerdeSchema<T>
where
    C: 'static,
    T: Callback<C> + Serialize + DeserializeOwned,
{
    fn callback_type(&self) -> &str {
        &self.tag
    }

    fn variant_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn encode(&self, callback: &dyn Callback<C>) -> Result<Map<String, Value>> {
        let variant = callback.as_any().downcast_ref::<T>().ok_or_else(|| {
            Error::malformed_callback(
                &self.tag,
                format!("expected {}, got {callback:?}", std::any::type_name::<T>()),
            )
        })?;

        match serde_json::to_value(variant) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(other) => Err(Error::malformed_callback(
                &self.tag,
                format!("expected an object, got {other}"),
            )),
            Err(e) => Err(Error::malformed_callback(&self.tag, e.to_string())),
        }
    }

    fn decode(&self, fields: Map<String, Value>) -> Result<Box<dyn Callback<C>>> {
        serde_json::from_value::<T>(Value::Object(fields))
            .map(|variant| Box::new(variant) as Box<dyn Callback<C>>)
            .map_err(|e| Error::malformed_callback(&self.tag, e.to_string()))
    }
}

/// Collects schemas before the registry is frozen.
pub struct CallbackRegistryBuilder<C> {
    schemas: HashMap<String, Box<dyn CallbackSchema<C>>>,
    tags_by_variant: HashMap<TypeId, String>,
}

impl<C: 'static> CallbackRegistryBuilder<C> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            tags_by_variant: HashMap::new(),
        }
    }

    /// Register a schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCallbackType`] if the tag is taken and
    /// [`Error::DuplicateCallbackVariant`] if the schema's variant is already
    /// registered under another tag. Both are startup mistakes; hosts
    /// propagate them and refuse to start.
    pub fn register(mut self, schema: impl CallbackSchema<C> + 'static) -> Result<Self> {
        let tag = schema.callback_type().to_string();

        if tag.is_empty() {
            return Err(Error::config_invalid("callback type tag must not be empty"));
        }
        if self.schemas.contains_key(&tag) {
            return Err(Error::duplicate_callback_type(tag));
        }
        if let Some(existing) = self.tags_by_variant.get(&schema.variant_id()) {
            return Err(Error::duplicate_callback_variant(tag, existing.clone()));
        }

        self.tags_by_variant.insert(schema.variant_id(), tag.clone());
        self.schemas.insert(tag, Box::new(schema));
        Ok(self)
    }

    /// Register a serde-backed variant under `tag`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_serde<T>(self, tag: impl Into<String>) -> Result<Self>
    where
        T: Callback<C> + Serialize + DeserializeOwned,
    {
        self.register(SerdeSchema::<T>::new(tag))
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> CallbackRegistry<C> {
        CallbackRegistry {
            schemas: self.schemas,
            tags_by_variant: self.tags_by_variant,
        }
    }
}

impl<C: 'static> Default for CallbackRegistryBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable mapping from tag to callback schema.
pub struct CallbackRegistry<C> {
    schemas: HashMap<String, Box<dyn CallbackSchema<C>>>,
    tags_by_variant: HashMap<TypeId, String>,
}

impl<C: 'static> CallbackRegistry<C> {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> CallbackRegistryBuilder<C> {
        CallbackRegistryBuilder::new()
    }

    /// The dispatching encoder/decoder over every registered variant.
    #[must_use]
    pub const fn codec(&self) -> CallbackCodec<'_, C> {
        CallbackCodec { registry: self }
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn callback_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Check whether `tag` is registered.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.schemas.contains_key(tag)
    }

    /// Tag of the schema handling `callback`, if its variant is registered.
    #[must_use]
    pub fn tag_of(&self, callback: &dyn Callback<C>) -> Option<&str> {
        self.tags_by_variant
            .get(&Any::type_id(callback.as_any()))
            .map(String::as_str)
    }

    /// Number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check whether no variant is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn schema(&self, tag: &str) -> Option<&dyn CallbackSchema<C>> {
        self.schemas.get(tag).map(Box::as_ref)
    }
}

impl<C: 'static> fmt::Debug for CallbackRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_types", &self.callback_types())
            .finish()
    }
}

/// Encodes any registered callback and decodes by reading the tag first.
pub struct CallbackCodec<'r, C> {
    registry: &'r CallbackRegistry<C>,
}

impl<C: 'static> CallbackCodec<'_, C> {
    /// Encode `callback` as a tagged object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredCallback`] if the variant has no schema,
    /// or [`Error::MalformedCallback`] if its fields cannot be encoded or
    /// collide with [`TYPE_FIELD`].
    pub fn encode(&self, callback: &dyn Callback<C>) -> Result<Value> {
        let tag = self
            .registry
            .tag_of(callback)
            .ok_or_else(|| Error::unregistered_callback(format!("{callback:?}")))?;
        let schema = self
            .registry
            .schema(tag)
            .ok_or_else(|| Error::unknown_callback_type(tag))?;

        let fields = schema.encode(callback)?;
        if fields.contains_key(TYPE_FIELD) {
            return Err(Error::malformed_callback(
                tag,
                format!("variant fields use the reserved '{TYPE_FIELD}' key"),
            ));
        }

        let mut tagged = Map::new();
        tagged.insert(TYPE_FIELD.to_string(), Value::String(tag.to_string()));
        tagged.extend(fields);
        Ok(Value::Object(tagged))
    }

    /// Decode a tagged object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCallbackType`] carrying the tag when no schema
    /// matches, [`Error::MissingField`]/[`Error::InvalidField`] when the tag
    /// is absent or not a string, and [`Error::MalformedCallback`] when the
    /// variant's fields are wrong. All are data errors the caller may skip.
    pub fn decode(&self, value: &Value) -> Result<Box<dyn Callback<C>>> {
        let Value::Object(fields) = value else {
            return Err(Error::invalid_field("Callback", "expected an object"));
        };

        let tag = match fields.get(TYPE_FIELD) {
            Some(Value::String(tag)) => tag,
            Some(_) => return Err(Error::invalid_field(TYPE_FIELD, "expected a string")),
            None => return Err(Error::missing_field(TYPE_FIELD)),
        };

        let schema = self
            .registry
            .schema(tag)
            .ok_or_else(|| Error::unknown_callback_type(tag.as_str()))?;

        let payload: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_FIELD)
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();
        schema.decode(payload)
    }
}
