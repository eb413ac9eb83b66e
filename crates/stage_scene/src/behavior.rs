//! Behavior components and their serialization registry.
//!
//! Behaviors are type-erased components attached to scene nodes. Optional
//! capabilities (assembly hooks, assemble-on-save) are exposed through
//! default trait methods so a behavior opts in explicitly instead of being
//! discovered by reflection.

use std::any::Any;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SceneError};
use crate::hooks::AssemblyHooks;

/// A component attached to a scene node.
pub trait Behavior: 'static {
    /// Stable name used in persisted documents.
    fn type_name(&self) -> &'static str;

    /// Clone into a fresh box. Backs subtree duplication.
    fn clone_box(&self) -> Box<dyn Behavior>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Assembly lifecycle capability. Behaviors that take part in template
    /// assembly return themselves here; everything else keeps the default.
    fn assembly(&mut self) -> Option<&mut dyn AssemblyHooks> {
        None
    }

    /// Whether saving a scene containing this behavior should trigger an
    /// assembly pass.
    fn assemble_on_save(&self) -> bool {
        false
    }
}

type SerializeFn = Box<dyn Fn(&dyn Behavior) -> Result<serde_json::Value>>;
type DeserializeFn = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Behavior>>>;

struct RegistryEntry {
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

/// Registry mapping behavior type names to their document (de)serializers.
///
/// Scene and template documents store behaviors as `(type name, payload)`
/// pairs; the registry turns those payloads back into live boxed behaviors.
#[derive(Default)]
pub struct BehaviorRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a behavior type.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Behavior + Default + Serialize + DeserializeOwned,
    {
        let name = T::default().type_name();
        self.entries.insert(
            name,
            RegistryEntry {
                serialize: Box::new(move |behavior| {
                    let concrete = behavior
                        .as_any()
                        .downcast_ref::<T>()
                        .ok_or_else(|| SceneError::BehaviorTypeMismatch(name.to_string()))?;
                    Ok(serde_json::to_value(concrete)?)
                }),
                deserialize: Box::new(move |value| {
                    let concrete: T = serde_json::from_value(value.clone())?;
                    Ok(Box::new(concrete))
                }),
            },
        );
        self
    }

    /// Whether a type name is known.
    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Serialize a behavior into a document payload.
    pub fn to_value(&self, behavior: &dyn Behavior) -> Result<serde_json::Value> {
        let entry = self
            .entries
            .get(behavior.type_name())
            .ok_or_else(|| SceneError::UnknownBehavior(behavior.type_name().to_string()))?;
        (entry.serialize)(behavior)
    }

    /// Deserialize a document payload into a live behavior.
    pub fn from_value(&self, name: &str, value: &serde_json::Value) -> Result<Box<dyn Behavior>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| SceneError::UnknownBehavior(name.to_string()))?;
        (entry.deserialize)(value)
    }
}
