use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable identity of a host-owned object. Calls store these instead of
/// references, so a target may disappear (or come back under the same id
/// after a reload) without invalidating the configuration that points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object::{}", self.0)
    }
}

/// Implemented by concrete types that can be the target of a persistent
/// call. The name keys method registration and must be unique per type.
pub trait HostType: Any {
    const TYPE_NAME: &'static str;
}

/// Object-safe view of a stored target.
pub trait HostObject: Any {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: HostType> HostObject for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Ownership lives here, never in the calls: lookups hand out borrows keyed
/// by [`ObjectId`], and a removed entry simply stops resolving.
#[derive(Default)]
pub struct ObjectHost {
    objects: HashMap<ObjectId, Box<dyn HostObject>>,
}

impl ObjectHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: impl HostObject) -> ObjectId {
        let id = ObjectId::new();
        self.objects.insert(id, Box::new(object));
        id
    }

    /// Registers an object under a known id, e.g. when reloading a saved
    /// scene whose calls already point at it. Replaces any previous entry.
    pub fn insert_with_id(&mut self, id: ObjectId, object: impl HostObject) {
        self.objects.insert(id, Box::new(object));
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Box<dyn HostObject>> {
        self.objects.remove(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&dyn HostObject> {
        self.objects.get(&id).map(|object| &**object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut dyn HostObject> {
        self.objects.get_mut(&id).map(|object| &mut **object)
    }

    pub fn get_as<T: HostType>(&self, id: ObjectId) -> Option<&T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn type_name_of(&self, id: ObjectId) -> Option<&'static str> {
        self.get(id).map(HostObject::type_name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
