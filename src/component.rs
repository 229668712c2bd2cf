//! Runtime representation of resolved values
//!
//! Every value produced by the container is an [Instance], a shared trait object implementing
//! [Component]. The trait provides the small amount of reflection the container relies on:
//!
//! * [Component::property] backs dotted key paths (`"config.port"`),
//! * [Component::member] backs structural interface validation,
//! * [Component::inject_property] and [Component::injection_tokens] back property injection.
//!
//! Plain scalars implement [Component] without any member. [Object] is a dynamic property bag
//! with inherited slots for everything else.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, type-erased value produced by the container
pub type Instance = Arc<dyn Component>;

/// Conversion of a shared component into [Any], used for downcasting.
///
/// Implemented for all sized types, it only exists to expose the conversion through the
/// [Component] vtable.
pub trait IntoAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Member exposed by a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Property,
    Method { arity: usize },
}

/// A value that can be produced and inspected by the container
pub trait Component: IntoAny {
    /// Read a named property, used to follow dotted key paths.
    fn property(&self, _name: &str) -> Option<Instance> {
        None
    }

    /// Describe a named member, used by interface validation.
    ///
    /// Defaults to a plain property when [Component::property] finds one.
    fn member(&self, name: &str) -> Option<Member> {
        self.property(name).map(|_| Member::Property)
    }

    /// Receive an injected property.
    ///
    /// Returns false if the component does not accept injection for this name.
    fn inject_property(&self, _name: &str, _value: Instance) -> bool {
        false
    }

    /// Names of the properties which carry the injection token.
    fn injection_tokens(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Wrap a component into a shared [Instance]
pub fn instance<T: Component>(value: T) -> Instance {
    Arc::new(value)
}

/// Recover the concrete type of an instance
pub fn downcast<T: Component>(instance: &Instance) -> Option<Arc<T>> {
    <dyn Component as IntoAny>::into_any(Arc::clone(instance))
        .downcast::<T>()
        .ok()
}

macro_rules! scalar_component ({ $($scalar:ty),* } => {
    $( impl Component for $scalar {} )*
});

scalar_component! {
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
    &'static str
}

type MethodBody = dyn Fn(&[Instance]) -> Option<Instance> + Send + Sync;

/// Callable member of an [Object] with a declared parameter count
#[derive(Clone)]
pub struct Method {
    arity: usize,
    body: Arc<MethodBody>,
}

impl Method {
    pub fn arity(&self) -> usize {
        self.arity
    }
}

#[derive(Clone)]
enum Slot {
    Value(Instance),
    Method(Method),
    Token,
}

/// Dynamic component made of named slots.
///
/// Slots hold values, methods or the injection token. An object may extend a prototype: slots
/// missing on the object are looked up along the prototype chain, while writes always land on
/// the object itself.
#[derive(Default)]
pub struct Object {
    slots: RwLock<BTreeMap<String, Slot>>,
    prototype: Option<Arc<Object>>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object inheriting the slots of the prototype
    pub fn extending(prototype: Arc<Object>) -> Self {
        Self {
            slots: RwLock::default(),
            prototype: Some(prototype),
        }
    }

    pub fn with(self, name: &str, value: Instance) -> Self {
        self.insert(name, Slot::Value(value));
        self
    }

    pub fn with_method<F>(self, name: &str, arity: usize, body: F) -> Self
    where
        F: Fn(&[Instance]) -> Option<Instance> + Send + Sync + 'static,
    {
        let method = Method {
            arity,
            body: Arc::new(body),
        };
        self.insert(name, Slot::Method(method));
        self
    }

    /// Mark a property for injection: it will receive the instance mapped under the same name.
    pub fn with_token(self, name: &str) -> Self {
        self.insert(name, Slot::Token);
        self
    }

    /// Set an own property, shadowing any inherited slot
    pub fn set(&self, name: &str, value: Instance) {
        self.insert(name, Slot::Value(value));
    }

    pub fn get(&self, name: &str) -> Option<Instance> {
        match self.slot(name)? {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn method(&self, name: &str) -> Option<Method> {
        match self.slot(name)? {
            Slot::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Invoke a method.
    ///
    /// Returns None if the method is missing, if the number of arguments does not match its arity,
    /// or if the method itself returned nothing.
    pub fn call(&self, name: &str, args: &[Instance]) -> Option<Instance> {
        let method = self.method(name)?;
        if method.arity != args.len() {
            return None;
        }
        (method.body)(args)
    }

    /// Names of the slots defined on this object, excluding inherited ones
    pub fn own_keys(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    pub fn prototype(&self) -> Option<&Arc<Object>> {
        self.prototype.as_ref()
    }

    fn insert(&self, name: &str, slot: Slot) {
        self.slots.write().insert(name.to_string(), slot);
    }

    /// Nearest slot along the prototype chain
    fn slot(&self, name: &str) -> Option<Slot> {
        if let Some(slot) = self.slots.read().get(name) {
            return Some(slot.clone());
        }
        self.prototype.as_ref().and_then(|p| p.slot(name))
    }

    fn collect_keys(&self, keys: &mut Vec<String>) {
        keys.extend(self.slots.read().keys().cloned());
        if let Some(p) = &self.prototype {
            p.collect_keys(keys);
        }
    }
}

impl Component for Object {
    fn property(&self, name: &str) -> Option<Instance> {
        self.get(name)
    }

    fn member(&self, name: &str) -> Option<Member> {
        match self.slot(name)? {
            Slot::Method(m) => Some(Member::Method { arity: m.arity }),
            Slot::Value(_) | Slot::Token => Some(Member::Property),
        }
    }

    fn inject_property(&self, name: &str, value: Instance) -> bool {
        self.set(name, value);
        true
    }

    fn injection_tokens(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys.sort();
        keys.dedup();
        keys.retain(|k| matches!(self.slot(k), Some(Slot::Token)));
        keys
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("keys", &self.own_keys())
            .field("prototype", &self.prototype)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_the_concrete_type() {
        let v = instance(42_i32);
        assert_eq!(*downcast::<i32>(&v).unwrap(), 42);
        assert!(downcast::<String>(&v).is_none());
    }

    #[test]
    fn inherited_slots_are_shadowed_by_own_writes() {
        let proto = Arc::new(
            Object::new()
                .with("name", instance("proto"))
                .with_token("Logger")
                .with_method("greet", 1, |args| Some(Arc::clone(&args[0]))),
        );
        let child = Object::extending(Arc::clone(&proto));

        assert_eq!(child.member("greet"), Some(Member::Method { arity: 1 }));
        assert_eq!(child.injection_tokens(), vec!["Logger".to_string()]);
        assert!(child.get("name").is_some());
        assert!(!child.has_own("name"));

        assert!(child.inject_property("Logger", instance(1_u8)));
        assert!(child.has_own("Logger"));
        assert!(child.injection_tokens().is_empty());
        // the prototype still carries the token
        assert_eq!(proto.injection_tokens(), vec!["Logger".to_string()]);
    }

    #[test]
    fn call_checks_arity() {
        let o = Object::new().with_method("echo", 1, |args| Some(Arc::clone(&args[0])));
        let arg = instance(7_u32);
        let out = o.call("echo", &[arg]).unwrap();
        assert_eq!(*downcast::<u32>(&out).unwrap(), 7);
        assert!(o.call("echo", &[]).is_none());
        assert!(o.call("missing", &[]).is_none());
    }
}
