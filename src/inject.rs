use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::component::{downcast, Component, Instance, Member};
use crate::error::{ContainerError, Result};
use crate::mapping::{
    create_mapping, FactoryConfig, Mapping, MappingConfig, Target, TypeConfig, ValueConfig,
    INJECTOR_KEY,
};
use crate::resolve::{Constructor, FactoryFn};

static NEXT_SCOPE: AtomicUsize = AtomicUsize::new(0);

/// Keys being resolved by one call to [Container::get].
///
/// Entries are tagged with the container which started resolving them: a key in flight in a
/// parent does not prevent a child from resolving its own mapping of the same key.
///
/// Each call owns its resolution, so concurrent calls do not see the keys in flight of each
/// other. Two threads entering a cycle of singletons from different keys block on each other's
/// initialization instead of reporting the cycle.
#[derive(Debug, Default)]
pub(crate) struct Resolution {
    stack: Vec<(usize, String)>,
}

impl Resolution {
    fn contains(&self, scope: usize, key: &str) -> bool {
        self.stack.iter().any(|(s, k)| *s == scope && k == key)
    }

    fn chain(&self, scope: usize) -> Vec<String> {
        self.stack
            .iter()
            .filter(|(s, _)| *s == scope)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

struct Scope {
    id: usize,
    parent: Option<Container>,
    mappings: RwLock<HashMap<String, Arc<Mapping>>>,
}

/// Hierarchical dependency injection container.
///
/// A container owns the mappings registered in its scope and delegates unknown keys to its
/// parent. Every container maps itself under the key ```injector```.
///
/// Cloning a container creates a new handle on the same scope.
#[derive(Clone)]
pub struct Container {
    scope: Arc<Scope>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create a root container
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    /// Create a container delegating to this one for the keys it does not map
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<Container>) -> Self {
        let mut mappings = HashMap::new();
        mappings.insert(INJECTOR_KEY.to_string(), Arc::new(Mapping::injector()));
        let id = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
        debug!(scope = id, child = parent.is_some(), "Creating container");
        Self {
            scope: Arc::new(Scope {
                id,
                parent,
                mappings: RwLock::new(mappings),
            }),
        }
    }

    pub fn parent(&self) -> Option<&Container> {
        self.scope.parent.as_ref()
    }

    /// Start mapping a key
    pub fn map<'a>(&'a self, key: &'a str) -> MappingBuilder<'a> {
        MappingBuilder {
            container: self,
            key,
        }
    }

    pub fn map_factory(&self, key: &str, config: FactoryConfig) -> Result<&Self> {
        self.register(key, config, Target::Factory)
    }

    pub fn map_type(&self, key: &str, config: TypeConfig) -> Result<&Self> {
        self.register(key, config, Target::Type)
    }

    pub fn map_value(&self, key: &str, config: ValueConfig) -> Result<&Self> {
        self.register(key, config, Target::Value)
    }

    fn register<T>(
        &self,
        key: &str,
        config: MappingConfig<T>,
        wrap: fn(T) -> Target,
    ) -> Result<&Self> {
        let mut mappings = self.scope.mappings.write();
        if mappings.contains_key(key) {
            return Err(ContainerError::MappingExists {
                key: key.to_string(),
            });
        }
        let mapping = create_mapping(key, config, wrap)?;
        debug!(
            scope = self.scope.id,
            key,
            kind = mapping.target.kind(),
            singleton = mapping.is_singleton,
            "Mapping key"
        );
        mappings.insert(key.to_string(), Arc::new(mapping));
        Ok(self)
    }

    /// Check if the key is mapped in this container or one of its ancestors
    pub fn has(&self, key: &str) -> bool {
        self.has_local(key) || self.scope.parent.as_ref().is_some_and(|p| p.has(key))
    }

    /// Check if the key is mapped in this container, ignoring its ancestors
    pub fn has_local(&self, key: &str) -> bool {
        self.scope.mappings.read().contains_key(key)
    }

    /// Local keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.scope.mappings.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove a local mapping and return its target.
    ///
    /// Fails if another local mapping depends on the key. Mappings of the ancestors are never
    /// affected: removing a local override exposes the mapping of the parent again.
    pub fn remove(&self, key: &str) -> Result<Option<Target>> {
        let mut mappings = self.scope.mappings.write();
        let mut dependants: Vec<String> = mappings
            .values()
            .filter(|m| m.key != key && m.dependencies().any(|d| d == key))
            .map(|m| m.key.clone())
            .collect();
        if !dependants.is_empty() {
            dependants.sort();
            return Err(ContainerError::MappingHasDependants {
                key: key.to_string(),
                dependants,
            });
        }
        let removed = mappings.remove(key).map(|m| m.target.clone());
        if removed.is_some() {
            debug!(scope = self.scope.id, key, "Removed mapping");
        }
        Ok(removed)
    }

    /// Resolve a key path.
    ///
    /// The first segment of the path is the mapped key, the following ones are properties read
    /// on the resolved instance: ```get("config.db.port")```.
    pub fn get(&self, path: &str) -> Result<Instance> {
        self.resolve_path(path, &mut Resolution::default())
    }

    /// Resolve a key path and downcast the result to its concrete type
    pub fn get_as<T: Component>(&self, path: &str) -> Result<Arc<T>> {
        let instance = self.get(path)?;
        downcast::<T>(&instance).ok_or_else(|| ContainerError::TypeMismatch {
            key: path.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Call a factory with the given dependencies, without registering it
    pub fn resolve_factory(&self, target: FactoryFn, using: &[&str]) -> Result<Instance> {
        let config = MappingConfig::new(target).using(using.iter().copied());
        Mapping::anonymous(config, Target::Factory)?.resolve(self, &mut Resolution::default())
    }

    /// Construct an instance with the given dependencies, without registering it
    pub fn resolve_type(&self, target: Constructor, using: &[&str]) -> Result<Instance> {
        let config = MappingConfig::new(target).using(using.iter().copied());
        Mapping::anonymous(config, Target::Type)?.resolve(self, &mut Resolution::default())
    }

    /// Inject the marked properties of a value, without registering it
    pub fn resolve_value(&self, target: Instance) -> Result<Instance> {
        Mapping::anonymous(MappingConfig::new(target), Target::Value)?
            .resolve(self, &mut Resolution::default())
    }

    pub(crate) fn resolve_path(
        &self,
        path: &str,
        resolution: &mut Resolution,
    ) -> Result<Instance> {
        let mut segments = path.split('.');
        let key = segments.next().unwrap_or_default();
        if path.split('.').any(str::is_empty) {
            return Err(ContainerError::InvalidKeyType {
                path: path.to_string(),
            });
        }
        if !self.has(key) {
            return Err(ContainerError::NoMapping {
                key: key.to_string(),
            });
        }

        let mut instance = self.resolve_key(key, resolution)?;
        let mut consumed = key.len();
        for property in segments {
            if let Some(container) = downcast::<Container>(&instance) {
                // stay in the same resolution to keep tracking the keys in flight
                return container.resolve_path(&path[consumed + 1..], resolution);
            }
            consumed += property.len() + 1;
            instance = instance
                .property(property)
                .ok_or_else(|| ContainerError::NoMapping {
                    key: path[..consumed].to_string(),
                })?;
        }
        Ok(instance)
    }

    pub(crate) fn resolve_all(
        &self,
        paths: &[String],
        resolution: &mut Resolution,
    ) -> Result<Vec<Instance>> {
        paths
            .iter()
            .map(|path| self.resolve_path(path, resolution))
            .collect()
    }

    fn resolve_key(&self, key: &str, resolution: &mut Resolution) -> Result<Instance> {
        let scope = self.scope.id;
        if resolution.contains(scope, key) {
            let mut chain = resolution.chain(scope);
            chain.push(key.to_string());
            debug!(scope, key, chain = ?chain, "Circular dependency");
            return Err(ContainerError::CircularDependency {
                key: key.to_string(),
                chain,
            });
        }

        resolution.stack.push((scope, key.to_string()));
        let result = self.delegate(key, resolution);
        resolution.stack.pop();
        result
    }

    /// Run the local mapping, or let an ancestor resolve the key
    fn delegate(&self, key: &str, resolution: &mut Resolution) -> Result<Instance> {
        // release the registry lock before resolving dependencies
        let local = self.scope.mappings.read().get(key).cloned();
        let parent = self.scope.parent.as_ref();
        match (local, parent) {
            (Some(mapping), Some(parent)) if mapping.defer && parent.has(key) => {
                trace!(scope = self.scope.id, key, "Deferring to parent");
                parent.resolve_key(key, resolution)
            }
            (Some(mapping), _) => {
                trace!(scope = self.scope.id, key, "Resolving");
                mapping.resolve(self, resolution)
            }
            (None, Some(parent)) => parent.resolve_key(key, resolution),
            (None, None) => Err(ContainerError::NoMapping {
                key: key.to_string(),
            }),
        }
    }
}

/// The container is itself a component whose members are the keys it can resolve.
///
/// Key paths through a container continue in the resolution of the caller, so properties are
/// never read here: only the presence of the key is reported.
impl Component for Container {
    fn member(&self, name: &str) -> Option<Member> {
        self.has(name).then_some(Member::Property)
    }
}

/// Fluent registration of one key
pub struct MappingBuilder<'a> {
    container: &'a Container,
    key: &'a str,
}

impl<'a> MappingBuilder<'a> {
    pub fn to_factory(self, config: FactoryConfig) -> Result<&'a Container> {
        self.container.map_factory(self.key, config)
    }

    pub fn to_type(self, config: TypeConfig) -> Result<&'a Container> {
        self.container.map_type(self.key, config)
    }

    pub fn to_value(self, config: ValueConfig) -> Result<&'a Container> {
        self.container.map_value(self.key, config)
    }
}
