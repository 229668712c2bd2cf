//! Resolution strategies turning a [Mapping] into an instance.
//!
//! Each kind of [Target] is bound to a strategy implementing [Resolve]:
//!
//! * values are returned unchanged, after property injection and interface validation,
//! * factories are called with the resolved dependencies and must return a value,
//! * types are constructed from the resolved dependencies.
//!
//! Factories and types are cached only for singleton mappings. Interface validation is repeated
//! until it succeeds once for the mapping, property injection is done once per value.

use std::sync::Arc;

use tracing::trace;

use crate::component::{Component, Instance};
use crate::error::{ContainerError, Result};
use crate::helpers::Callable;
use crate::inject::{Container, Resolution};
use crate::interface::validate_interface;
use crate::mapping::{Mapping, Target};

type FactoryBody = dyn Fn(&str, &[Instance]) -> Result<Option<Instance>> + Send + Sync;
type ConstructorBody = dyn Fn(&str, &[Instance]) -> Result<Instance> + Send + Sync;

/// Function producing a value from the resolved dependencies.
///
/// Returning None is an error: a factory mapping requires a value.
#[derive(Clone)]
pub struct FactoryFn {
    arity: Option<usize>,
    body: Arc<FactoryBody>,
}

impl FactoryFn {
    /// Wrap a function taking each dependency as an ```Arc``` of its concrete type
    pub fn new<F, Args>(f: F) -> Self
    where
        F: Callable<Args, Option<Instance>>,
        Args: 'static,
    {
        Self {
            arity: Some(F::ARITY),
            body: Arc::new(move |key: &str, args: &[Instance]| f.call_with(key, args)),
        }
    }

    /// Wrap a function receiving the list of dependencies, whatever their number
    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[Instance]) -> Option<Instance> + Send + Sync + 'static,
    {
        Self {
            arity: None,
            body: Arc::new(move |_: &str, args: &[Instance]| Ok(f(args))),
        }
    }

    /// Number of parameters, if known
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }
}

/// Constructor building an instance from the resolved dependencies
#[derive(Clone)]
pub struct Constructor {
    arity: Option<usize>,
    body: Arc<ConstructorBody>,
}

impl Constructor {
    /// Wrap a constructor taking each dependency as an ```Arc``` of its concrete type
    pub fn new<F, Args, T>(f: F) -> Self
    where
        F: Callable<Args, T>,
        Args: 'static,
        T: Component,
    {
        Self {
            arity: Some(F::ARITY),
            body: Arc::new(move |key: &str, args: &[Instance]| {
                let instance: Instance = Arc::new(f.call_with(key, args)?);
                Ok(instance)
            }),
        }
    }

    /// Wrap a constructor receiving the list of dependencies, whatever their number
    pub fn variadic<F, T>(f: F) -> Self
    where
        F: Fn(&[Instance]) -> T + Send + Sync + 'static,
        T: Component,
    {
        Self {
            arity: None,
            body: Arc::new(move |_: &str, args: &[Instance]| {
                let instance: Instance = Arc::new(f(args));
                Ok(instance)
            }),
        }
    }

    /// Number of parameters, if known
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }
}

/// Strategy producing the instance of a mapping
pub(crate) trait Resolve {
    fn produce(
        &self,
        mapping: &Mapping,
        injector: &Container,
        resolution: &mut Resolution,
    ) -> Result<Instance>;
}

/// Strategy of the self mapping
struct InjectorResolver;

impl Mapping {
    pub(crate) fn resolve(
        &self,
        injector: &Container,
        resolution: &mut Resolution,
    ) -> Result<Instance> {
        let resolver: &dyn Resolve = match &self.target {
            Target::Value(v) => v,
            Target::Factory(f) => f,
            Target::Type(c) => c,
            Target::Injector => &InjectorResolver,
        };
        resolver.produce(self, injector, resolution)
    }
}

impl Resolve for Instance {
    fn produce(
        &self,
        mapping: &Mapping,
        injector: &Container,
        resolution: &mut Resolution,
    ) -> Result<Instance> {
        mapping
            .instance
            .get_or_try_init(|| {
                trace!(key = %mapping.key, "Preparing value");
                // a value failing validation keeps its injected properties
                mapping
                    .injected
                    .get_or_try_init(|| inject_properties(mapping, self, injector, resolution))?;
                validate_interface(&mapping.key, &**self, &mapping.api)?;
                Ok(Arc::clone(self))
            })
            .cloned()
    }
}

impl Resolve for FactoryFn {
    fn produce(
        &self,
        mapping: &Mapping,
        injector: &Container,
        resolution: &mut Resolution,
    ) -> Result<Instance> {
        let build = |resolution: &mut Resolution| -> Result<Instance> {
            let args = injector.resolve_all(&mapping.using, resolution)?;
            trace!(key = %mapping.key, "Calling factory");
            let instance = (self.body)(&mapping.key, &args)?.ok_or_else(|| {
                ContainerError::InvalidFactoryResult {
                    key: mapping.key.clone(),
                }
            })?;
            mapping
                .checked
                .get_or_try_init(|| validate_interface(&mapping.key, &*instance, &mapping.api))?;
            Ok(instance)
        };
        if mapping.is_singleton {
            mapping
                .instance
                .get_or_try_init(|| build(resolution))
                .cloned()
        } else {
            build(resolution)
        }
    }
}

impl Resolve for Constructor {
    fn produce(
        &self,
        mapping: &Mapping,
        injector: &Container,
        resolution: &mut Resolution,
    ) -> Result<Instance> {
        let build = |resolution: &mut Resolution| -> Result<Instance> {
            let args = injector.resolve_all(&mapping.using, resolution)?;
            trace!(key = %mapping.key, "Constructing instance");
            let instance = (self.body)(&mapping.key, &args)?;
            mapping
                .checked
                .get_or_try_init(|| validate_interface(&mapping.key, &*instance, &mapping.api))?;
            Ok(instance)
        };
        if mapping.is_singleton {
            mapping
                .instance
                .get_or_try_init(|| build(resolution))
                .cloned()
        } else {
            build(resolution)
        }
    }
}

impl Resolve for InjectorResolver {
    fn produce(&self, _: &Mapping, injector: &Container, _: &mut Resolution) -> Result<Instance> {
        let instance: Instance = Arc::new(injector.clone());
        Ok(instance)
    }
}

/// Resolve the properties of a value marked for injection and assign them to the value itself.
///
/// Explicit injections of the mapping come first, followed by the properties carrying the
/// injection token, which are resolved from the key of the same name.
fn inject_properties(
    mapping: &Mapping,
    target: &Instance,
    injector: &Container,
    resolution: &mut Resolution,
) -> Result<()> {
    let mut points: Vec<(String, String)> = mapping
        .inject
        .iter()
        .map(|i| (i.property.clone(), i.key.clone()))
        .collect();
    for name in target.injection_tokens() {
        if !points.iter().any(|(property, _)| *property == name) {
            points.push((name.clone(), name));
        }
    }

    for (property, key) in points {
        let value = injector.resolve_path(&key, resolution)?;
        trace!(key = %mapping.key, property = %property, from = %key, "Injecting property");
        if !target.inject_property(&property, value) {
            return Err(ContainerError::PropertyRejected {
                key: mapping.key.clone(),
                property,
            });
        }
    }
    Ok(())
}
