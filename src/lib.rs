//! Hierarchical dependency injection container with string keys, singleton caching and
//! structural interface checks.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use keyed_injector::*;
//! struct Greeter {
//!     name: Arc<String>,
//! }
//!
//! impl Greeter {
//!     fn new(name: Arc<String>) -> Self {
//!         Self { name }
//!     }
//! }
//!
//! impl Component for Greeter {}
//!
//! # fn main() -> Result<(), ContainerError> {
//! let container = Container::new();
//! container
//!     .map("name")
//!     .to_value(ValueConfig::new(instance("world".to_string())))?
//!     .map("greeter")
//!     .to_type(TypeConfig::new(Constructor::new(Greeter::new)).using(["name"]).singleton())?;
//!
//! let greeter: Arc<Greeter> = container.get_as("greeter")?;
//! assert_eq!(greeter.name.as_str(), "world");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! A [Container] holds [Mapping]s indexed by key. Each mapping describes how to produce the value
//! of its key and which other keys it depends on.
//!
//! * A value mapping returns an existing [Instance], always shared.
//! * A factory mapping calls a [FactoryFn] with the instances of its dependencies.
//!   The factory may decline to produce a value, which is reported as an error.
//! * A type mapping calls a [Constructor] with the instances of its dependencies.
//!
//! Factories and constructors can be built from plain functions taking each dependency as an
//! ```Arc``` of its concrete type, in the order of declaration: the instances are downcast before
//! the call. Factories and types are cached only if the mapping is a singleton.
//!
//! Containers form a hierarchy: keys which are not mapped locally are resolved by the parent,
//! and a deferred mapping gives priority to the mapping of an ancestor for the same key.
//!
//! Resolved instances are inspected through the [Component] trait:
//!
//! * key paths such as ```"config.port"``` read properties of the instance of ```config```,
//! * the [ApiMember] list of a mapping is checked against the members of the first instance,
//! * values receive injected properties, either declared with the mapping or marked with a
//!   token on an [Object].
//!
//! Circular dependencies are detected for each call to [Container::get] and reported as
//! [ContainerError::CircularDependency].

mod component;
mod error;
mod helpers;
mod inject;
mod interface;
mod mapping;
mod resolve;

pub use component::{downcast, instance, Component, Instance, IntoAny, Member, Method, Object};
pub use error::{ContainerError, ErrorKind, Result};
pub use helpers::Callable;
pub use inject::{Container, MappingBuilder};
pub use interface::{validate_interface, ApiMember};
pub use mapping::{
    create_mapping, FactoryConfig, Mapping, MappingConfig, MappingOptions, PropertyInjection,
    Target, TypeConfig, ValueConfig, INJECTOR_KEY,
};
pub use resolve::{Constructor, FactoryFn};
