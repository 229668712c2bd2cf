//! Mapping model: how to produce the value registered under one key.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::component::Instance;
use crate::error::{ContainerError, Result};
use crate::interface::ApiMember;
use crate::resolve::{Constructor, FactoryFn};

/// Key under which every container maps itself
pub const INJECTOR_KEY: &str = "injector";

/// Key reported for one-shot resolutions, which are never registered
pub(crate) const ANONYMOUS_KEY: &str = "<anonymous>";

/// What a mapping produces its instances from
#[derive(Clone)]
pub enum Target {
    /// An existing value, always shared
    Value(Instance),
    /// A function called with the resolved dependencies, which may return nothing
    Factory(FactoryFn),
    /// A constructor called with the resolved dependencies
    Type(Constructor),
    /// The container owning the mapping
    Injector,
}

impl Target {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Value(_) => "value",
            Target::Factory(_) => "factory",
            Target::Type(_) => "type",
            Target::Injector => "injector",
        }
    }

    /// Declared parameter count of a typed factory or constructor
    fn arity(&self) -> Option<usize> {
        match self {
            Target::Factory(f) => f.arity(),
            Target::Type(c) => c.arity(),
            Target::Value(_) | Target::Injector => None,
        }
    }
}

/// Property of a value which receives the instance resolved from a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInjection {
    pub property: String,
    pub key: String,
}

/// Optional mapping settings.
///
/// Every field is optional: when merging options, present fields override and absent ones are
/// ignored. Options can be deserialized, for instance from a JSON or TOML document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub using: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_singleton: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<Vec<ApiMember>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inject: Option<Vec<PropertyInjection>>,
}

impl MappingOptions {
    /// Override the fields of self with the fields present in other
    pub fn merge(&mut self, other: MappingOptions) {
        if other.using.is_some() {
            self.using = other.using;
        }
        if other.is_singleton.is_some() {
            self.is_singleton = other.is_singleton;
        }
        if other.defer.is_some() {
            self.defer = other.defer;
        }
        if other.api.is_some() {
            self.api = other.api;
        }
        if other.inject.is_some() {
            self.inject = other.inject;
        }
    }
}

/// Configuration of a mapping: a target and its options
pub struct MappingConfig<T> {
    pub target: Option<T>,
    pub options: MappingOptions,
}

pub type FactoryConfig = MappingConfig<FactoryFn>;
pub type TypeConfig = MappingConfig<Constructor>;
pub type ValueConfig = MappingConfig<Instance>;

impl<T> Default for MappingConfig<T> {
    fn default() -> Self {
        Self {
            target: None,
            options: MappingOptions::default(),
        }
    }
}

impl<T> MappingConfig<T> {
    pub fn new(target: T) -> Self {
        Self {
            target: Some(target),
            options: MappingOptions::default(),
        }
    }

    /// Keys of the dependencies passed, in order, to the factory or constructor
    pub fn using<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.using = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn singleton(mut self) -> Self {
        self.options.is_singleton = Some(true);
        self
    }

    /// Prefer the mapping of an ancestor container for the same key, if there is one
    pub fn deferred(mut self) -> Self {
        self.options.defer = Some(true);
        self
    }

    pub fn api(mut self, api: Vec<ApiMember>) -> Self {
        self.options.api = Some(api);
        self
    }

    /// Inject the instance resolved from `key` into `property` (values only)
    pub fn inject(mut self, property: &str, key: &str) -> Self {
        self.options
            .inject
            .get_or_insert_with(Vec::new)
            .push(PropertyInjection {
                property: property.to_string(),
                key: key.to_string(),
            });
        self
    }

    pub fn with_options(mut self, options: MappingOptions) -> Self {
        self.options.merge(options);
        self
    }
}

/// A registered rule producing the instance of one key
pub struct Mapping {
    pub(crate) key: String,
    pub(crate) target: Target,
    pub(crate) using: Vec<String>,
    pub(crate) is_singleton: bool,
    pub(crate) defer: bool,
    pub(crate) api: Vec<ApiMember>,
    pub(crate) inject: Vec<PropertyInjection>,
    /// Cached instance, set on first resolution of singletons
    pub(crate) instance: OnceCell<Instance>,
    /// Set once interface validation succeeded
    pub(crate) checked: OnceCell<()>,
    /// Set once the properties of a value were injected
    pub(crate) injected: OnceCell<()>,
}

impl Mapping {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn using(&self) -> &[String] {
        &self.using
    }

    pub fn is_singleton(&self) -> bool {
        self.is_singleton
    }

    pub fn defer(&self) -> bool {
        self.defer
    }

    pub fn api(&self) -> &[ApiMember] {
        &self.api
    }

    pub fn injections(&self) -> &[PropertyInjection] {
        &self.inject
    }

    pub fn is_resolved(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Keys this mapping needs from its container
    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.using
            .iter()
            .chain(self.inject.iter().map(|i| &i.key))
            .map(|path| path.split('.').next().unwrap_or_default())
    }

    pub(crate) fn injector() -> Self {
        Self {
            key: INJECTOR_KEY.to_string(),
            target: Target::Injector,
            using: Vec::new(),
            is_singleton: false,
            defer: false,
            api: Vec::new(),
            inject: Vec::new(),
            instance: OnceCell::new(),
            checked: OnceCell::new(),
            injected: OnceCell::new(),
        }
    }

    /// Build a mapping which is not meant to be registered
    pub(crate) fn anonymous<T>(config: MappingConfig<T>, wrap: fn(T) -> Target) -> Result<Self> {
        merge_config(ANONYMOUS_KEY, config, wrap).into_mapping()
    }
}

/// Create a mapping by merging the configuration over the default options.
///
/// The mapping is validated before being returned.
pub fn create_mapping<T>(
    key: &str,
    config: MappingConfig<T>,
    wrap: fn(T) -> Target,
) -> Result<Mapping> {
    validate_key(key)?;
    merge_config(key, config, wrap).into_mapping()
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('.') {
        return Err(ContainerError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Intermediate state: the target may still be missing
struct Merged {
    key: String,
    target: Option<Target>,
    options: MappingOptions,
}

fn merge_config<T>(key: &str, config: MappingConfig<T>, wrap: fn(T) -> Target) -> Merged {
    let mut options = MappingOptions {
        using: Some(Vec::new()),
        is_singleton: Some(false),
        defer: Some(false),
        api: Some(Vec::new()),
        inject: Some(Vec::new()),
    };
    options.merge(config.options);
    Merged {
        key: key.to_string(),
        target: config.target.map(wrap),
        options,
    }
}

impl Merged {
    fn into_mapping(self) -> Result<Mapping> {
        validate_mapping(&self)?;
        let Merged {
            key,
            target,
            options,
        } = self;
        let target = target.ok_or_else(|| ContainerError::MissingTarget { key: key.clone() })?;
        // values are always shared
        let is_singleton =
            matches!(target, Target::Value(_)) || options.is_singleton.unwrap_or(false);
        Ok(Mapping {
            key,
            target,
            using: options.using.unwrap_or_default(),
            is_singleton,
            defer: options.defer.unwrap_or(false),
            api: options.api.unwrap_or_default(),
            inject: options.inject.unwrap_or_default(),
            instance: OnceCell::new(),
            checked: OnceCell::new(),
            injected: OnceCell::new(),
        })
    }
}

/// Check the consistency of a merged configuration
fn validate_mapping(merged: &Merged) -> Result<()> {
    let key = &merged.key;
    let invalid_config = |reason: &str| ContainerError::InvalidConfig {
        key: key.clone(),
        reason: reason.to_string(),
    };
    let options = &merged.options;
    let using = options.using.as_deref().unwrap_or_default();
    let api = options.api.as_deref().unwrap_or_default();
    let inject = options.inject.as_deref().unwrap_or_default();

    if using.iter().any(|k| k.is_empty()) {
        return Err(invalid_config("dependency keys must not be empty"));
    }
    if api.iter().any(|m| m.name.is_empty()) {
        return Err(invalid_config("interface members must be named"));
    }
    if inject
        .iter()
        .any(|i| i.property.is_empty() || i.key.is_empty())
    {
        return Err(invalid_config("injected properties need a name and a key"));
    }

    let target = merged
        .target
        .as_ref()
        .ok_or_else(|| ContainerError::MissingTarget { key: key.clone() })?;

    if !inject.is_empty() && !matches!(target, Target::Value(_)) {
        return Err(invalid_config("only values support property injection"));
    }
    if let Some(arity) = target.arity() {
        if arity != using.len() {
            return Err(ContainerError::InvalidTarget {
                key: key.clone(),
                reason: format!(
                    "{} takes {} parameter(s) but {} dependencies are declared",
                    target.kind(),
                    arity,
                    using.len()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::instance;
    use crate::error::ErrorKind;

    #[test]
    fn absent_options_do_not_override() {
        let mut options = MappingOptions {
            using: Some(vec!["a".into()]),
            defer: Some(true),
            ..MappingOptions::default()
        };
        options.merge(MappingOptions {
            is_singleton: Some(true),
            defer: Some(false),
            ..MappingOptions::default()
        });
        assert_eq!(options.using, Some(vec!["a".to_string()]));
        assert_eq!(options.is_singleton, Some(true));
        assert_eq!(options.defer, Some(false));
    }

    #[test]
    fn defaults_are_applied() {
        let config = ValueConfig::new(instance(1_i32));
        let mapping = create_mapping("v", config, Target::Value).unwrap();
        assert!(mapping.is_singleton());
        assert!(!mapping.defer());
        assert!(mapping.using().is_empty());
        assert!(mapping.api().is_empty());
        assert!(!mapping.is_resolved());

        let config = MappingConfig::new(FactoryFn::variadic(|_| None)).using(["a", "b.c"]);
        let mapping = create_mapping("f", config, Target::Factory).unwrap();
        assert!(!mapping.is_singleton());
        assert_eq!(mapping.dependencies().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn values_ignore_the_singleton_flag() {
        let config = ValueConfig::new(instance(1_i32)).with_options(MappingOptions {
            is_singleton: Some(false),
            ..MappingOptions::default()
        });
        let mapping = create_mapping("v", config, Target::Value).unwrap();
        assert!(mapping.is_singleton());
    }

    #[test]
    fn the_key_is_checked_first() {
        let err = create_mapping("", ValueConfig::default(), Target::Value)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }
}
