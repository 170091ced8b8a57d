use crate::{BoxedService, Service, ServiceBuilder};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};

/// An erased configuration value. Values are cloned out of the store on
/// every lookup, since one key can resolve several members in the same
/// graph.
trait ConfigValue {
    fn clone_value(&self) -> BoxedService;
}

impl<V: Service + Clone> ConfigValue for V {
    fn clone_value(&self) -> BoxedService {
        Box::new(self.clone())
    }
}

/// The key/value store consulted by *Resolve*-marked members. Keys are
/// strings, values are opaquely typed; the store is ordered by key, created
/// at the root build call, and shared unmodified across the whole graph.
///
/// ```
/// use needle_di::ConfigMap;
///
/// let mut configuration = ConfigMap::new();
/// configuration.put("prenom", "Fabien".to_string());
/// assert!(configuration.contains_key("prenom"));
/// ```
#[derive(Default)]
pub struct ConfigMap {
    properties: BTreeMap<String, Box<dyn ConfigValue>>,
}

impl ConfigMap {
    #[must_use]
    pub fn new() -> Self {
        ConfigMap::default()
    }

    /// Puts a property in the configuration, replacing any earlier value
    /// under the same key.
    pub fn put<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Service + Clone,
    {
        self.properties.insert(key.into(), Box::new(value));
    }

    /// Clones the value stored under `key`, if present.
    pub(crate) fn get(&self, key: &str) -> Option<BoxedService> {
        // Dispatch on the trait object itself; calling through the `&Box`
        // would resolve the blanket impl against the reference type.
        self.properties
            .get(key)
            .map(|value| value.as_ref().clone_value())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Debug for ConfigMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.properties.keys()).finish()
    }
}

impl<K, V> Extend<(K, V)> for ConfigMap
where
    K: Into<String>,
    V: Service + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V> std::iter::FromIterator<(K, V)> for ConfigMap
where
    K: Into<String>,
    V: Service + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ConfigMap::new();
        map.extend(iter);
        map
    }
}

/// Fills a [`ServiceBuilder`]'s configuration in a chained way. Obtained
/// from [`ServiceBuilder::configure`]; [`put`](Configurator::put) adds or
/// replaces properties and [`done`](Configurator::done) hands the builder
/// back.
#[must_use]
pub struct Configurator<'a, T: Service> {
    builder: ServiceBuilder<'a, T>,
}

impl<'a, T: Service> Configurator<'a, T> {
    pub(crate) fn new(builder: ServiceBuilder<'a, T>) -> Self {
        Configurator { builder }
    }

    /// Puts a property in the configuration.
    pub fn put<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Service + Clone,
    {
        self.builder.configuration_mut().put(key, value);
        self
    }

    /// Returns the builder under configuration.
    pub fn done(self) -> ServiceBuilder<'a, T> {
        self.builder
    }
}
