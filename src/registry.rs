use crate::{
    Binding, BoxedService, Constructor, ConstructorSite, FieldSite,
    MethodSite, Service, ServiceInfo,
};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Everything the container knows about one service type: its marked
/// constructor (if any), a zero-argument fallback construction path, and the
/// declared setter methods and fields, in declaration order.
///
/// Metadata is built fluently and registered into a [`Registry`]:
///
/// ```
/// use needle_di::{Registry, ServiceMetadata};
///
/// #[derive(Default)]
/// struct AuthService;
///
/// struct DataService {
///     auth_service: AuthService,
/// }
///
/// impl DataService {
///     fn new(auth_service: AuthService) -> Self {
///         DataService { auth_service }
///     }
/// }
///
/// let mut builder = Registry::builder();
/// builder.register(ServiceMetadata::of::<AuthService>().default_constructor());
/// builder.register(ServiceMetadata::of::<DataService>().constructor(DataService::new));
/// let registry = builder.build();
/// ```
pub struct ServiceMetadata {
    info: ServiceInfo,
    constructor: Option<ConstructorSite>,
    fallback: Option<Box<dyn Fn() -> BoxedService>>,
    methods: Vec<MethodSite>,
    fields: Vec<FieldSite>,
}

impl ServiceMetadata {
    /// Opens a fluent metadata builder for the service type `T`.
    #[must_use]
    pub fn of<T: Service>() -> MetadataBuilder<T> {
        MetadataBuilder {
            metadata: ServiceMetadata {
                info: ServiceInfo::of::<T>(),
                constructor: None,
                fallback: None,
                methods: Vec::new(),
                fields: Vec::new(),
            },
            marker: PhantomData,
        }
    }

    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.info
    }

    /// The *Inject*-marked constructor declared for this service, if any.
    /// When absent, the engine falls back to zero-argument construction.
    #[must_use]
    pub fn injectable_constructor(&self) -> Option<&ConstructorSite> {
        self.constructor.as_ref()
    }

    /// Runs the zero-argument construction path, if one was registered.
    pub(crate) fn construct_fallback(&self) -> Option<BoxedService> {
        self.fallback.as_ref().map(|fallback| fallback())
    }

    /// The marked setter methods, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodSite] {
        &self.methods
    }

    /// The declared fields, marked and unmarked, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSite] {
        &self.fields
    }

    /// Looks up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSite> {
        self.fields.iter().find(|field| field.name() == name)
    }
}

/// A fluent builder for [`ServiceMetadata`]. Members are recorded in the
/// order they are declared; that order is the injection order within each
/// phase. Registering the same member twice merges the markings, with
/// *Inject* taking priority over *Resolve*.
pub struct MetadataBuilder<T: Service> {
    metadata: ServiceMetadata,
    marker: PhantomData<T>,
}

impl<T: Service> MetadataBuilder<T> {
    /// Marks `constructor` as the *Inject* constructor for `T`. Each
    /// parameter is built recursively as a dependency.
    #[must_use]
    pub fn constructor<D, F>(mut self, constructor: F) -> Self
    where
        F: Constructor<D, T>,
    {
        self.metadata.constructor = Some(ConstructorSite::new(constructor));
        self
    }

    /// Registers the zero-argument construction path used when no *Inject*
    /// constructor is declared.
    #[must_use]
    pub fn default_constructor(mut self) -> Self
    where
        T: Default,
    {
        self.metadata.fallback =
            Some(Box::new(|| Box::new(T::default()) as BoxedService));
        self
    }

    /// Declares a field without marking it for injection. The setter-shape
    /// check consults declared fields.
    #[must_use]
    pub fn field<V: Service>(self, name: &'static str) -> Self {
        self.push_field(FieldSite::declared::<V>(name))
    }

    /// Marks a field as *Inject*: a dependency of type `D` is built
    /// recursively and assigned through `assign` during the field phase.
    #[must_use]
    pub fn inject_field<D, F>(self, name: &'static str, assign: F) -> Self
    where
        D: Service,
        F: 'static + Fn(&mut T, D),
    {
        self.push_field(FieldSite::inject(name, assign))
    }

    /// Marks a field as *Resolve*: its value is looked up in the
    /// configuration store under the field's own name.
    #[must_use]
    pub fn resolve_field<V, F>(self, name: &'static str, assign: F) -> Self
    where
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        self.push_field(FieldSite::resolve(name, None, assign))
    }

    /// Like [`resolve_field`](Self::resolve_field), with an explicit lookup
    /// key instead of the field name.
    #[must_use]
    pub fn resolve_field_with_key<V, F>(
        self,
        name: &'static str,
        key: &'static str,
        assign: F,
    ) -> Self
    where
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        self.push_field(FieldSite::resolve(name, Some(key), assign))
    }

    /// Marks a setter method as *Inject*. The method must satisfy the setter
    /// shape (one parameter, no return value, matching declared field) or
    /// the build fails with [`NotASetter`](crate::InjectError::NotASetter).
    #[must_use]
    pub fn inject_setter<D, F>(self, name: &'static str, call: F) -> Self
    where
        D: Service,
        F: 'static + Fn(&mut T, D),
    {
        self.push_method(MethodSite::inject(name, call))
    }

    /// Marks a setter method as *Resolve*, looking the value up under the
    /// setter-derived member name.
    #[must_use]
    pub fn resolve_setter<V, F>(self, name: &'static str, call: F) -> Self
    where
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        self.push_method(MethodSite::resolve(name, None, call))
    }

    /// Like [`resolve_setter`](Self::resolve_setter), with an explicit
    /// lookup key.
    #[must_use]
    pub fn resolve_setter_with_key<V, F>(
        self,
        name: &'static str,
        key: &'static str,
        call: F,
    ) -> Self
    where
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        self.push_method(MethodSite::resolve(name, Some(key), call))
    }

    /// Registers a method site directly. Used for sites whose declared shape
    /// is not expressible through the typed registrations above.
    #[must_use]
    pub fn method(self, site: MethodSite) -> Self {
        self.push_method(site)
    }

    fn push_method(mut self, site: MethodSite) -> Self {
        let methods = &mut self.metadata.methods;
        match methods.iter_mut().find(|m| m.name() == site.name()) {
            // Inject wins over a later Resolve marking of the same member.
            Some(existing)
                if existing.binding() == Binding::Inject
                    && site.binding() != Binding::Inject => {}
            Some(existing) => *existing = site,
            None => methods.push(site),
        }
        self
    }

    fn push_field(mut self, site: FieldSite) -> Self {
        let fields = &mut self.metadata.fields;
        match fields.iter_mut().find(|f| f.name() == site.name()) {
            Some(existing) => match (existing.binding(), site.binding()) {
                // A bare declaration never downgrades a marked field.
                (_, None) => {}
                // Inject wins over a later Resolve marking.
                (Some(Binding::Inject), Some(Binding::Resolve(_))) => {}
                (_, Some(binding)) => {
                    existing.set_binding(binding);
                    existing.merge_assign(site);
                }
            },
            None => fields.push(site),
        }
        self
    }
}

impl<T: Service> From<MetadataBuilder<T>> for ServiceMetadata {
    fn from(builder: MetadataBuilder<T>) -> Self {
        builder.metadata
    }
}

pub(crate) type MetadataMap = HashMap<ServiceInfo, ServiceMetadata>;

/// The service registry: the container's only source of type metadata. A
/// type is a service if and only if it is registered here. The registry is
/// immutable once built and may back any number of
/// [`ServiceBuilder`](crate::ServiceBuilder)s.
pub struct Registry {
    services: MetadataMap,
}

impl Registry {
    /// Creates a builder for this registry. This is the preferred way of
    /// creating a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Creates a registry directly from its metadata map. Prefer
    /// [`Registry::builder()`] instead.
    #[must_use]
    pub(crate) fn new(services: MetadataMap) -> Self {
        Registry { services }
    }

    /// Whether `service_info` denotes a registered service type.
    #[must_use]
    pub fn is_service(&self, service_info: ServiceInfo) -> bool {
        self.services.contains_key(&service_info)
    }

    /// The metadata registered for `service_info`, if any.
    #[must_use]
    pub fn metadata(
        &self,
        service_info: ServiceInfo,
    ) -> Option<&ServiceMetadata> {
        self.services.get(&service_info)
    }
}

/// A builder for a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    services: MetadataMap,
}

impl RegistryBuilder {
    /// Registers a service type's metadata. Registering the same type twice
    /// replaces the earlier metadata.
    pub fn register<M: Into<ServiceMetadata>>(&mut self, metadata: M) {
        let metadata = metadata.into();
        self.services.insert(metadata.service_info(), metadata);
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry::new(self.services)
    }
}
