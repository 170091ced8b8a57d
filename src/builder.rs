use crate::{
    introspect, Binding, BoxedService, ConfigMap, Configurator, InjectError,
    InjectResult, InjectionPoint, Registry, Service, ServiceInfo,
    ServiceMetadata,
};
use std::any::Any;
use std::marker::PhantomData;

/// The resolution engine. Given a registered service type `T`, a
/// [`ServiceBuilder`] constructs one fully injected instance, recursing
/// through nested dependencies depth-first: constructor parameters first,
/// then marked setters, then marked fields, each in declaration order.
///
/// Each builder owns its own configuration store, and each call to
/// [`build`](ServiceBuilder::build) runs with a fresh dependency path, so
/// independent root builds never observe each other.
///
/// ```
/// use needle_di::{Registry, ServiceBuilder, ServiceMetadata};
///
/// #[derive(Default)]
/// struct NameService {
///     prenom: String,
/// }
///
/// impl NameService {
///     fn set_prenom(&mut self, prenom: String) {
///         self.prenom = prenom;
///     }
/// }
///
/// let mut builder = Registry::builder();
/// builder.register(
///     ServiceMetadata::of::<NameService>()
///         .default_constructor()
///         .field::<String>("prenom")
///         .resolve_setter("set_prenom", NameService::set_prenom),
/// );
/// let registry = builder.build();
///
/// let service = ServiceBuilder::<NameService>::instance(&registry)
///     .configure()
///     .put("prenom", "Fabien".to_string())
///     .done()
///     .build()
///     .unwrap();
/// assert_eq!("Fabien", service.prenom);
/// ```
pub struct ServiceBuilder<'a, T: Service> {
    registry: &'a Registry,
    configuration: ConfigMap,
    marker: PhantomData<T>,
}

impl<'a, T: Service> ServiceBuilder<'a, T> {
    /// Creates a builder for the service type `T` with an empty
    /// configuration.
    #[must_use]
    pub fn instance(registry: &'a Registry) -> Self {
        ServiceBuilder::with_configuration(registry, ConfigMap::new())
    }

    /// Creates a builder with a caller-supplied configuration store.
    #[must_use]
    pub fn with_configuration(
        registry: &'a Registry,
        configuration: ConfigMap,
    ) -> Self {
        ServiceBuilder {
            registry,
            configuration,
            marker: PhantomData,
        }
    }

    /// Opens a fluent [`Configurator`] over this builder's configuration.
    pub fn configure(self) -> Configurator<'a, T> {
        Configurator::new(self)
    }

    /// The configuration store consulted by *Resolve*-marked members.
    #[must_use]
    pub fn configuration(&self) -> &ConfigMap {
        &self.configuration
    }

    pub(crate) fn configuration_mut(&mut self) -> &mut ConfigMap {
        &mut self.configuration
    }

    /// Builds one fully injected instance of `T`, or the first failure met
    /// during the graph walk. A failed build produces no instance.
    pub fn build(self) -> InjectResult<T> {
        let mut context = BuildContext::new(&self.configuration);
        let instance = build_service(
            self.registry,
            &mut context,
            ServiceInfo::of::<T>(),
        )?;
        match instance.downcast::<T>() {
            Ok(instance) => Ok(*instance),
            Err(_) => Err(InjectError::InternalError(format!(
                "built instance is not a {}",
                ServiceInfo::of::<T>().name()
            ))),
        }
    }
}

/// Per-root-build state threaded by reference through the whole recursion:
/// the shared configuration store and the ordered path of types currently
/// being built, used for cycle detection.
struct BuildContext<'a> {
    configuration: &'a ConfigMap,
    dependencies: Vec<ServiceInfo>,
}

impl<'a> BuildContext<'a> {
    fn new(configuration: &'a ConfigMap) -> Self {
        BuildContext {
            configuration,
            dependencies: Vec::new(),
        }
    }

    /// Records entry into a type's subtree. Re-entering a type already on
    /// the path closes a cycle.
    fn enter(&mut self, service_info: ServiceInfo) -> InjectResult<()> {
        if self.dependencies.contains(&service_info) {
            return Err(InjectError::CycleDetected {
                service_info,
                dependencies: self.dependencies.clone(),
            });
        }
        self.dependencies.push(service_info);
        Ok(())
    }

    /// Leaves a type's subtree once it is fully built (or failed), so the
    /// same type can appear again in a sibling branch.
    fn leave(&mut self) {
        self.dependencies.pop();
    }
}

/// One recursive engine invocation: precondition, cycle check, then the
/// three injection phases.
fn build_service(
    registry: &Registry,
    context: &mut BuildContext<'_>,
    service_info: ServiceInfo,
) -> InjectResult<BoxedService> {
    let metadata = registry
        .metadata(service_info)
        .ok_or(InjectError::NotAService { service_info })?;

    // The cycle check runs before recursing into the type's own
    // dependencies, so re-entry is caught immediately rather than after
    // exhausting the subtree.
    context.enter(service_info)?;
    let result = build_entered(registry, context, metadata);
    context.leave();
    result
}

fn build_entered(
    registry: &Registry,
    context: &mut BuildContext<'_>,
    metadata: &ServiceMetadata,
) -> InjectResult<BoxedService> {
    let mut instance = construct(registry, context, metadata)?;
    inject_setters(registry, context, metadata, &mut *instance)?;
    inject_fields(registry, context, metadata, &mut *instance)?;
    Ok(instance)
}

/// Constructor phase. The *Inject*-marked constructor alone determines how
/// the instance is instantiated; without one, the zero-argument fallback
/// path is used.
fn construct(
    registry: &Registry,
    context: &mut BuildContext<'_>,
    metadata: &ServiceMetadata,
) -> InjectResult<BoxedService> {
    let constructor = match metadata.injectable_constructor() {
        Some(constructor) => constructor,
        None => {
            return metadata.construct_fallback().ok_or(
                InjectError::InstantiationFailed {
                    service_info: metadata.service_info(),
                },
            )
        }
    };

    let mut args = Vec::with_capacity(constructor.parameters().len());
    for (index, &param) in constructor.parameters().iter().enumerate() {
        let arg =
            build_service(registry, context, param).map_err(|source| {
                InjectError::NestedInjection {
                    point: InjectionPoint::Parameter {
                        index,
                        constructor: constructor.to_string(),
                    },
                    source: Box::new(source),
                }
            })?;
        args.push(arg);
    }
    constructor.invoke(args)
}

/// Setter phase. Runs after the constructor, in declaration order.
fn inject_setters(
    registry: &Registry,
    context: &mut BuildContext<'_>,
    metadata: &ServiceMetadata,
    instance: &mut dyn Any,
) -> InjectResult<()> {
    for method in metadata.methods() {
        if !introspect::is_setter_shaped(metadata, method) {
            return Err(InjectError::NotASetter {
                service_info: metadata.service_info(),
                method: method.to_string(),
            });
        }

        let member = introspect::member_name_from_setter(method.name());
        let value = match method.binding() {
            Binding::Inject => {
                let param = method.parameters()[0];
                build_service(registry, context, param).map_err(|source| {
                    InjectError::NestedInjection {
                        point: InjectionPoint::Setter {
                            method: method.to_string(),
                        },
                        source: Box::new(source),
                    }
                })?
            }
            Binding::Resolve(key) => {
                let key: &str = match key {
                    Some(key) => key,
                    None => &member,
                };
                resolve_property(context, &member, key)?
            }
        };

        if !method.apply(instance, value) {
            return Err(InjectError::InjectionFailed { member });
        }
    }
    Ok(())
}

/// Field phase. Runs last, writing directly into marked fields in
/// declaration order.
fn inject_fields(
    registry: &Registry,
    context: &mut BuildContext<'_>,
    metadata: &ServiceMetadata,
    instance: &mut dyn Any,
) -> InjectResult<()> {
    for field in metadata.fields() {
        let binding = match field.binding() {
            Some(binding) => binding,
            None => continue,
        };

        let value = match binding {
            Binding::Inject => {
                build_service(registry, context, field.service_info())
                    .map_err(|source| InjectError::NestedInjection {
                        point: InjectionPoint::Field {
                            name: field.name().to_string(),
                        },
                        source: Box::new(source),
                    })?
            }
            Binding::Resolve(key) => {
                let key = key.unwrap_or_else(|| field.name());
                resolve_property(context, field.name(), key)?
            }
        };

        if !field.assign(instance, value) {
            return Err(InjectError::InjectionFailed {
                member: field.name().to_string(),
            });
        }
    }
    Ok(())
}

fn resolve_property(
    context: &BuildContext<'_>,
    member: &str,
    key: &str,
) -> InjectResult<BoxedService> {
    context.configuration.get(key).ok_or_else(|| {
        InjectError::UnresolvableProperty {
            member: member.to_string(),
            key: key.to_string(),
        }
    })
}
