#![allow(clippy::used_underscore_binding)]

use derive_more::{Display, Error};
use std::any::{Any, TypeId};

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any {}
impl<T: ?Sized + Any> Service for T {}

/// An owned, type-erased service instance. Instances are owned exclusively
/// by their parent in the object graph; the container never shares or caches
/// them.
pub type BoxedService = Box<dyn Any>;

/// A result from attempting to inject dependencies into a service and
/// construct an instance of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Type information about a service. Two [`ServiceInfo`] values denote the
/// same service type if and only if their [`TypeId`]s are equal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The member at which a nested injection failure occurred. Carried by
/// [`InjectError::NestedInjection`] so the top-level error reads as a
/// breadcrumb trail from the root service down to the fault.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
pub enum InjectionPoint {
    /// A constructor parameter, by position.
    #[display(fmt = "in argument {} of constructor {}", index, constructor)]
    Parameter {
        index: usize,
        constructor: String,
    },

    /// A setter method.
    #[display(fmt = "with the method {}", method)]
    Setter { method: String },

    /// A field assigned directly.
    #[display(fmt = "in field {}", name)]
    Field { name: String },
}

/// An error that has occurred while building a service graph.
#[derive(Debug, Display, Error)]
pub enum InjectError {
    /// The requested type is not registered as a service.
    #[display(
        fmt = "cannot inject {}: the type is not registered as a service",
        "service_info.name()"
    )]
    NotAService { service_info: ServiceInfo },

    /// A type re-entered the dependency path during the same root build.
    #[display(
        fmt = "{} has already been visited, seems there is a cyclic \
               dependency. Dependency graph: {}",
        "service_info.name()",
        "fmt_dependency_graph(dependencies)"
    )]
    CycleDetected {
        /// The type that closed the cycle.
        service_info: ServiceInfo,
        /// The ordered build path at the moment the cycle closed.
        dependencies: Vec<ServiceInfo>,
    },

    /// The construction primitive failed for a type.
    #[display(
        fmt = "unable to instantiate service {}. Did you declare a default \
               constructor?",
        "service_info.name()"
    )]
    InstantiationFailed { service_info: ServiceInfo },

    /// A member marked for injection does not satisfy the setter shape.
    #[display(fmt = "the method {} must be a setter", method)]
    NotASetter {
        service_info: ServiceInfo,
        method: String,
    },

    /// A resolvable member's lookup key is absent from the configuration.
    #[display(
        fmt = "the member {} cannot be resolved: no property with key {:?} \
               was found in the configuration",
        member,
        key
    )]
    UnresolvableProperty { member: String, key: String },

    /// A setter call or field write failed at the primitive level.
    #[display(fmt = "unable to inject a matching value in member {}", member)]
    InjectionFailed { member: String },

    /// An error raised during a recursive build, annotated with the member
    /// at the enclosing level. Unwrap via [`std::error::Error::source`].
    #[display(fmt = "unable to create the dependency to inject {}", point)]
    NestedInjection {
        point: InjectionPoint,
        source: Box<InjectError>,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(
        fmt = "an unexpected error occurred (please report this): {}",
        _0
    )]
    InternalError(#[error(ignore)] String),
}

fn fmt_dependency_graph(dependencies: &[ServiceInfo]) -> String {
    let mut joined = String::new();
    for item in dependencies {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(item.name());
    }
    joined
}
