use crate::{
    introspect::simple_type_name, BoxedService, InjectError, InjectResult,
    Service, ServiceInfo,
};
use std::any::Any;
use std::fmt::{self, Display, Formatter};

/// How a marked member receives its value: *Inject* builds a dependency
/// recursively, *Resolve* looks a scalar up in the configuration store,
/// under an explicit key or the member's own name.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Binding {
    Inject,
    Resolve(Option<&'static str>),
}

type ApplyFn = Box<dyn Fn(&mut dyn Any, BoxedService) -> bool>;

/// A constructor for creating instances of a service. All functions of arity
/// 12 or less are automatically constructors if each argument is itself a
/// service type and the return value is the constructed service.
///
/// ```
/// use needle_di::ConstructorSite;
///
/// struct Foo;
/// struct Bar(Foo);
///
/// let site = ConstructorSite::new(|foo: Foo| Bar(foo));
/// assert_eq!(1, site.parameters().len());
/// ```
///
/// # Type parameters
/// * `D` - Parameters of this constructor as a tuple.
/// * `R` - Service built by this constructor.
pub trait Constructor<D, R>: 'static
where
    R: Service,
{
    /// The ordered parameter types of this constructor.
    fn parameters() -> Vec<ServiceInfo>;

    /// Invokes this constructor with a positional argument list.
    fn invoke(&self, args: Vec<BoxedService>) -> InjectResult<BoxedService>;
}

macro_rules! impl_constructor {
    () => {
        impl_constructor!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_constructor!(@impl ($first $(, $rest)*));
        impl_constructor!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, R $(, $type_name)*> Constructor<($($type_name,)*), R> for F
        where
            F: 'static + Fn($($type_name),*) -> R,
            R: Service,
            $($type_name: Service,)*
        {
            fn parameters() -> Vec<ServiceInfo> {
                vec![$(ServiceInfo::of::<$type_name>()),*]
            }

            #[allow(unused_variables, unused_mut, non_snake_case)]
            fn invoke(
                &self,
                args: Vec<BoxedService>,
            ) -> InjectResult<BoxedService> {
                let mut args = args.into_iter();
                $(
                    let $type_name = match args.next() {
                        Some(arg) => match arg.downcast::<$type_name>() {
                            Ok(arg) => *arg,
                            Err(_) => {
                                return Err(InjectError::InstantiationFailed {
                                    service_info: ServiceInfo::of::<R>(),
                                })
                            }
                        },
                        None => {
                            return Err(InjectError::InstantiationFailed {
                                service_info: ServiceInfo::of::<R>(),
                            })
                        }
                    };
                )*
                Ok(Box::new(self($($type_name),*)))
            }
        }
    };
}

impl_constructor!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

/// An *Inject*-marked constructor registered for a service: its ordered
/// parameter types and the erased invocation closure.
pub struct ConstructorSite {
    result: ServiceInfo,
    params: Vec<ServiceInfo>,
    invoke: Box<dyn Fn(Vec<BoxedService>) -> InjectResult<BoxedService>>,
}

impl ConstructorSite {
    pub fn new<D, R, F>(constructor: F) -> Self
    where
        R: Service,
        F: Constructor<D, R>,
    {
        ConstructorSite {
            result: ServiceInfo::of::<R>(),
            params: F::parameters(),
            invoke: Box::new(move |args| constructor.invoke(args)),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[ServiceInfo] {
        &self.params
    }

    /// Invokes the underlying constructor with an argument list assembled by
    /// the engine, one boxed instance per parameter, in declaration order.
    pub fn invoke(
        &self,
        args: Vec<BoxedService>,
    ) -> InjectResult<BoxedService> {
        (self.invoke)(args)
    }
}

impl Display for ConstructorSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", simple_type_name(self.result.name()))?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(simple_type_name(param.name()))?;
        }
        f.write_str(")")
    }
}

/// A marked setter method registered for a service.
pub struct MethodSite {
    name: &'static str,
    params: Vec<ServiceInfo>,
    returns: Option<ServiceInfo>,
    binding: Binding,
    apply: ApplyFn,
}

impl MethodSite {
    /// Registers an *Inject*-marked setter. The dependency `D` is built
    /// recursively and passed to `call`.
    pub fn inject<T, D, F>(name: &'static str, call: F) -> Self
    where
        T: Service,
        D: Service,
        F: 'static + Fn(&mut T, D),
    {
        MethodSite {
            name,
            params: vec![ServiceInfo::of::<D>()],
            returns: None,
            binding: Binding::Inject,
            apply: erase_apply(call),
        }
    }

    /// Registers a *Resolve*-marked setter. The value is looked up in the
    /// configuration store under `key`, or under the setter-derived member
    /// name when `key` is `None`.
    pub fn resolve<T, V, F>(
        name: &'static str,
        key: Option<&'static str>,
        call: F,
    ) -> Self
    where
        T: Service,
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        MethodSite {
            name,
            params: vec![ServiceInfo::of::<V>()],
            returns: None,
            binding: Binding::Resolve(key),
            apply: erase_apply(call),
        }
    }

    /// Builds a site with an arbitrary declared shape. The typed
    /// registrations above always produce single-argument, void-returning
    /// sites; this one exists so a registration can describe a method that
    /// does not satisfy the setter shape and be rejected by the engine.
    pub fn with_shape(
        name: &'static str,
        params: Vec<ServiceInfo>,
        returns: Option<ServiceInfo>,
        binding: Binding,
    ) -> Self {
        MethodSite {
            name,
            params,
            returns,
            binding,
            apply: Box::new(|_, _| false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[ServiceInfo] {
        &self.params
    }

    #[must_use]
    pub fn returns(&self) -> Option<ServiceInfo> {
        self.returns
    }

    #[must_use]
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Calls the setter on `target` with `value`. Returns `false` if either
    /// downcast fails.
    pub(crate) fn apply(
        &self,
        target: &mut dyn Any,
        value: BoxedService,
    ) -> bool {
        (self.apply)(target, value)
    }
}

impl Display for MethodSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(simple_type_name(param.name()))?;
        }
        f.write_str(") : ")?;
        match self.returns {
            Some(returns) => f.write_str(simple_type_name(returns.name())),
            None => f.write_str("void"),
        }
    }
}

/// A declared field of a service. Unmarked fields only carry their name and
/// type, consulted by the setter-shape check; marked fields additionally
/// carry an assignment closure for the field phase.
pub struct FieldSite {
    name: &'static str,
    ty: ServiceInfo,
    binding: Option<Binding>,
    assign: Option<ApplyFn>,
}

impl FieldSite {
    /// Declares a field without marking it for injection.
    pub fn declared<V: Service>(name: &'static str) -> Self {
        FieldSite {
            name,
            ty: ServiceInfo::of::<V>(),
            binding: None,
            assign: None,
        }
    }

    /// Registers an *Inject*-marked field.
    pub fn inject<T, D, F>(name: &'static str, assign: F) -> Self
    where
        T: Service,
        D: Service,
        F: 'static + Fn(&mut T, D),
    {
        FieldSite {
            name,
            ty: ServiceInfo::of::<D>(),
            binding: Some(Binding::Inject),
            assign: Some(erase_apply(assign)),
        }
    }

    /// Registers a *Resolve*-marked field. `key` defaults to the field name.
    pub fn resolve<T, V, F>(
        name: &'static str,
        key: Option<&'static str>,
        assign: F,
    ) -> Self
    where
        T: Service,
        V: Service,
        F: 'static + Fn(&mut T, V),
    {
        FieldSite {
            name,
            ty: ServiceInfo::of::<V>(),
            binding: Some(Binding::Resolve(key)),
            assign: Some(erase_apply(assign)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.ty
    }

    #[must_use]
    pub fn binding(&self) -> Option<Binding> {
        self.binding
    }

    pub(crate) fn set_binding(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    pub(crate) fn merge_assign(&mut self, other: FieldSite) {
        if other.assign.is_some() {
            self.assign = other.assign;
            self.ty = other.ty;
        }
    }

    /// Writes `value` into the field on `target`. Returns `false` if either
    /// downcast fails or the field carries no assignment closure.
    pub(crate) fn assign(
        &self,
        target: &mut dyn Any,
        value: BoxedService,
    ) -> bool {
        match &self.assign {
            Some(assign) => assign(target, value),
            None => false,
        }
    }
}

fn erase_apply<T, V, F>(call: F) -> ApplyFn
where
    T: Service,
    V: Service,
    F: 'static + Fn(&mut T, V),
{
    Box::new(move |target: &mut dyn Any, value: BoxedService| {
        let value = match value.downcast::<V>() {
            Ok(value) => *value,
            Err(_) => return false,
        };
        match target.downcast_mut::<T>() {
            Some(target) => {
                call(target, value);
                true
            }
            None => false,
        }
    })
}
