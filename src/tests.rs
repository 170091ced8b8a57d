#![allow(dead_code)]

use crate::{
    introspect, Binding, ConfigMap, InjectError, InjectionPoint, MethodSite,
    Registry, ServiceBuilder, ServiceInfo, ServiceMetadata,
};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::rc::Rc;

#[derive(Debug, Default)]
struct AuthService;

#[derive(Debug)]
struct DataService {
    auth_service: AuthService,
}

impl DataService {
    fn new(auth_service: AuthService) -> Self {
        DataService { auth_service }
    }
}

#[derive(Debug)]
struct UserService {
    data_service: DataService,
}

impl UserService {
    fn new(data_service: DataService) -> Self {
        UserService { data_service }
    }
}

#[derive(Default)]
struct NameService {
    prenom: String,
}

impl NameService {
    fn set_prenom(&mut self, prenom: String) {
        self.prenom = prenom;
    }
}

/// Registry for the acyclic UserService -> DataService -> AuthService chain.
fn chain_registry() -> Registry {
    let mut builder = Registry::builder();
    builder.register(ServiceMetadata::of::<AuthService>().default_constructor());
    builder.register(
        ServiceMetadata::of::<DataService>().constructor(DataService::new),
    );
    builder.register(
        ServiceMetadata::of::<UserService>().constructor(UserService::new),
    );
    builder.build()
}

fn name_registry() -> Registry {
    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<NameService>()
            .default_constructor()
            .field::<String>("prenom")
            .resolve_setter("set_prenom", NameService::set_prenom),
    );
    builder.build()
}

/// Follows the nested-injection chain down to the original cause.
fn root_cause(mut error: &InjectError) -> &InjectError {
    while let InjectError::NestedInjection { source, .. } = error {
        error = source.as_ref();
    }
    error
}

#[test]
fn can_build_constructor_chain() {
    let registry = chain_registry();
    let service = ServiceBuilder::<UserService>::instance(&registry)
        .build()
        .unwrap();
    let _auth = &service.data_service.auth_service;
}

#[test]
fn cant_build_unregistered_root() {
    let registry = Registry::builder().build();
    match ServiceBuilder::<UserService>::instance(&registry).build() {
        Err(InjectError::NotAService { service_info })
            if service_info == ServiceInfo::of::<UserService>() => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("built a service from an empty registry"),
    }
}

#[test]
fn unregistered_dependency_fails_wrapped() {
    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<DataService>().constructor(DataService::new),
    );
    let registry = builder.build();

    let error = ServiceBuilder::<DataService>::instance(&registry)
        .build()
        .unwrap_err();
    match &error {
        InjectError::NestedInjection { point, .. } => match point {
            InjectionPoint::Parameter { index: 0, .. } => {}
            point => panic!("wrong injection point: {}", point),
        },
        error => panic!("expected a nested error, got: {}", error),
    }
    match root_cause(&error) {
        InjectError::NotAService { service_info }
            if *service_info == ServiceInfo::of::<AuthService>() => {}
        error => panic!("wrong cause: {}", error),
    }
}

#[test]
fn cycle_is_reported_with_closing_type_and_path() {
    // AuthService redefined to depend on UserService, closing the cycle
    // UserService -> DataService -> AuthService -> UserService.
    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<AuthService>()
            .constructor(|_user: UserService| AuthService),
    );
    builder.register(
        ServiceMetadata::of::<DataService>().constructor(DataService::new),
    );
    builder.register(
        ServiceMetadata::of::<UserService>().constructor(UserService::new),
    );
    let registry = builder.build();

    let error = ServiceBuilder::<UserService>::instance(&registry)
        .build()
        .unwrap_err();
    match root_cause(&error) {
        InjectError::CycleDetected {
            service_info,
            dependencies,
        } => {
            assert_eq!(ServiceInfo::of::<UserService>(), *service_info);
            assert_eq!(
                vec![
                    ServiceInfo::of::<UserService>(),
                    ServiceInfo::of::<DataService>(),
                    ServiceInfo::of::<AuthService>(),
                ],
                *dependencies
            );
        }
        error => panic!("wrong cause: {}", error),
    }
}

#[test]
fn direct_self_dependency_is_a_cycle() {
    #[derive(Debug)]
    struct Selfish;

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Selfish>().constructor(|_: Selfish| Selfish),
    );
    let registry = builder.build();

    let error = ServiceBuilder::<Selfish>::instance(&registry)
        .build()
        .unwrap_err();
    match root_cause(&error) {
        InjectError::CycleDetected { service_info, .. }
            if *service_info == ServiceInfo::of::<Selfish>() => {}
        error => panic!("wrong cause: {}", error),
    }
}

#[test]
fn sibling_branches_get_distinct_instances() {
    // A diamond is not a cycle: the path is unwound when a subtree
    // completes, so Leaf is built once per sibling branch.
    #[derive(Default)]
    struct Leaf;
    struct Left(Leaf);
    struct Right(Leaf);
    struct Root(Left, Right);

    let built = Rc::new(Cell::new(0));
    let counter = Rc::clone(&built);

    let mut builder = Registry::builder();
    builder.register(ServiceMetadata::of::<Leaf>().constructor(move || {
        counter.set(counter.get() + 1);
        Leaf
    }));
    builder.register(ServiceMetadata::of::<Left>().constructor(Left));
    builder.register(ServiceMetadata::of::<Right>().constructor(Right));
    builder.register(
        ServiceMetadata::of::<Root>()
            .constructor(|left: Left, right: Right| Root(left, right)),
    );
    let registry = builder.build();

    let _root = ServiceBuilder::<Root>::instance(&registry).build().unwrap();
    assert_eq!(2, built.get());
}

#[test]
fn resolves_property_from_configuration() {
    let registry = name_registry();
    let service = ServiceBuilder::<NameService>::instance(&registry)
        .configure()
        .put("prenom", "Fabien".to_string())
        .done()
        .build()
        .unwrap();
    assert_eq!("Fabien", service.prenom);
}

#[test]
fn one_key_resolves_several_members() {
    // Values are cloned out of the store on every lookup, so a single key
    // can fill more than one member in the same graph.
    #[derive(Debug, Default)]
    struct Badge {
        prenom: String,
        greeting: String,
    }

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Badge>()
            .default_constructor()
            .resolve_field("prenom", |badge: &mut Badge, prenom: String| {
                badge.prenom = prenom;
            })
            .resolve_field_with_key(
                "greeting",
                "prenom",
                |badge: &mut Badge, prenom: String| {
                    badge.greeting = format!("Hello, {}", prenom);
                },
            ),
    );
    let registry = builder.build();

    let badge = ServiceBuilder::<Badge>::instance(&registry)
        .configure()
        .put("prenom", "Fabien".to_string())
        .done()
        .build()
        .unwrap();
    assert_eq!("Fabien", badge.prenom);
    assert_eq!("Hello, Fabien", badge.greeting);
}

#[test]
fn missing_property_is_unresolvable() {
    let registry = name_registry();
    match ServiceBuilder::<NameService>::instance(&registry).build() {
        Err(InjectError::UnresolvableProperty { member, key }) => {
            assert_eq!("prenom", member);
            assert_eq!("prenom", key);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("resolved a property from an empty configuration"),
    }
}

#[test]
fn explicit_key_overrides_member_name() {
    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<NameService>()
            .default_constructor()
            .field::<String>("prenom")
            .resolve_setter_with_key(
                "set_prenom",
                "user.prenom",
                NameService::set_prenom,
            ),
    );
    let registry = builder.build();

    match ServiceBuilder::<NameService>::instance(&registry).build() {
        Err(InjectError::UnresolvableProperty { member, key }) => {
            assert_eq!("prenom", member);
            assert_eq!("user.prenom", key);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!(),
    }

    let service = ServiceBuilder::<NameService>::instance(&registry)
        .configure()
        .put("user.prenom", "Fabien".to_string())
        .done()
        .build()
        .unwrap();
    assert_eq!("Fabien", service.prenom);
}

#[test]
fn resolves_marked_field_directly() {
    #[derive(Default)]
    struct Tagged {
        label: String,
    }

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Tagged>()
            .default_constructor()
            .resolve_field("label", |service: &mut Tagged, label: String| {
                service.label = label;
            }),
    );
    let registry = builder.build();

    let service = ServiceBuilder::<Tagged>::instance(&registry)
        .configure()
        .put("label", "tagged".to_string())
        .done()
        .build()
        .unwrap();
    assert_eq!("tagged", service.label);

    match ServiceBuilder::<Tagged>::instance(&registry).build() {
        Err(InjectError::UnresolvableProperty { member, key }) => {
            assert_eq!("label", member);
            assert_eq!("label", key);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!(),
    }
}

#[test]
fn injects_marked_field_recursively() {
    // Field injection the way the original sample wired UserService.
    #[derive(Default)]
    struct Holder {
        auth_service: Option<AuthService>,
    }

    let mut builder = Registry::builder();
    builder.register(ServiceMetadata::of::<AuthService>().default_constructor());
    builder.register(
        ServiceMetadata::of::<Holder>()
            .default_constructor()
            .inject_field("auth_service", |holder: &mut Holder, auth| {
                holder.auth_service = Some(auth);
            }),
    );
    let registry = builder.build();

    let holder = ServiceBuilder::<Holder>::instance(&registry)
        .build()
        .unwrap();
    assert!(holder.auth_service.is_some());
}

#[test]
fn constructor_runs_before_setters_and_fields() {
    #[derive(Default)]
    struct Ordered {
        tag: String,
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let ctor_log = Rc::clone(&log);
    let setter_log = Rc::clone(&log);
    let field_log = Rc::clone(&log);

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Ordered>()
            .constructor(move || {
                ctor_log.borrow_mut().push("constructor");
                Ordered::default()
            })
            .field::<String>("tag")
            .resolve_setter("set_tag", move |service: &mut Ordered, tag| {
                setter_log.borrow_mut().push("setter");
                service.tag = tag;
            })
            .resolve_field_with_key(
                "tag_field",
                "tag",
                move |_: &mut Ordered, _: String| {
                    field_log.borrow_mut().push("field");
                },
            ),
    );
    let registry = builder.build();

    let service = ServiceBuilder::<Ordered>::instance(&registry)
        .configure()
        .put("tag", "ordered".to_string())
        .done()
        .build()
        .unwrap();
    assert_eq!("ordered", service.tag);
    assert_eq!(vec!["constructor", "setter", "field"], *log.borrow());
}

#[test]
fn inject_marking_wins_over_resolve() {
    #[derive(Default)]
    struct Doubly {
        auth_service: Option<AuthService>,
    }

    // The same field registered with both markings resolves as Inject, in
    // either registration order.
    for inject_first in &[true, false] {
        let mut metadata = ServiceMetadata::of::<Doubly>().default_constructor();
        let inject = |service: &mut Doubly, auth| {
            service.auth_service = Some(auth);
        };
        let resolve = |_: &mut Doubly, _: String| {};
        metadata = if *inject_first {
            metadata
                .inject_field("auth_service", inject)
                .resolve_field("auth_service", resolve)
        } else {
            metadata
                .resolve_field("auth_service", resolve)
                .inject_field("auth_service", inject)
        };

        let mut builder = Registry::builder();
        builder.register(ServiceMetadata::of::<AuthService>().default_constructor());
        builder.register(metadata);
        let registry = builder.build();

        // No configuration: a surviving Resolve marking would fail.
        let service = ServiceBuilder::<Doubly>::instance(&registry)
            .build()
            .unwrap();
        assert!(service.auth_service.is_some());
    }
}

#[test]
fn non_setter_named_method_is_rejected() {
    #[derive(Default)]
    struct Misnamed {
        prenom: String,
    }

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Misnamed>()
            .default_constructor()
            .field::<String>("prenom")
            .resolve_setter("initialize", |service: &mut Misnamed, v| {
                service.prenom = v;
            }),
    );
    let registry = builder.build();

    match ServiceBuilder::<Misnamed>::instance(&registry).build() {
        Err(InjectError::NotASetter { method, .. }) => {
            assert!(method.starts_with("initialize("), "{}", method);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("accepted a method that is not a setter"),
    }
}

#[test]
fn setter_without_matching_field_is_rejected() {
    #[derive(Default)]
    struct NoField;

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<NoField>()
            .default_constructor()
            .resolve_setter("set_prenom", |_: &mut NoField, _: String| {}),
    );
    let registry = builder.build();

    match ServiceBuilder::<NoField>::instance(&registry).build() {
        Err(InjectError::NotASetter { service_info, .. })
            if service_info == ServiceInfo::of::<NoField>() => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!(),
    }
}

#[test]
fn setter_with_mismatched_field_type_is_rejected() {
    #[derive(Default)]
    struct Mistyped {
        prenom: i32,
    }

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<Mistyped>()
            .default_constructor()
            .field::<i32>("prenom")
            .resolve_setter("set_prenom", |_: &mut Mistyped, _: String| {}),
    );
    let registry = builder.build();

    match ServiceBuilder::<Mistyped>::instance(&registry).build() {
        Err(InjectError::NotASetter { .. }) => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!(),
    }
}

#[test]
fn wrongly_shaped_method_site_is_rejected() {
    #[derive(Default)]
    struct Shapes {
        prenom: String,
    }

    let two_args = MethodSite::with_shape(
        "set_prenom",
        vec![ServiceInfo::of::<String>(), ServiceInfo::of::<i32>()],
        None,
        Binding::Resolve(None),
    );
    let returns_value = MethodSite::with_shape(
        "set_prenom",
        vec![ServiceInfo::of::<String>()],
        Some(ServiceInfo::of::<bool>()),
        Binding::Resolve(None),
    );

    for site in vec![two_args, returns_value] {
        let mut builder = Registry::builder();
        builder.register(
            ServiceMetadata::of::<Shapes>()
                .default_constructor()
                .field::<String>("prenom")
                .method(site),
        );
        let registry = builder.build();

        match ServiceBuilder::<Shapes>::instance(&registry)
            .configure()
            .put("prenom", "Fabien".to_string())
            .done()
            .build()
        {
            Err(InjectError::NotASetter { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!(),
        }
    }
}

#[test]
fn mismatched_property_type_fails_injection() {
    let registry = name_registry();
    match ServiceBuilder::<NameService>::instance(&registry)
        .configure()
        .put("prenom", 42_i32)
        .done()
        .build()
    {
        Err(InjectError::InjectionFailed { member }) => {
            assert_eq!("prenom", member);
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("injected an i32 into a String member"),
    }
}

#[test]
fn missing_construction_path_fails() {
    struct Unbuildable;

    let mut builder = Registry::builder();
    builder.register(ServiceMetadata::of::<Unbuildable>());
    let registry = builder.build();

    match ServiceBuilder::<Unbuildable>::instance(&registry).build() {
        Err(InjectError::InstantiationFailed { service_info })
            if service_info == ServiceInfo::of::<Unbuildable>() => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => panic!("built a service with no construction path"),
    }
}

#[test]
fn nested_error_chain_reads_root_to_fault() {
    // UserService -> DataService -> AuthService, with AuthService's
    // construction failing on an unresolvable property.
    #[derive(Debug, Default)]
    struct FaultyAuth {
        token: String,
    }
    #[derive(Debug)]
    struct FaultyData(FaultyAuth);
    #[derive(Debug)]
    struct FaultyUser(FaultyData);

    let mut builder = Registry::builder();
    builder.register(
        ServiceMetadata::of::<FaultyAuth>()
            .default_constructor()
            .resolve_field("token", |auth: &mut FaultyAuth, token| {
                auth.token = token;
            }),
    );
    builder.register(ServiceMetadata::of::<FaultyData>().constructor(FaultyData));
    builder.register(ServiceMetadata::of::<FaultyUser>().constructor(FaultyUser));
    let registry = builder.build();

    let error = ServiceBuilder::<FaultyUser>::instance(&registry)
        .build()
        .unwrap_err();

    // Two nesting levels (one per recursive call), then the cause.
    let mut depth = 0;
    let mut current = &error;
    while let InjectError::NestedInjection { source, .. } = current {
        depth += 1;
        current = source.as_ref();
    }
    assert_eq!(2, depth);
    match current {
        InjectError::UnresolvableProperty { key, .. } => {
            assert_eq!("token", key);
        }
        error => panic!("wrong cause: {}", error),
    }

    // The std error source chain exposes the same trail.
    let source = error.source().and_then(|source| source.source());
    assert!(source.is_some());
}

#[test]
fn independent_root_builds_do_not_interact() {
    let registry = chain_registry();
    let first = ServiceBuilder::<UserService>::instance(&registry).build();
    let second = ServiceBuilder::<UserService>::instance(&registry).build();
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[test]
fn builder_accepts_prebuilt_configuration() {
    let registry = name_registry();
    let configuration: ConfigMap =
        vec![("prenom", "Fabien".to_string())].into_iter().collect();

    let service = ServiceBuilder::<NameService>::with_configuration(
        &registry,
        configuration,
    )
    .build()
    .unwrap();
    assert_eq!("Fabien", service.prenom);
}

#[test]
fn configurator_accumulates_properties() {
    let registry = name_registry();
    let builder = ServiceBuilder::<NameService>::instance(&registry)
        .configure()
        .put("prenom", "Fabien".to_string())
        .put("age", 30_i32)
        .done();

    assert_eq!(2, builder.configuration().len());
    assert!(builder.configuration().contains_key("prenom"));
    assert!(!builder.configuration().is_empty());
}

#[test]
fn registry_answers_service_queries() {
    let registry = chain_registry();
    assert!(registry.is_service(ServiceInfo::of::<UserService>()));
    assert!(!registry.is_service(ServiceInfo::of::<NameService>()));

    let metadata = registry
        .metadata(ServiceInfo::of::<DataService>())
        .unwrap();
    let constructor = metadata.injectable_constructor().unwrap();
    assert_eq!(
        &[ServiceInfo::of::<AuthService>()],
        constructor.parameters()
    );
    assert_eq!("DataService(AuthService)", constructor.to_string());
}

#[test]
fn member_name_from_setter_is_pure() {
    assert_eq!("firstName", introspect::member_name_from_setter("setFirstName"));
    assert_eq!(
        "first_name",
        introspect::member_name_from_setter("set_first_name")
    );
    assert_eq!("", introspect::member_name_from_setter("firstName"));
    assert_eq!("", introspect::member_name_from_setter("set"));
    assert_eq!("", introspect::member_name_from_setter(""));
}

#[test]
fn method_site_describes_its_signature() {
    let site = MethodSite::resolve::<NameService, String, _>(
        "set_prenom",
        None,
        NameService::set_prenom,
    );
    assert_eq!("set_prenom(String) : void", site.to_string());
}
