//! Registry-driven dependency injection.
//!
//! Given a root service type, the [`ServiceBuilder`] engine recursively
//! constructs an instance graph: each declared dependency is built as a
//! fresh instance of its own type, and declared configuration properties
//! are filled from a caller-supplied key/value store. The result is a
//! strict ownership tree — no instance is cached or shared between sibling
//! branches, and there is no singleton or scope management.
//!
//! # Registration (rather than reflection)
//!
//! There is no runtime reflection to scan for markings, so each service
//! type registers its injection sites into a [`Registry`] up front through
//! the fluent [`ServiceMetadata`] builder. The registration vocabulary has
//! three markings:
//!
//! - registering a type at all marks it as a *service*, eligible for
//!   graph-managed construction;
//! - *inject* marks a constructor, setter, or field as a recursive
//!   dependency injection point;
//! - *resolve* marks a setter or field as a configuration-value injection
//!   point, looked up under an explicit key or the member's own name.
//!
//! The engine queries the registry exactly the way a reflective container
//! would query live type metadata: ordered constructor parameters, setter
//! methods, and fields, all directly declared on the registered type.
//!
//! # Injection order
//!
//! Constructor injection always runs first and alone determines how the
//! instance is instantiated; marked setters run next, then marked fields,
//! each in declaration order. Setter and field injection require an
//! already-constructed instance, which fixes this ordering.
//!
//! # Failures
//!
//! Every failure inside a recursive build is rewrapped exactly once at its
//! call site as [`InjectError::NestedInjection`], so the root error reads
//! as a breadcrumb trail from the requested type down to the fault, while
//! [`std::error::Error::source`] still exposes the original cause. A cycle
//! anywhere in the graph is caught on re-entry and reported with the full
//! dependency path.
//!
//! # Example
//!
//! ```
//! use needle_di::{
//!     InjectResult, Registry, ServiceBuilder, ServiceMetadata,
//! };
//!
//! // A service with no dependencies.
//! #[derive(Default)]
//! struct AuthService;
//!
//! // DataService depends on AuthService through its constructor.
//! struct DataService {
//!     auth_service: AuthService,
//! }
//!
//! impl DataService {
//!     pub fn new(auth_service: AuthService) -> Self {
//!         DataService { auth_service }
//!     }
//! }
//!
//! // UserService depends on DataService, and resolves a greeting from the
//! // configuration store through a setter.
//! struct UserService {
//!     data_service: DataService,
//!     greeting: String,
//! }
//!
//! impl UserService {
//!     pub fn new(data_service: DataService) -> Self {
//!         UserService {
//!             data_service,
//!             greeting: String::new(),
//!         }
//!     }
//!
//!     pub fn set_greeting(&mut self, greeting: String) {
//!         self.greeting = greeting;
//!     }
//! }
//!
//! fn main() -> InjectResult<()> {
//!     // Each service self-registers its injection sites.
//!     let mut builder = Registry::builder();
//!     builder.register(
//!         ServiceMetadata::of::<AuthService>().default_constructor(),
//!     );
//!     builder.register(
//!         ServiceMetadata::of::<DataService>()
//!             .constructor(DataService::new),
//!     );
//!     builder.register(
//!         ServiceMetadata::of::<UserService>()
//!             .constructor(UserService::new)
//!             .field::<String>("greeting")
//!             .resolve_setter("set_greeting", UserService::set_greeting),
//!     );
//!     let registry = builder.build();
//!
//!     // One root build call walks the whole graph.
//!     let service = ServiceBuilder::<UserService>::instance(&registry)
//!         .configure()
//!         .put("greeting", "Hello".to_string())
//!         .done()
//!         .build()?;
//!
//!     assert_eq!("Hello", service.greeting);
//!     let _auth = &service.data_service.auth_service;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod builder;
mod config;
mod registry;
mod service;
mod sites;

pub mod introspect;

pub use builder::*;
pub use config::*;
pub use registry::*;
pub use service::*;
pub use sites::*;

#[cfg(test)]
mod tests;
