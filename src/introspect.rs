//! Read-only helpers over registered metadata: setter-name derivation, the
//! setter-shape check, and diagnostic formatting. No state, no caching.

use crate::{MethodSite, ServiceMetadata};

/// Derives a member name from a setter method name. Strips the leading
/// `set`, then either strips a following `_` or lower-cases the following
/// character. Returns an empty string when the name is not setter-like.
///
/// ```
/// use needle_di::introspect::member_name_from_setter;
///
/// assert_eq!("firstName", member_name_from_setter("setFirstName"));
/// assert_eq!("first_name", member_name_from_setter("set_first_name"));
/// assert_eq!("", member_name_from_setter("firstName"));
/// assert_eq!("", member_name_from_setter(""));
/// ```
#[must_use]
pub fn member_name_from_setter(method_name: &str) -> String {
    let rest = match method_name.strip_prefix("set") {
        Some(rest) if !rest.is_empty() => rest,
        _ => return String::new(),
    };
    if let Some(rest) = rest.strip_prefix('_') {
        return rest.to_string();
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `method` is a true setter on the service described by
/// `metadata`: it returns nothing, takes exactly one parameter, and a
/// declared field exists whose name matches the setter-derived member name
/// and whose type accepts the parameter's type.
#[must_use]
pub fn is_setter_shaped(
    metadata: &ServiceMetadata,
    method: &MethodSite,
) -> bool {
    let member = member_name_from_setter(method.name());
    if member.is_empty() {
        return false;
    }
    let field = match metadata.field(&member) {
        Some(field) => field,
        None => return false,
    };
    method.returns().is_none()
        && method.parameters().len() == 1
        && method.parameters()[0] == field.service_info()
}

/// The unqualified name of a type, for diagnostics.
#[must_use]
pub fn simple_type_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}
