//! Name normalization applied to validated intents.

/// Lower-cases a permission name and replaces each whitespace run with `_`.
pub fn normalize_permission_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Upper-cases the first character of a role name, leaving the rest as is.
pub fn normalize_role_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Description given to a permission created without one.
pub fn default_permission_description(requested: &str) -> String {
    format!("Permission for {requested}")
}

/// Description given to a role created without one.
pub fn default_role_description(requested: &str) -> String {
    format!("{requested} role")
}

/// Description given to a permission auto-created by an assign command.
pub fn assigned_permission_description(requested: &str) -> String {
    format!("Permission to {requested}")
}

/// Description given to a role auto-created by an assign command.
pub fn assigned_role_description(requested: &str) -> String {
    default_role_description(requested)
}
