//! Identifier casing and symbol-derivation helpers.
//!
//! Casing must be deterministic and stable across runs — generation is
//! idempotent given identical input.

use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase};

/// `insert_text_at_cursor` / `insert-text-at-cursor` → `insertTextAtCursor`.
pub fn to_camel_case(name: &str) -> String {
    name.replace('-', "_").to_lower_camel_case()
}

/// `insert_text_at_cursor` → `InsertTextAtCursor`.
pub fn to_pascal_case(name: &str) -> String {
    name.replace('-', "_").to_pascal_case()
}

/// `ScrolledWindow` → `scrolled-window`, for intrinsic element names.
pub fn to_kebab_case(name: &str) -> String {
    name.replace('_', "-").to_kebab_case()
}

/// `Button` → `BUTTON`, `FileChooser` → `FILE_CHOOSER`.
pub fn to_shouty_snake_case(name: &str) -> String {
    name.replace('-', "_").to_shouty_snake_case()
}

/// Normalize a GIR class/interface/enum/record name for the output surface.
pub fn normalize_class_name(name: &str) -> String {
    to_pascal_case(name)
}

/// Disambiguate a transformed name that collides across namespaces by
/// prefixing its namespace: `Gdk` + `Window` → `GdkWindow`.
pub fn namespace_prefixed(namespace: &str, transformed_name: &str) -> String {
    format!("{}{}", to_pascal_case(namespace), transformed_name)
}

/// Derive the C `get_type` registration symbol from a GLib type name:
/// `GtkButton` → `gtk_button_get_type`.
pub fn get_type_fn(glib_type_name: &str) -> String {
    let mut result = String::new();
    for c in glib_type_name.chars() {
        if c.is_uppercase() {
            if !result.is_empty() {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result.push_str("_get_type");
    result
}

/// Trailing portion of a constructor's C identifier, used to name static
/// factories: `gtk_button_new_with_label` → `newWithLabel`. A bare `new`
/// collides with the constructor keyword and is kept as-is (the caller
/// decides whether it becomes the instance constructor).
pub fn factory_name(c_identifier: &str, gir_name: &str) -> String {
    let tail = c_identifier
        .rfind("_new")
        .map(|idx| &c_identifier[idx + 1..])
        .unwrap_or(gir_name);
    let camel = to_camel_case(tail);
    if camel.is_empty() { "new".to_string() } else { camel }
}

/// Escape identifiers that are reserved words in the output language.
pub fn escape_ident(name: &str) -> String {
    let camel = to_camel_case(name);
    match camel.as_str() {
        "arguments" | "class" | "default" | "delete" | "eval" | "function" | "in"
        | "instanceof" | "new" | "this" | "typeof" | "var" | "void" | "with" => {
            format!("{camel}_")
        }
        _ => camel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_handles_dashes_and_underscores() {
        assert_eq!(to_camel_case("insert-text-at-cursor"), "insertTextAtCursor");
        assert_eq!(to_camel_case("get_label"), "getLabel");
        assert_eq!(to_camel_case("notify"), "notify");
    }

    #[test]
    fn get_type_fn_splits_on_uppercase() {
        assert_eq!(get_type_fn("GtkButton"), "gtk_button_get_type");
        assert_eq!(get_type_fn("GdkRGBA"), "gdk_r_g_b_a_get_type");
    }

    #[test]
    fn factory_name_uses_c_identifier_tail() {
        assert_eq!(
            factory_name("gtk_button_new_with_label", "new_with_label"),
            "newWithLabel"
        );
        assert_eq!(factory_name("gtk_button_new", "new"), "new");
        assert_eq!(factory_name("gtk_widget_create", "create"), "create");
    }

    #[test]
    fn reserved_words_are_escaped() {
        assert_eq!(escape_ident("new"), "new_");
        assert_eq!(escape_ident("label"), "label");
    }
}
