//! Name transforms between internal properties (camelCase) and wire fields (dash-case).

/// Convert a single identifier from camelCase to dash-case.
/// e.g. "firstName" -> "first-name", "solarSystem" -> "solar-system"
pub fn dasherize(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else if c == '_' || c == ' ' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a single identifier from dash-case (or snake_case) to camelCase.
/// e.g. "first-name" -> "firstName", "solar_system" -> "solarSystem"
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '-' || c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Capitalize the first character: "solarSystem" -> "SolarSystem". Used for GraphQL type names.
pub fn classify(s: &str) -> String {
    let camel = camelize(s);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
