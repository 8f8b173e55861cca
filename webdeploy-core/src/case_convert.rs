//! Case conversion between graph names and template names
//!
//! Graph attributes and bindings use snake_case (e.g., `health_check_port`,
//! `server_sg`); the template uses CamelCase (`HealthCheckPort`, `ServerSg`).

/// Convert snake_case to CamelCase (PascalCase)
/// e.g., "health_check_port" -> "HealthCheckPort"
///
/// Segments that already start with an uppercase letter are kept as written,
/// so "DNSName" stays "DNSName".
pub fn to_camel_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Template logical id of a binding name
/// e.g., "server_sg" -> "ServerSg"
pub fn logical_id(binding: &str) -> String {
    to_camel_case(binding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("health_check_port"), "HealthCheckPort");
        assert_eq!(to_camel_case("status"), "Status");
        assert_eq!(to_camel_case("id"), "Id");
        assert_eq!(to_camel_case("DNSName"), "DNSName");
    }

    #[test]
    fn test_logical_id() {
        assert_eq!(logical_id("server_sg"), "ServerSg");
        assert_eq!(logical_id("http_listener"), "HttpListener");
    }
}
