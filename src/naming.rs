//! Discovery name generation.
//!
//! Every container is published under three names inside the `switch`
//! zone:
//!
//! * `<short-id>.switch`
//! * `<name>.<image>.switch`
//! * `<short-id>.<image>.switch`
//!
//! where `<short-id>` is the first twelve characters of the container
//! identifier, `<image>` is the bare image name (no registry, repository
//! path or tag) and `<name>` is the container name without any `/`
//! prefix.  Empty image or name components are not rejected and produce
//! names with an empty label.

use thiserror::Error;

/// Zone every discovery name lives in.
pub const ZONE: &str = "switch";

/// Number of identifier characters used in discovery names.
pub const SHORT_ID_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("container identifier {0:?} is shorter than {} characters", SHORT_ID_LEN)]
    IdentifierTooShort(String),
    #[error("container identifier {0:?} does not start with {} whole characters", SHORT_ID_LEN)]
    MalformedIdentifier(String),
}

/// Derives the sorted discovery names for a container.
pub fn discovery_domains(id: &str, image: &str, name: &str) -> Result<Vec<String>, NamingError> {
    let short_id = short_id(id)?;
    let image = image_name(image);
    let name = display_name(name);

    let mut domains = vec![
        format!("{short_id}.{ZONE}"),
        format!("{name}.{image}.{ZONE}"),
        format!("{short_id}.{image}.{ZONE}"),
    ];
    domains.sort();
    Ok(domains)
}

fn short_id(id: &str) -> Result<&str, NamingError> {
    if id.len() < SHORT_ID_LEN {
        return Err(NamingError::IdentifierTooShort(id.to_string()));
    }
    id.get(..SHORT_ID_LEN)
        .ok_or_else(|| NamingError::MalformedIdentifier(id.to_string()))
}

/// `registry.example.com/library/redis:7` -> `redis`
fn image_name(image: &str) -> &str {
    let image = image.rsplit_once('/').map_or(image, |(_, last)| last);
    image.split_once(':').map_or(image, |(bare, _)| bare)
}

/// `/compose/web` -> `web`
fn display_name(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, last)| last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_sorted_domains() {
        let domains = discovery_domains(
            "a1b2c3d4e5f67890",
            "registry.example.com/library/redis:7",
            "/myredis",
        )
        .unwrap();
        assert_eq!(
            domains,
            vec![
                "a1b2c3d4e5f6.redis.switch",
                "a1b2c3d4e5f6.switch",
                "myredis.redis.switch",
            ]
        );
    }

    #[test]
    fn is_deterministic() {
        let first = discovery_domains("0123456789abcdef", "nginx", "web").unwrap();
        let second = discovery_domains("0123456789abcdef", "nginx", "web").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn normalises_image_references() {
        assert_eq!(image_name("redis"), "redis");
        assert_eq!(image_name("redis:7-alpine"), "redis");
        assert_eq!(image_name("library/redis"), "redis");
        assert_eq!(image_name("localhost:5000/team/api:1.2"), "api");
    }

    #[test]
    fn strips_hierarchical_name_prefix() {
        assert_eq!(display_name("/web"), "web");
        assert_eq!(display_name("/parent/child"), "child");
        assert_eq!(display_name("plain"), "plain");
    }

    #[test]
    fn empty_components_leave_empty_labels() {
        let domains = discovery_domains("0123456789abcdef", "", "").unwrap();
        assert!(domains.contains(&"..switch".to_string()));
        assert!(domains.contains(&"0123456789ab..switch".to_string()));
    }

    #[test]
    fn rejects_short_identifiers() {
        assert_eq!(
            discovery_domains("abc", "redis", "/r"),
            Err(NamingError::IdentifierTooShort("abc".into()))
        );
    }

    #[test]
    fn rejects_identifiers_split_inside_a_character() {
        // 'a' then two-byte characters: byte 12 falls mid-character.
        let id = "a\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}";
        assert!(id.len() >= SHORT_ID_LEN);
        assert_eq!(
            discovery_domains(id, "redis", "/r"),
            Err(NamingError::MalformedIdentifier(id.into()))
        );
    }
}
