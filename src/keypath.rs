//! Storage key layout.

/// Root under which resolvers look up discovery records.
pub const DISCOVERY_ROOT: &str = "/skydns";

/// Root holding one [`Entry`](crate::types::Entry) per container.
pub const ENTRY_ROOT: &str = "/swtch";

/// Path of the canonical entry for a container, keyed by its full identifier.
pub fn entry_path(container_id: &str) -> String {
    format!("{ENTRY_ROOT}/{container_id}")
}

/// `abc.redis.switch` -> `/skydns/switch/redis/abc`
pub fn discovery_key(domain: &str) -> String {
    let mut path = String::from(DISCOVERY_ROOT);
    for label in domain.rsplit('.') {
        path.push('/');
        path.push_str(label);
    }
    path
}

/// Key paths for a set of domains, sorted on their own.
pub fn discovery_keys<S: AsRef<str>>(domains: &[S]) -> Vec<String> {
    let mut keys: Vec<String> = domains.iter().map(|d| discovery_key(d.as_ref())).collect();
    keys.sort();
    keys
}
