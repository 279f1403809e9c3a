use rand::{distributions::Alphanumeric, Rng};

/// Generates `count` unlikely-to-exist DNS labels of the form
/// `<random-LDH-string>.<sub>`, each label body 1-24 lowercase
/// alphanumeric characters (never starting or ending with a hyphen; this
/// generator never produces hyphens at all, which trivially satisfies that
/// constraint while staying valid LDH).
///
/// Used by the wildcard detector (probing) and can be reused by any handler
/// that needs a disposable, collision-resistant label.
pub fn random_probe_labels(sub: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| format!("{}.{}", random_ldh_label(), sub))
        .collect()
}

/// A single random LDH-valid label body, 1-24 characters of `[a-z0-9]`.
pub fn random_ldh_label() -> String {
    let len = rand::thread_rng().gen_range(8..=24usize);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_well_formed_and_unique() {
        let labels = random_probe_labels("example.com", 5);
        assert_eq!(labels.len(), 5);
        for label in &labels {
            assert!(label.ends_with(".example.com"));
            let prefix = label.strip_suffix(".example.com").unwrap();
            assert!(!prefix.is_empty() && prefix.len() <= 24);
            assert!(prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
