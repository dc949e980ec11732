// Pseudonym - Deterministic human-readable names for peer ids
// e.g. 12D3KooWJLXEX2GfHPSZR3z9QKNSN8EY6pXo7FZ9XtFhiKLJATtC -> jolly-green-diann

const ADJECTIVES: &[&str] = &[
    "able", "bold", "brave", "bright", "calm", "clever", "cosmic", "crisp", "curious", "daring",
    "eager", "early", "fancy", "fierce", "gentle", "glad", "golden", "grand", "happy", "hidden",
    "humble", "jolly", "keen", "kind", "lively", "lucky", "merry", "mighty", "modest", "noble",
    "odd", "patient", "plucky", "polite", "proud", "quick", "quiet", "rapid", "rare", "rustic",
    "sharp", "shy", "silent", "sleek", "smooth", "steady", "swift", "tidy", "vivid", "witty",
];

const COLORS: &[&str] = &[
    "amber", "aqua", "azure", "beige", "black", "blue", "bronze", "brown", "coral", "crimson",
    "cyan", "emerald", "gold", "gray", "green", "indigo", "ivory", "jade", "lavender", "lime",
    "magenta", "maroon", "olive", "orange", "pink", "plum", "purple", "red", "salmon", "silver",
    "teal", "violet", "white", "yellow",
];

const NAMES: &[&str] = &[
    "ada", "alma", "arlo", "bea", "bruno", "cara", "cleo", "dante", "diann", "eden", "elio",
    "ezra", "faye", "felix", "gia", "greta", "hana", "hugo", "ines", "ivan", "jade", "jonas",
    "kai", "kira", "lena", "leo", "luca", "mara", "milo", "nadia", "nico", "nora", "omar",
    "otto", "pia", "quinn", "rafa", "rosa", "sami", "sena", "tara", "theo", "uma", "vera",
    "wren", "xena", "yara", "yuri", "zara", "zeno",
];

/// Deterministic `adjective-color-name` pseudonym for a peer id
pub fn pseudonym_for_peer_id(peer_id: &str) -> String {
    let digest = blake3::hash(peer_id.as_bytes());
    let bytes = digest.as_bytes();

    let pick = |offset: usize, words: &[&'static str]| -> &'static str {
        let mut chunk = [0u8; 8];
        chunk.copy_from_slice(&bytes[offset..offset + 8]);
        words[(u64::from_le_bytes(chunk) % words.len() as u64) as usize]
    };

    format!(
        "{}-{}-{}",
        pick(0, ADJECTIVES),
        pick(8, COLORS),
        pick(16, NAMES)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let id = "12D3KooWJLXEX2GfHPSZR3z9QKNSN8EY6pXo7FZ9XtFhiKLJATtC";
        assert_eq!(pseudonym_for_peer_id(id), pseudonym_for_peer_id(id));
    }

    #[test]
    fn test_shape() {
        let name = pseudonym_for_peer_id("QmRelay");
        let parts: Vec<_> = name.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(COLORS.contains(&parts[1]));
        assert!(NAMES.contains(&parts[2]));
        assert_eq!(name, name.to_lowercase());
    }

    #[test]
    fn test_spreads_over_ids() {
        let names: std::collections::HashSet<_> = (0..50)
            .map(|i| pseudonym_for_peer_id(&format!("peer-{}", i)))
            .collect();
        assert!(names.len() > 40);
    }
}
