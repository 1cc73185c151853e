use sha2::Digest;
use std::path::Path;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// True when `value` is a hex digest of exactly `len` characters.
pub fn is_hex_digest(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

pub fn join_names<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_digest_requires_exact_length() {
        assert!(is_hex_digest("d41d8cd98f00b204e9800998ecf8427e", 32));
        assert!(is_hex_digest("D41D8CD98F00B204E9800998ECF8427E", 32));
        assert!(!is_hex_digest("d41d8cd98f00b204e9800998ecf8427", 32));
        assert!(!is_hex_digest("z41d8cd98f00b204e9800998ecf8427e", 32));
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn display_path_strips_base() {
        let base = Path::new("/tmp/out");
        let path = Path::new("/tmp/out/final/a.bed.gz");
        assert_eq!(display_path(path, Some(base)), "final/a.bed.gz");
        assert_eq!(display_path(path, None), "/tmp/out/final/a.bed.gz");
    }
}
