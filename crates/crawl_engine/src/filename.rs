use sha2::{Digest, Sha256};

const MAX_TITLE_LEN: usize = 80;

/// Windows-safe, per-article directory name: `{sanitized_title}--{short_hash(url)}`.
///
/// The hash keeps two articles with the same title in separate directories.
pub fn article_dir_name(title: &str, url: &str) -> String {
    format!("{}--{}", sanitize_title(title), short_hash(url))
}

/// Windows-safe folder name for a whole catalog, e.g. a category label.
pub fn catalog_dir_name(name: &str) -> String {
    sanitize_title(name)
}

fn sanitize_title(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut cleaned = compacted.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    truncate_on_char_boundary(&mut cleaned, MAX_TITLE_LEN);
    // Truncation can expose a trailing dot or space, which Windows strips.
    let mut final_name = cleaned.trim_end_matches(&['.', ' '][..]).to_string();
    if final_name.is_empty() {
        final_name = "untitled".to_string();
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn truncate_on_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::{article_dir_name, catalog_dir_name};

    #[test]
    fn dir_name_is_deterministic_and_safe() {
        let name = article_dir_name("My: Title?/Bad", "https://example.com/a/1");
        assert!(name.starts_with("My_ Title_Bad--"));
        assert_eq!(name.len(), "My_ Title_Bad--".len() + 8);
        assert_eq!(name, article_dir_name("My: Title?/Bad", "https://example.com/a/1"));
    }

    #[test]
    fn same_title_different_urls_get_different_dirs() {
        let a = article_dir_name("Gallery", "https://example.com/a/1");
        let b = article_dir_name("Gallery", "https://example.com/a/2");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_reserved_and_long_titles() {
        assert!(article_dir_name("  ..  ", "u").starts_with("untitled--"));
        assert_eq!(catalog_dir_name("con"), "con_");
        let long = "画".repeat(60);
        let name = catalog_dir_name(&long);
        assert!(name.len() <= 80);
        assert!(name.chars().all(|c| c == '画'));
    }
}
