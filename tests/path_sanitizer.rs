use std::path::Path;

use scanwarden::errors::WardenError;
use scanwarden::utils::{sanitize_path_component, validate_output_path};

fn adversarial_corpus() -> Vec<String> {
    let mut corpus: Vec<String> = [
        "", ".", "..", "...", "....", "../", "..\\", "../../../etc/passwd",
        "..\\..\\windows\\system32", "/etc/shadow", "\\\\server\\share", "a/../b",
        "foo/./bar", ".../...//", "%2e%2e%2f", "%2e%2e/%2e%2e/", "..%2f..%2f",
        "..%c0%af", "..%255c", "\0", "name\0.txt", "..\0/", "\u{202E}txt.exe",
        "a\u{200B}..\u{200B}b", "\u{FEFF}..", "\u{2215}etc\u{2215}passwd",
        "\u{FF0F}etc", "\u{FF0E}\u{FF0E}\u{FF0F}", "\u{2025}/x", "\u{2024}\u{2024}",
        "\u{FF3C}..\u{FF3C}", "CON", "con.txt", "NUL", "com1", "LPT9.log", "AUX ",
        " . . ", ". .", "..  ..", "trailing.", "trailing ...", ".hidden", "..hidden",
        "name:stream", "a<b>c|d?e*f\"g", "\t\n\r", "🦀/../🦀", "\u{1F600}..\u{1F600}",
        "file:///etc/passwd", "https://evil.example.com/../../x", "C:\\Windows",
        "registry.io/org/app@sha256:abc", "ctx/../../ns",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    corpus.push("../".repeat(200));
    corpus.push(".".repeat(1000));
    corpus.push("é".repeat(300));
    corpus.push(format!("{}..", "a".repeat(254)));
    corpus.push(format!("{}/..", "界".repeat(90)));
    corpus
}

#[test]
fn test_sanitize_never_yields_traversal() {
    for input in adversarial_corpus() {
        let safe = sanitize_path_component(&input);
        assert!(!safe.is_empty(), "empty for {:?}", input);
        assert!(!safe.contains(".."), "{:?} -> {:?}", input, safe);
        assert!(!safe.contains('/'), "{:?} -> {:?}", input, safe);
        assert!(!safe.contains('\\'), "{:?} -> {:?}", input, safe);
        assert!(!safe.contains('\0'), "{:?} -> {:?}", input, safe);
        assert!(!safe.starts_with('.'), "{:?} -> {:?}", input, safe);
        assert!(safe.len() <= 255, "{:?} -> {} bytes", input, safe.len());
        assert_ne!(safe, ".");
    }
}

#[test]
fn test_sanitize_is_stable() {
    for input in adversarial_corpus() {
        let once = sanitize_path_component(&input);
        assert_eq!(sanitize_path_component(&once), once, "input {:?}", input);
    }
}

#[test]
fn test_sanitized_names_stay_inside_base() {
    let dir = tempfile::tempdir().unwrap();
    for input in adversarial_corpus() {
        let safe = sanitize_path_component(&input);
        let resolved = validate_output_path(dir.path(), Path::new(&safe))
            .unwrap_or_else(|e| panic!("{:?} -> {:?}: {}", input, safe, e));
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
    }
}

#[test]
fn test_validate_accepts_base_and_descendants() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();

    assert_eq!(validate_output_path(dir.path(), dir.path()).unwrap(), base);
    assert_eq!(
        validate_output_path(dir.path(), Path::new("individual-repos/app")).unwrap(),
        base.join("individual-repos/app")
    );
    assert_eq!(
        validate_output_path(dir.path(), &dir.path().join("a/./b/../c")).unwrap(),
        base.join("a/c")
    );
}

#[test]
fn test_validate_rejects_escapes() {
    let dir = tempfile::tempdir().unwrap();
    for candidate in ["..", "../sibling", "a/../../x", "/etc/passwd", "/"] {
        let err = validate_output_path(dir.path(), Path::new(candidate)).unwrap_err();
        assert!(matches!(err, WardenError::PathTraversal { .. }), "{}: {}", candidate, err);
        assert_eq!(err.exit_code(), 5);
    }
}

#[test]
fn test_validate_rejects_prefix_sibling() {
    // "/tmp/xyz-evil" starts with the string "/tmp/xyz" but is not inside it.
    let parent = tempfile::tempdir().unwrap();
    let base = parent.path().join("results");
    let sibling = parent.path().join("results-evil");
    std::fs::create_dir(&base).unwrap();
    std::fs::create_dir(&sibling).unwrap();
    assert!(validate_output_path(&base, &sibling).is_err());
}

#[test]
fn test_validate_missing_base() {
    let err = validate_output_path(Path::new("/nonexistent/scanwarden-base"), Path::new("x")).unwrap_err();
    assert!(matches!(err, WardenError::Config(_)));
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_rejected() {
    use std::os::unix::fs::symlink;

    let base = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    symlink(outside.path(), base.path().join("link")).unwrap();

    let err = validate_output_path(base.path(), Path::new("link/report.json")).unwrap_err();
    assert!(matches!(err, WardenError::PathTraversal { .. }));
    assert!(validate_output_path(base.path(), Path::new("link")).is_err());
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_rejected() {
    use std::os::unix::fs::symlink;

    let base = tempfile::tempdir().unwrap();
    symlink("/nonexistent/scanwarden-target", base.path().join("dead")).unwrap();
    assert!(validate_output_path(base.path(), Path::new("dead/out.json")).is_err());
}

#[cfg(unix)]
#[test]
fn test_internal_symlink_allowed() {
    use std::os::unix::fs::symlink;

    let base = tempfile::tempdir().unwrap();
    std::fs::create_dir(base.path().join("real")).unwrap();
    symlink(base.path().join("real"), base.path().join("alias")).unwrap();

    let resolved = validate_output_path(base.path(), Path::new("alias/out.json")).unwrap();
    assert_eq!(resolved, base.path().canonicalize().unwrap().join("real/out.json"));
}
