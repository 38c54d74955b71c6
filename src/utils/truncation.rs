const MAX_ERROR_LENGTH: usize = 2_000;

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Keep the tail of stderr; tools print the actual failure last.
pub fn truncate_error(error: &str) -> String {
    let error = error.trim();
    if error.len() <= MAX_ERROR_LENGTH {
        error.to_string()
    } else {
        let start = ceil_boundary(error, error.len() - MAX_ERROR_LENGTH);
        format!("...{}", &error[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_error_untouched() {
        assert_eq!(truncate_error("  boom \n"), "boom");
    }

    #[test]
    fn test_long_error_keeps_tail() {
        let long = format!("{}FATAL", "x".repeat(5_000));
        let out = truncate_error(&long);
        assert!(out.starts_with("..."));
        assert!(out.ends_with("FATAL"));
        assert!(out.len() <= MAX_ERROR_LENGTH + 3);
    }

    #[test]
    fn test_long_error_multibyte() {
        let long = "ü".repeat(MAX_ERROR_LENGTH);
        let out = truncate_error(&long);
        assert!(out.starts_with("..."));
        assert!(out.len() <= MAX_ERROR_LENGTH + 4);
    }
}
