/// Log sanitization helpers
///
/// Payment and booking identifiers are shortened before logging so a leaked
/// log file cannot be joined against the full database.

/// Shorten an opaque id for logs.
///
/// Format: "abc12345...90ef" (first 8 + last 4 chars). Short ids pass
/// through unchanged; they carry too little to correlate.
pub fn sanitize_id(id: &str) -> String {
    if id.len() <= 12 {
        return id.to_string();
    }
    format!("{}...{}", &id[..8], &id[id.len() - 4..])
}

/// Shorten a booking reference for logs, keeping the human prefix.
pub fn sanitize_booking_id(booking_id: &str) -> String {
    sanitize_id(booking_id)
}

/// Round an amount for logs so exact values cannot identify a transaction.
pub fn sanitize_amount(amount_minor: i64) -> String {
    let major = amount_minor as f64 / 100.0;
    format!("~{major:.0}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_ids_shortened() {
        let id = "a3f8c2e1-77b4-4f09-9c1d-5e2a8b901234";
        let short = sanitize_id(id);
        assert!(short.starts_with("a3f8c2e1"));
        assert!(short.ends_with("1234"));
        assert!(short.len() < id.len());
    }

    #[test]
    fn test_short_ids_untouched() {
        assert_eq!(sanitize_id("BK-1"), "BK-1");
    }

    #[test]
    fn test_amount_rounded() {
        assert_eq!(sanitize_amount(45_000), "~450");
    }
}
