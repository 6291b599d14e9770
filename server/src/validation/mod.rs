//! Request-level validation shared by handlers
//!
//! Handlers validate wire input here before anything reaches the ledger;
//! the ledger re-checks its own invariants but never sees raw strings.

use ledger::{
    DesiredResolution, DisputeCategory, EvidenceFile, MAX_EVIDENCE_FILES,
    MAX_EVIDENCE_FILE_SIZE,
};

/// Parse a dispute category, naming the accepted values on failure.
pub fn parse_category(raw: &str) -> Result<DisputeCategory, String> {
    DisputeCategory::from_str(raw).ok_or_else(|| {
        format!(
            "unknown dispute category '{raw}' (expected one of: quality, incomplete, \
             noshow, late, communication, other)"
        )
    })
}

/// Parse an optional desired resolution.
pub fn parse_desired_resolution(raw: Option<&str>) -> Result<Option<DesiredResolution>, String> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => DesiredResolution::from_str(s).map(Some).ok_or_else(|| {
            format!(
                "unknown desired resolution '{s}' (expected one of: full_refund, \
                 partial_refund, redo_work, mediation)"
            )
        }),
    }
}

/// Validate evidence descriptors from the wire and convert them.
pub fn validate_evidence(files: &[(String, String, i64)]) -> Result<Vec<EvidenceFile>, String> {
    if files.len() > MAX_EVIDENCE_FILES {
        return Err(format!(
            "at most {MAX_EVIDENCE_FILES} evidence files allowed, got {}",
            files.len()
        ));
    }

    let mut out = Vec::with_capacity(files.len());
    for (name, mime_type, size) in files {
        if name.trim().is_empty() {
            return Err("evidence file name is empty".to_string());
        }
        if !EvidenceFile::is_allowed_mime_type(mime_type) {
            return Err(format!(
                "evidence file '{name}' has unsupported type '{mime_type}' \
                 (accepted: images, PDF, plain text)"
            ));
        }
        if *size <= 0 || *size > MAX_EVIDENCE_FILE_SIZE {
            return Err(format!(
                "evidence file '{name}' size {size} outside 1..={MAX_EVIDENCE_FILE_SIZE} bytes"
            ));
        }
        out.push(EvidenceFile {
            name: name.clone(),
            mime_type: mime_type.clone(),
            size_bytes: *size,
        });
    }
    Ok(out)
}
