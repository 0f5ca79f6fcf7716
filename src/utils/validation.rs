use crate::services::error::ExchangeError;

/// Sanitizes a submitted filename for display purposes.
///
/// The result is never used to build a storage path (stored files are named
/// after their token), but it still travels back to clients in headers and
/// JSON, so path components and reserved characters are stripped here.
pub fn sanitize_filename(filename: &str) -> Result<String, ExchangeError> {
    // Keep only the last path component, whichever separator was used
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");

    if name.is_empty() {
        return Err(ExchangeError::InvalidInput(
            "filename cannot be empty".to_string(),
        ));
    }

    if filename.contains("..") {
        tracing::warn!("path traversal attempt detected: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.starts_with('.') {
        return Err(ExchangeError::InvalidInput(
            "hidden files are not allowed".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Splits `report.txt` into `("report", ".txt")`. A name without a dot has
/// an empty extension.
pub fn split_name(file_name: &str) -> (String, String) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (file_name[..idx].to_string(), file_name[idx..].to_string()),
        _ => (file_name.to_string(), String::new()),
    }
}

/// Full validation for a submitted file name: sanitized, and carrying the
/// single accepted extension. Returns the sanitized name.
pub fn validate_submission(
    filename: &str,
    accepted_extension: &str,
) -> Result<String, ExchangeError> {
    let sanitized = sanitize_filename(filename)?;

    let (base, extension) = split_name(&sanitized);
    if base.is_empty() || !extension.eq_ignore_ascii_case(accepted_extension) {
        return Err(ExchangeError::InvalidInput(format!(
            "only {} files are accepted",
            accepted_extension
        )));
    }

    Ok(sanitized)
}
