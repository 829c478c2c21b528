// ABOUTME: SQL text helpers shared by the extractor and transformer
// ABOUTME: Validates table identifiers and quotes string literals

/// Validate a table name before it is interpolated into SQL.
///
/// Table names come from the configuration file and are spliced into
/// `SELECT`/`UPDATE` text, so they are restricted to plain identifiers:
/// letters, digits, `_`, `$` and `#`, starting with a letter or underscore,
/// optionally qualified once as `schema.table`.
///
/// # Examples
///
/// ```
/// # use tunnel_replicator::utils::validate_table_name;
/// assert!(validate_table_name("T1").is_ok());
/// assert!(validate_table_name("ADVA.PULP_STATUS").is_ok());
/// assert!(validate_table_name("1table").is_err());
/// assert!(validate_table_name("t; DROP TABLE x").is_err());
/// ```
pub fn validate_table_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("table name cannot be empty".to_string());
    }
    if trimmed != name {
        return Err("table name has leading or trailing whitespace".to_string());
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return Err("at most one schema qualifier is allowed".to_string());
    }

    for part in parts {
        validate_identifier_part(part)?;
    }
    Ok(())
}

fn validate_identifier_part(part: &str) -> Result<(), String> {
    // Oracle and PostgreSQL both cap unquoted identifiers well below this
    if part.len() > 128 {
        return Err(format!(
            "identifier '{}' exceeds 128 characters",
            sanitize_identifier(part)
        ));
    }

    let mut chars = part.chars();
    match chars.next() {
        None => return Err("empty identifier segment".to_string()),
        Some(c) if !c.is_ascii_alphabetic() && c != '_' => {
            return Err(format!(
                "identifier '{}' must start with a letter or underscore",
                sanitize_identifier(part)
            ));
        }
        Some(_) => {}
    }

    for (i, c) in part.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '_' | '$' | '#') {
            return Err(format!(
                "identifier '{}' contains invalid character '{}' at position {}",
                sanitize_identifier(part),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            ));
        }
    }
    Ok(())
}

/// Strip control characters and cap length so identifiers are safe to log.
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Quote a SQL string literal, doubling embedded single quotes.
///
/// ```
/// use tunnel_replicator::utils::quote_literal;
/// assert_eq!(quote_literal("2024-01-01 00:00:00"), "'2024-01-01 00:00:00'");
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push('\'');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}
