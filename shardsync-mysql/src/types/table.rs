use std::fmt;

use thiserror::Error;

/// Errors that can occur while parsing a qualified table identifier.
#[derive(Debug, Error)]
pub enum TableIdentError {
    #[error("invalid qualified table identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// A fully qualified MySQL table name consisting of a schema and table name.
///
/// The backtick-quoted form (`` `db`.`tbl` ``) is used as the stable table
/// identity in persisted state and as the key of per-source DDL sequences, so
/// it has to survive a generate/parse round trip even for names containing
/// backticks or dots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    /// The schema (database) containing the table.
    pub schema: String,
    /// The name of the table within the schema.
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the table name as a properly quoted MySQL identifier.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }

    /// Parses a backtick-quoted identifier produced by
    /// [`TableName::as_quoted_identifier`] back into its components.
    pub fn from_quoted_identifier(ident: &str) -> Result<TableName, TableIdentError> {
        let invalid = || TableIdentError::InvalidIdentifier(ident.to_string());

        let (schema, rest) = unquote_prefix(ident).ok_or_else(invalid)?;
        let rest = rest.strip_prefix('.').ok_or_else(invalid)?;
        let (name, rest) = unquote_prefix(rest).ok_or_else(invalid)?;
        if !rest.is_empty() {
            return Err(invalid());
        }

        Ok(TableName::new(schema, name))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// Quotes a MySQL identifier, doubling embedded backticks.
pub fn quote_identifier(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Consumes one backtick-quoted identifier from the front of `input`, returning
/// the unescaped identifier and the remaining text.
fn unquote_prefix(input: &str) -> Option<(String, &str)> {
    let mut chars = input.char_indices();
    let (_, '`') = chars.next()? else {
        return None;
    };

    let mut ident = String::new();
    while let Some((idx, ch)) = chars.next() {
        if ch != '`' {
            ident.push(ch);
            continue;
        }
        // A doubled backtick is an escaped literal backtick.
        match input[idx + 1..].chars().next() {
            Some('`') => {
                ident.push('`');
                chars.next();
            }
            _ => return Some((ident, &input[idx + 1..])),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_identifier() {
        let table = TableName::new("shard_db_01", "orders");
        assert_eq!(table.as_quoted_identifier(), "`shard_db_01`.`orders`");
    }

    #[test]
    fn test_quoted_identifier_round_trip() {
        let table = TableName::new("shard_db_01", "orders");
        let parsed = TableName::from_quoted_identifier(&table.as_quoted_identifier()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_quoted_identifier_round_trip_with_special_characters() {
        let table = TableName::new("we`ird", "na.me");
        let quoted = table.as_quoted_identifier();
        assert_eq!(quoted, "`we``ird`.`na.me`");

        let parsed = TableName::from_quoted_identifier(&quoted).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_parse_rejects_malformed_identifiers() {
        assert!(TableName::from_quoted_identifier("db.tbl").is_err());
        assert!(TableName::from_quoted_identifier("`db`").is_err());
        assert!(TableName::from_quoted_identifier("`db`.`tbl").is_err());
        assert!(TableName::from_quoted_identifier("`db`.`tbl`x").is_err());
        assert!(TableName::from_quoted_identifier("").is_err());
    }

    #[test]
    fn test_display_is_unquoted() {
        let table = TableName::new("db", "tbl");
        assert_eq!(table.to_string(), "db.tbl");
    }
}
