//! Statement splitting for drivers without native multi-statement results

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split a multi-statement SQL string into individual statements.
///
/// Splits on `;` outside string literals (`'...'`, `"..."`, doubled quotes
/// escape) and comments (`-- ...`, `/* ... */`). Statements are trimmed and
/// empty ones dropped, so a trailing separator is harmless.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut state = Scan::Code;
    let mut start = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|(_, c)| *c);
        state = match state {
            Scan::Code => match c {
                '\'' | '"' => Scan::Quoted(c),
                '-' if next == Some('-') => {
                    chars.next();
                    Scan::LineComment
                }
                '/' if next == Some('*') => {
                    chars.next();
                    Scan::BlockComment
                }
                ';' => {
                    push_trimmed(&mut statements, &sql[start..idx]);
                    start = idx + 1;
                    Scan::Code
                }
                _ => Scan::Code,
            },
            Scan::Quoted(quote) if c == quote => {
                if next == Some(quote) {
                    chars.next();
                    Scan::Quoted(quote)
                } else {
                    Scan::Code
                }
            }
            Scan::LineComment if c == '\n' => Scan::Code,
            Scan::BlockComment if c == '*' && next == Some('/') => {
                chars.next();
                Scan::Code
            }
            other => other,
        };
    }

    push_trimmed(&mut statements, &sql[start..]);
    statements
}

fn push_trimmed(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let statements = split_statements("SELECT 1; SELECT 2; SELECT 3");

        assert_eq!(statements, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_statements_with_whitespace() {
        let statements = split_statements("  SELECT 1  ;\n\n  SELECT 2  ;  ");

        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_statements_preserves_string_literals() {
        let sql = r#"SELECT 'hello; world'; SELECT "semi;colon""#;
        let statements = split_statements(sql);

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "SELECT 'hello; world'");
        assert_eq!(statements[1], r#"SELECT "semi;colon""#);
    }

    #[test]
    fn test_split_statements_doubled_quote_escape() {
        let statements = split_statements("SELECT 'it''s; fine'; SELECT 2");

        assert_eq!(statements, vec!["SELECT 'it''s; fine'", "SELECT 2"]);
    }

    #[test]
    fn test_split_statements_ignores_comments() {
        let sql = "SELECT 1; -- a; b\nSELECT 2; /* c; d */ SELECT 3";
        let statements = split_statements(sql);

        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "SELECT 1");
        assert!(statements[1].ends_with("SELECT 2"));
        assert!(statements[2].ends_with("SELECT 3"));
    }

    #[test]
    fn test_split_statements_empty_input() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("   \n\t  ;; ").is_empty());
    }
}
