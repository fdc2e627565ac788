//! Parameter inlining
//!
//! A merged batch is sent as one command string, so each query's bound
//! parameters are rendered as SQL literals in place of their placeholders
//! before the query is queued.
//!
//! Only a small set of parameter types have a rendering rule. Anything else
//! is rejected at registration time rather than sent to the server in a form
//! that might be misread. Values are rendered without any server-side
//! binding, so this path is meant for trusted values.

use std::collections::HashMap;
use std::sync::LazyLock;

use deferred_core::Value;
use regex::Regex;

use crate::{DeferredError, DeferredResult, ParamType, SqlCommand, SqlParameter};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@:][a-zA-Z_][a-zA-Z0-9_]*").expect("valid regex"));

static SKIP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*[\s\S]*?\*/"#).expect("valid regex")
});

/// Render a command's parameters into its SQL text
pub fn inline_command(command: &SqlCommand) -> DeferredResult<String> {
    inline_parameters(&command.sql, &command.parameters)
}

/// Replace every bound placeholder in `sql` with its rendered literal.
///
/// Placeholders are whole `@name` / `:name` tokens outside string literals
/// and comments, so `@p1` never matches inside `@p10`. Tokens with no
/// binding are left untouched. Every binding is rendered before any text is
/// substituted, so an unsupported binding fails the whole call even when its
/// placeholder does not occur in the SQL.
pub fn inline_parameters(sql: &str, parameters: &[SqlParameter]) -> DeferredResult<String> {
    let mut literals: HashMap<String, String> = HashMap::with_capacity(parameters.len());
    for parameter in parameters {
        literals.insert(parameter.placeholder(), render_literal(parameter)?);
    }
    if literals.is_empty() {
        return Ok(sql.to_string());
    }

    let skip_ranges = build_skip_ranges(sql);
    let is_skipped = |pos: usize| skip_ranges.iter().any(|(s, e)| pos >= *s && pos < *e);

    let mut result = String::with_capacity(sql.len());
    let mut last_end = 0;
    for m in PLACEHOLDER_REGEX.find_iter(sql) {
        if is_skipped(m.start()) || continues_token(sql, m.start()) {
            continue;
        }
        if let Some(literal) = literals.get(m.as_str()) {
            result.push_str(&sql[last_end..m.start()]);
            result.push_str(literal);
            last_end = m.end();
        }
    }
    result.push_str(&sql[last_end..]);

    tracing::trace!(
        parameters = parameters.len(),
        sql_preview = %sql.chars().take(80).collect::<String>(),
        "inlined query parameters"
    );
    Ok(result)
}

/// Render one binding as a SQL literal
pub fn render_literal(parameter: &SqlParameter) -> DeferredResult<String> {
    let param_type = parameter.param_type;
    let value = &parameter.value;
    let mismatch = || DeferredError::ParameterTypeMismatch {
        name: parameter.name.clone(),
        param_type,
        found: value.type_name(),
    };

    let literal = match param_type {
        ParamType::Bit | ParamType::Int | ParamType::BigInt | ParamType::Float | ParamType::Text
            if value.is_null() =>
        {
            "NULL".to_string()
        }
        ParamType::Bit => match value.as_bool() {
            Some(true) => "'1'".to_string(),
            Some(false) => "'0'".to_string(),
            None => return Err(mismatch()),
        },
        ParamType::Text => match value {
            Value::String(text) => format!("'{}'", text.replace('\'', "''")),
            _ => return Err(mismatch()),
        },
        ParamType::Int => {
            let number = value.as_i64().ok_or_else(mismatch)?;
            i32::try_from(number).map_err(|_| mismatch())?.to_string()
        }
        ParamType::BigInt => value.as_i64().ok_or_else(mismatch)?.to_string(),
        // `{:?}` keeps a fractional part on whole numbers (`2.0`, not `2`)
        ParamType::Float => format!(
            "{:?}",
            value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(mismatch)?
        ),
        other => {
            return Err(DeferredError::UnsupportedParameterType {
                param_type: other,
                value: value.clone(),
            });
        }
    };
    Ok(literal)
}

/// Prepare one statement for joining into a batch.
///
/// Trailing whitespace and `;` terminators are stripped. A statement that
/// ends in a `--` comment keeps a newline after it, so the batch separator
/// is not swallowed by the comment.
pub(crate) fn trim_statement(sql: &str) -> String {
    let trimmed = sql.trim_end_matches(|c: char| c.is_whitespace() || c == ';');
    let ends_in_line_comment = SKIP_REGEX
        .find_iter(trimmed)
        .last()
        .is_some_and(|m| m.end() == trimmed.len() && m.as_str().starts_with("--"));

    if ends_in_line_comment {
        format!("{}\n", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Whether the sigil at `start` is glued to a preceding identifier or sigil
/// (`a@b`, `@@ROWCOUNT`, `x::int`).
fn continues_token(sql: &str, start: usize) -> bool {
    sql[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '@' || c == ':')
}

/// Byte ranges covered by string literals and comments
fn build_skip_ranges(sql: &str) -> Vec<(usize, usize)> {
    SKIP_REGEX
        .find_iter(sql)
        .map(|m| (m.start(), m.end()))
        .collect()
}
