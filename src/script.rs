/// One statement taken from a script: trimmed, non-empty, numbered from 1 in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub ordinal: usize,
    pub text: String,
}

/// Splits `script` on every `;`.
///
/// The split knows nothing about SQL: a `;` inside a string literal or a `--` comment still ends
/// the statement. Pieces that are empty once trimmed are dropped.
pub fn split_statements(script: &str) -> Vec<Statement> {
    script
        .split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(i, text)| Statement {
            ordinal: i + 1,
            text: text.to_string(),
        })
        .collect()
}
