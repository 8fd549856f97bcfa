//! Lexical SQL scanning.
//!
//! Uses the sqlparser tokenizer with the PostgreSQL dialect to find statement
//! terminators. Nothing is parsed, so PostGIS and pg_trgm calls need no
//! grammar support. String literals (`'...'`, `E'...'`, `$$...$$`), quoted
//! identifiers and comments are single tokens, so a `;` inside them never
//! ends a statement.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithLocation, Tokenizer, TokenizerError};

/// Error raised when SQL text cannot be tokenized.
pub type ScanError = TokenizerError;

/// The first statement of some SQL text and what follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstStatement<'a> {
    /// Text before the first terminator, untrimmed.
    pub statement: &'a str,

    /// Text after the terminator, present only when it holds more than
    /// whitespace, comments or extra terminators.
    pub trailing: Option<&'a str>,
}

fn tokenize(sql: &str) -> Result<Vec<TokenWithLocation>, ScanError> {
    let dialect = PostgreSqlDialect {};
    Tokenizer::new(&dialect, sql).tokenize_with_location()
}

/// Maps a tokenizer location (1-based line and character column) to a byte offset.
fn byte_offset(sql: &str, location: &Location) -> Option<usize> {
    let (mut line, mut column) = (1u64, 1u64);
    for (idx, c) in sql.char_indices() {
        if line == location.line && column == location.column {
            return Some(idx);
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    None
}

/// Returns the index of the first terminator token and its byte offset.
fn locate_terminator(
    sql: &str,
    tokens: &[TokenWithLocation],
) -> Result<Option<(usize, usize)>, ScanError> {
    let Some(index) = tokens.iter().position(|t| t.token == Token::SemiColon) else {
        return Ok(None);
    };

    let location = &tokens[index].location;
    match byte_offset(sql, location) {
        Some(offset) if sql[offset..].starts_with(';') => Ok(Some((index, offset))),
        _ => Err(TokenizerError {
            message: "could not locate statement terminator".to_string(),
            location: location.clone(),
        }),
    }
}

fn is_filler(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_) | Token::SemiColon | Token::EOF)
}

/// Returns the byte offset of the first statement terminator, if any.
///
/// Fails when the text does not tokenize, e.g. an unterminated literal.
pub fn find_terminator(sql: &str) -> Result<Option<usize>, ScanError> {
    let tokens = tokenize(sql)?;
    Ok(locate_terminator(sql, &tokens)?.map(|(_, offset)| offset))
}

/// Splits SQL at the first terminator.
///
/// The whole text must tokenize. The terminator itself belongs to neither part.
pub fn split_first_statement(sql: &str) -> Result<FirstStatement<'_>, ScanError> {
    let tokens = tokenize(sql)?;

    let Some((index, offset)) = locate_terminator(sql, &tokens)? else {
        return Ok(FirstStatement {
            statement: sql,
            trailing: None,
        });
    };

    let has_more = tokens[index + 1..].iter().any(|t| !is_filler(&t.token));
    Ok(FirstStatement {
        statement: &sql[..offset],
        trailing: has_more.then(|| &sql[offset + 1..]),
    })
}

/// Returns the text before the first terminator of a model reply.
///
/// Unlike [`split_first_statement`], text after a terminator may fail to
/// tokenize (an apostrophe in trailing prose, say). Each `;` is tried in
/// order and only the text up to it is tokenized; the first prefix that
/// tokenizes and ends a statement wins. Without such a prefix the whole
/// text must tokenize.
pub fn leading_statement(sql: &str) -> Result<&str, ScanError> {
    for (idx, _) in sql.match_indices(';') {
        let prefix = &sql[..=idx];
        let Ok(tokens) = tokenize(prefix) else {
            continue;
        };
        if let Some((_, offset)) = locate_terminator(prefix, &tokens)? {
            return Ok(&sql[..offset]);
        }
    }

    tokenize(sql)?;
    Ok(sql)
}

/// Returns true if the first token, after whitespace and comments, is the
/// `SELECT` or `WITH` keyword. Text that does not tokenize is never read-only.
pub fn starts_with_read_only_keyword(sql: &str) -> bool {
    let Ok(tokens) = tokenize(sql) else {
        return false;
    };

    match tokens.iter().map(|t| &t.token).find(|t| !is_filler(t)) {
        Some(Token::Word(word)) => {
            word.quote_style.is_none() && matches!(word.keyword, Keyword::SELECT | Keyword::WITH)
        }
        _ => false,
    }
}
