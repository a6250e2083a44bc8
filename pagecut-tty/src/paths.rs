use std::mem;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropError {
    #[error("no file path in the dropped text")]
    Empty,
    #[error("unterminated quote in the dropped text")]
    UnterminatedQuote,
    #[error("{0} is not a local file")]
    NotLocal(String),
}

/// Splits text pasted by a terminal when files are dropped onto it.
///
/// Terminals disagree on the format: some quote each path, some escape
/// spaces with backslashes, some send `file://` URLs. Paths are separated
/// by unquoted whitespace.
pub fn parse_dropped_paths(text: &str) -> Result<Vec<PathBuf>, DropError> {
    let paths = tokenize(text)?
        .into_iter()
        .map(|token| to_path(&token))
        .collect::<Result<Vec<_>, _>>()?;
    if paths.is_empty() {
        return Err(DropError::Empty);
    }
    Ok(paths)
}

/// The first dropped path; the rest of a multi-file drop is ignored.
pub fn first_dropped_path(text: &str) -> Result<PathBuf, DropError> {
    let mut paths = parse_dropped_paths(text).inspect_err(|err| {
        debug!(%err, len = text.len(), "rejected dropped text");
    })?;
    if paths.len() > 1 {
        debug!(dropped = paths.len(), "opening the first dropped path");
    }
    Ok(paths.swap_remove(0))
}

/// A path typed into the open prompt. Unquoted spaces are kept as part of
/// the name.
pub fn parse_typed_path(text: &str) -> Option<PathBuf> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    to_path(unquoted).ok()
}

fn to_path(token: &str) -> Result<PathBuf, DropError> {
    if !token.starts_with("file://") {
        return Ok(PathBuf::from(token));
    }
    Url::parse(token)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| DropError::NotLocal(token.to_string()))
}

fn tokenize(text: &str) -> Result<Vec<String>, DropError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                        in_token = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(DropError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
