//! Line tokenizer shared by the OBJ and MTL readers.

use std::io::BufRead;

use crate::error::{LoadError, Result};

/// One non-empty, non-comment line split on whitespace.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenLine {
    /// 1-based line number in the source file.
    pub number: usize,
    pub keyword: String,
    pub args: Vec<String>,
}

impl TokenLine {
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }
}

/// Split a single line. Returns `None` for blank and comment-only lines.
/// A token starting with `#` ends the line.
pub fn split_line(number: usize, line: &str) -> Option<TokenLine> {
    let mut tokens = line
        .trim()
        .split_whitespace()
        .take_while(|t| !t.starts_with('#'));
    let keyword = tokens.next()?.to_string();
    Some(TokenLine {
        number,
        keyword,
        args: tokens.map(str::to_string).collect(),
    })
}

/// Iterate over the token lines of `reader`. `file` is only used for error reporting.
pub fn token_lines<'a, R: BufRead + 'a>(
    reader: R,
    file: &'a str,
) -> impl Iterator<Item = Result<TokenLine>> + 'a {
    reader
        .lines()
        .enumerate()
        .filter_map(move |(idx, line)| match line {
            Ok(line) => split_line(idx + 1, &line).map(Ok),
            Err(e) => Some(Err(LoadError::io(file, e))),
        })
}

/// Parse up to `N` floats from `args` into `out`, left to right.
/// Returns `false` if a token was missing or unparsable; components after
/// the failure keep their previous values.
pub fn read_floats<const N: usize>(args: &[String], out: &mut [f32; N]) -> bool {
    for (i, slot) in out.iter_mut().enumerate() {
        match args.get(i).and_then(|t| t.parse::<f32>().ok()) {
            Some(v) => *slot = v,
            None => return false,
        }
    }
    true
}
