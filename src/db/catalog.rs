//! Procedure catalog for SQLite.
//!
//! SQLite has no server-side procedures, so a catalog maps procedure names to
//! single SQL statements written with `@Name` placeholders:
//!
//! ```text
//! addrecord  => INSERT INTO items (Id, Name) VALUES (@Id, @Name)
//! getrecords => SELECT Id, Name FROM items ORDER BY rowid
//! ```
//!
//! Placeholders are rewritten to positional `?` markers when a procedure is
//! registered and bound by name (ignoring case) when it is called. Calls that
//! do not match the declared arguments fail the way a server procedure would.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ParamSet, Value};
use serde::Deserialize;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, Word};
use std::collections::BTreeMap;
use std::path::Path;

/// One registered procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDefinition {
    pub name: String,
    /// Statement with `?` markers in place of the placeholders
    pub sql: String,
    /// Placeholder names in marker order; a name may repeat
    pub placeholders: Vec<String>,
}

impl ProcedureDefinition {
    pub fn new(name: &str, body: &str) -> GatewayResult<Self> {
        let (sql, placeholders) = rewrite_placeholders(name, body)?;
        Ok(Self {
            name: name.to_string(),
            sql,
            placeholders,
        })
    }

    /// Resolve the positional arguments for a call.
    pub fn bind_arguments<'a>(&self, params: &'a ParamSet) -> GatewayResult<Vec<&'a Value>> {
        for name in params.names() {
            if !self
                .placeholders
                .iter()
                .any(|p| p.eq_ignore_ascii_case(name))
            {
                return Err(GatewayError::remote(
                    &self.name,
                    format!("Procedure {} has no parameter named '@{}'", self.name, name),
                    None,
                ));
            }
        }

        self.placeholders
            .iter()
            .map(|placeholder| {
                params.get(placeholder).ok_or_else(|| {
                    GatewayError::remote(
                        &self.name,
                        format!(
                            "Procedure {} expects parameter '@{}', which was not supplied",
                            self.name, placeholder
                        ),
                        None,
                    )
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    setup: Vec<String>,
    #[serde(default)]
    procedures: BTreeMap<String, String>,
}

/// Registry of SQLite procedures plus setup statements run on connect.
#[derive(Debug, Clone, Default)]
pub struct ProcedureCatalog {
    setup: Vec<String>,
    procedures: BTreeMap<String, ProcedureDefinition>,
}

impl ProcedureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON of the form
    /// `{ "setup": ["CREATE TABLE ..."], "procedures": { "name": "SQL" } }`.
    pub fn from_json(json: &str) -> GatewayResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| GatewayError::invalid_input(format!("Invalid procedure catalog: {}", e)))?;

        let mut catalog = Self::new();
        for statement in file.setup {
            catalog = catalog.with_setup(statement);
        }
        for (name, body) in &file.procedures {
            catalog = catalog.with_procedure(name, body)?;
        }
        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::invalid_input(format!(
                "Cannot read procedure catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn with_setup(mut self, statement: impl Into<String>) -> Self {
        self.setup.push(statement.into());
        self
    }

    /// Register a procedure; a later registration under the same name
    /// (ignoring case) replaces the earlier one.
    pub fn with_procedure(mut self, name: &str, body: &str) -> GatewayResult<Self> {
        let definition = ProcedureDefinition::new(name, body)?;
        self.procedures.insert(name.to_lowercase(), definition);
        Ok(self)
    }

    /// Look up a procedure by name, ignoring case.
    pub fn get(&self, name: &str) -> GatewayResult<&ProcedureDefinition> {
        self.procedures.get(&name.to_lowercase()).ok_or_else(|| {
            GatewayError::remote(
                name,
                format!("Could not find stored procedure '{}'", name),
                None,
            )
        })
    }

    pub fn setup_statements(&self) -> &[String] {
        &self.setup
    }

    /// Procedure names as registered, in case-folded order.
    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procedures.values().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

/// Maps tokenizer line/column locations back to char offsets in the body.
struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    fn new(chars: &[char]) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: chars.len(),
        }
    }

    fn offset(&self, location: Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let start = self.line_starts.get(line).copied().unwrap_or(self.len);
        (start + (location.column as usize).saturating_sub(1)).min(self.len)
    }
}

/// Name of the `@Name` placeholder starting at `tokens[i]`, with the index
/// of its last token. Depending on the dialect the tokenizer yields it as a
/// placeholder, a word, or an `@` directly followed by a word.
fn placeholder_at(tokens: &[TokenWithSpan], i: usize) -> Option<(String, usize)> {
    match &tokens[i].token {
        Token::Placeholder(p)
        | Token::Word(Word {
            value: p,
            quote_style: None,
            ..
        }) if p.len() > 1 && p.starts_with('@') => Some((p[1..].to_string(), i)),
        Token::AtSign => match tokens.get(i + 1) {
            Some(next) if next.span.start == tokens[i].span.end => match &next.token {
                Token::Word(w) if w.quote_style.is_none() => Some((w.value.clone(), i + 1)),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Replace `@Name` placeholders with `?`. String literals, quoted
/// identifiers and comments come out of the tokenizer as single tokens and
/// are copied through untouched.
fn rewrite_placeholders(name: &str, body: &str) -> GatewayResult<(String, Vec<String>)> {
    let dialect = SQLiteDialect {};
    let tokens = Tokenizer::new(&dialect, body)
        .tokenize_with_location()
        .map_err(|e| {
            GatewayError::invalid_input(format!("Cannot tokenize procedure {}: {}", name, e))
        })?;

    let chars: Vec<char> = body.chars().collect();
    let index = LineIndex::new(&chars);
    let mut sql = String::with_capacity(body.len());
    let mut names = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < tokens.len() {
        let Some((placeholder, last)) = placeholder_at(&tokens, i) else {
            i += 1;
            continue;
        };
        let start = index.offset(tokens[i].span.start);
        let end = index.offset(tokens[last].span.end);
        sql.extend(&chars[copied..start]);
        sql.push('?');
        names.push(placeholder);
        copied = end;
        i = last + 1;
    }
    sql.extend(&chars[copied..]);

    Ok((sql, names))
}
