//! Text dumps of a model
//!
//! Model dump layout:
//!
//! ```text
//! <message>
//! <K> <D>
//!
//! {α_1; α_2; ...; α_K}
//!
//! {β_11; ...; β_1V}
//! ...
//! {β_K1; ...; β_KV}
//!
//! ```
//!
//! The log dump has the same two header lines, then every γ_d, then every φ_d
//! (one row per topic) with each document's block followed by a blank line.

use crate::error::{LdaError, Result};
use crate::models::model::LdaModel;
use ndarray::{Array1, Array2, ArrayView1};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Global parameters read back from a model dump
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedModel {
    pub message: String,
    pub n_topics: usize,
    pub n_documents: usize,
    pub alpha: Array1<f64>,
    pub beta: Array2<f64>,
}

/// `{a; b; c}`, every value in exponent notation so it parses back exactly
pub fn format_vector(values: ArrayView1<f64>) -> String {
    let body: Vec<String> = values.iter().map(|v| format!("{:e}", v)).collect();
    format!("{{{}}}", body.join("; "))
}

/// Parse a `{a; b; c}` vector; `line` is used for error reporting
pub fn parse_vector(text: &str, line: usize) -> Result<Array1<f64>> {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| LdaError::parse(line, "vector must be enclosed in braces"))?;

    if inner.trim().is_empty() {
        return Ok(Array1::zeros(0));
    }

    inner
        .split(';')
        .map(|field| {
            let field = field.trim();
            field
                .parse::<f64>()
                .map_err(|_| LdaError::parse(line, format!("invalid number '{}'", field)))
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

/// Write the model dump to any writer
pub fn write_model<W: Write>(model: &LdaModel, message: &str, mut out: W) -> Result<()> {
    writeln!(out, "{}", message)?;
    writeln!(out, "{} {}", model.n_topics(), model.n_documents())?;
    writeln!(out)?;
    writeln!(out, "{}", format_vector(model.alpha().view()))?;
    writeln!(out)?;
    for row in model.beta().rows() {
        writeln!(out, "{}", format_vector(row))?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write the model dump to `path`
pub fn dump_model<P: AsRef<Path>>(model: &LdaModel, path: P, message: &str) -> Result<()> {
    let file = File::create(path)?;
    write_model(model, message, BufWriter::new(file))
}

/// Write γ and φ of every document to any writer
pub fn write_log<W: Write>(model: &LdaModel, message: &str, mut out: W) -> Result<()> {
    writeln!(out, "{}", message)?;
    writeln!(out, "{} {}", model.n_topics(), model.n_documents())?;
    writeln!(out)?;
    for gamma in model.gammas() {
        writeln!(out, "{}", format_vector(gamma.view()))?;
    }
    writeln!(out)?;
    for phi in model.phis() {
        for row in phi.rows() {
            writeln!(out, "{}", format_vector(row))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the log dump to `path`
pub fn dump_log<P: AsRef<Path>>(model: &LdaModel, path: P, message: &str) -> Result<()> {
    let file = File::create(path)?;
    write_log(model, message, BufWriter::new(file))
}

/// Parse a model dump. Any deviation from the layout is a parse error with
/// the 1-based line number; nothing partial is returned.
pub fn parse_model(text: &str) -> Result<PersistedModel> {
    let lines: Vec<&str> = text.lines().collect();
    let line_at = |index: usize| -> Result<&str> {
        lines
            .get(index)
            .copied()
            .ok_or_else(|| LdaError::parse(index + 1, "unexpected end of input"))
    };
    let expect_blank = |index: usize| -> Result<()> {
        if line_at(index)?.trim().is_empty() {
            Ok(())
        } else {
            Err(LdaError::parse(index + 1, "expected a blank line"))
        }
    };

    let message = line_at(0)?.to_string();

    let counts: Vec<&str> = line_at(1)?.split_whitespace().collect();
    if counts.len() != 2 {
        return Err(LdaError::parse(2, "expected '<topics> <documents>'"));
    }
    let n_topics: usize = counts[0]
        .parse()
        .map_err(|_| LdaError::parse(2, format!("invalid topic count '{}'", counts[0])))?;
    let n_documents: usize = counts[1]
        .parse()
        .map_err(|_| LdaError::parse(2, format!("invalid document count '{}'", counts[1])))?;
    if n_topics == 0 {
        return Err(LdaError::parse(2, "topic count must be positive"));
    }

    expect_blank(2)?;
    let alpha = parse_vector(line_at(3)?, 4)?;
    if alpha.len() != n_topics {
        return Err(LdaError::parse(
            4,
            format!("alpha has {} entries, expected {}", alpha.len(), n_topics),
        ));
    }
    expect_blank(4)?;

    let first_row = 5;
    let mut rows: Vec<Array1<f64>> = Vec::with_capacity(n_topics);
    for k in 0..n_topics {
        let index = first_row + k;
        let row = parse_vector(line_at(index)?, index + 1)?;
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(LdaError::parse(
                    index + 1,
                    format!("beta row has {} entries, expected {}", row.len(), first.len()),
                ));
            }
        } else if row.is_empty() {
            return Err(LdaError::parse(index + 1, "beta row is empty"));
        }
        rows.push(row);
    }

    if let Some(extra) = (first_row + n_topics..lines.len()).find(|&i| !lines[i].trim().is_empty())
    {
        return Err(LdaError::parse(extra + 1, "unexpected content after beta"));
    }

    let vocab_size = rows[0].len();
    let mut beta = Array2::zeros((n_topics, vocab_size));
    for (mut target, row) in beta.rows_mut().into_iter().zip(rows.iter()) {
        target.assign(row);
    }

    Ok(PersistedModel {
        message,
        n_topics,
        n_documents,
        alpha,
        beta,
    })
}

/// Read a model dump from `path`
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<PersistedModel> {
    let text = std::fs::read_to_string(path)?;
    parse_model(&text)
}
