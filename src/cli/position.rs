use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use nbkit::{
    Position,
    domain::position::{Side, parse_position, serialize_position},
};
use serde_json::json;
use tracing::instrument;

#[derive(Debug, Subcommand)]
pub enum PositionCommand {
    /// Validate a position and describe it
    Parse(Parse),

    /// Rewrite a position in canonical form
    Format(Input),

    /// Rewrite a position as seen from the other side
    Mirror(Input),
}

#[derive(Debug, Args)]
pub struct Input {
    /// File holding the position (default: stdin).
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct Parse {
    #[command(flatten)]
    input: Input,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl PositionCommand {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Parse(parse) => {
                let position = parse.input.read()?;
                match parse.output {
                    OutputFormat::Table => print!("{}", describe(&position)),
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&to_json(&position))?);
                    }
                }
            }
            Self::Format(input) => println!("{}", serialize_position(&input.read()?)),
            Self::Mirror(input) => println!("{}", serialize_position(&input.read()?.mirrored())),
        }
        Ok(())
    }
}

impl Input {
    fn read(&self) -> anyhow::Result<Position> {
        let (text, source) = match &self.file {
            Some(path) => (read_file(path)?, path.display().to_string()),
            None => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read stdin")?;
                (text, "stdin".to_string())
            }
        };
        parse_position(&text).with_context(|| format!("invalid position in {source}"))
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn describe(position: &Position) -> String {
    let lengths: Vec<String> = position
        .rows()
        .map(|row| row.len().to_string())
        .collect();
    format!(
        "rows: {}\nrow lengths: {}\nwidest row: {}\nupper pieces: {}\nlower pieces: {}\n",
        position.row_count(),
        lengths.join(" "),
        position.max_row_len(),
        position.count(Side::Upper),
        position.count(Side::Lower),
    )
}

fn to_json(position: &Position) -> serde_json::Value {
    let rows: Vec<Vec<String>> = position
        .rows()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();
    let pieces: Vec<_> = position
        .pieces()
        .map(|(row, col, piece)| {
            json!({
                "row": row,
                "col": col,
                "piece": piece.to_string(),
                "side": piece.side(),
            })
        })
        .collect();
    json!({ "rows": rows, "pieces": pieces })
}
