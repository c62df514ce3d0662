use std::{
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anstyle::{AnsiColor, Color, Style};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lz65::{compress_to_vec_observed, decompress_to_vec_observed, Token, TokenObserver};

/// Compress or decompress a file of at most 256 bytes with LZ65.
#[derive(Parser, Debug)]
#[command(name = "lz65-demo", version)]
struct Cli {
    #[arg(value_enum)]
    mode: Mode,
    input: PathBuf,
    output: PathBuf,

    /// Print every token with a hex dump of its bytes.
    #[arg(long)]
    dump: bool,

    /// Bytes per hex dump line (default 8 when compressing, 16 when decompressing).
    #[arg(long)]
    columns: Option<usize>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    #[value(alias = "c")]
    Compress,
    #[value(alias = "d")]
    Decompress,
}

/// Token events collected for the dump
#[derive(Default)]
struct Dump {
    events: Vec<(Token, Vec<u8>)>,
}

impl TokenObserver for Dump {
    fn token(&mut self, token: &Token, bytes: &[u8]) {
        self.events.push((*token, bytes.to_vec()));
    }
}

impl Dump {
    fn render(&self, out: &mut impl Write, columns: usize) -> io::Result<()> {
        let label = Style::new().bold();
        let hex = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
        let indent = " ".repeat(label_width());

        for (token, bytes) in &self.events {
            write!(out, "{}{} :{} ", label.render(), token, label.render_reset())?;
            let mut lines = bytes.chunks(columns.max(1)).peekable();
            if lines.peek().is_none() {
                writeln!(out)?;
            }
            let mut first = true;
            for line in lines {
                if !first {
                    write!(out, "{indent}")?;
                }
                first = false;
                write!(out, "{}", hex.render())?;
                for (i, b) in line.iter().enumerate() {
                    if i > 0 {
                        write!(out, " ")?;
                    }
                    write!(out, "{b:02X}")?;
                }
                writeln!(out, "{}", hex.render_reset())?;
            }
        }
        Ok(())
    }
}

/// Width of "[RAW] IDX:00 LEN:00 : "
fn label_width() -> usize {
    Token::EOS.to_string().len() + 3
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let inp = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    println!("Buffered in {} bytes of data", inp.len());

    let mut dump = Dump::default();
    let (outp, default_columns) = match cli.mode {
        Mode::Compress => (
            compress_to_vec_observed(&inp, &mut dump).context("compression failed")?,
            8,
        ),
        Mode::Decompress => (
            decompress_to_vec_observed(&inp, &mut dump).context("decompression failed")?,
            16,
        ),
    };

    if cli.dump {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        dump.render(&mut out, cli.columns.unwrap_or(default_columns))?;
        out.flush()?;
    }

    fs::write(&cli.output, &outp)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    println!("Wrote {} bytes to {}", outp.len(), cli.output.display());

    Ok(())
}
