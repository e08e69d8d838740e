//! predexp - encode and inspect predicate expression streams

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use log::{info, warn};
use predexp::{decode_stream, encode_to_bytes, parse_tokens, Predicate};

/// Encode and inspect predicate expression streams
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode node tokens given in stream order, e.g. `int-bin:age int:18 int>=`
    Encode {
        /// Output format
        #[arg(short, long, value_enum, default_value = "hex")]
        format: Format,

        /// Reject tokens that do not form exactly one well-formed predicate
        #[arg(long)]
        validate: bool,

        /// Node tokens
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Decode a hex stream and describe each node
    Decode {
        /// Hex bytes, whitespace ignored
        hex: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Hex,
    Raw,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Encode {
            format,
            validate,
            tokens,
        } => encode(&tokens, format, validate),
        Command::Decode { hex } => decode(&hex),
    }
}

fn encode(tokens: &[String], format: Format, validate: bool) -> Result<()> {
    let exps = parse_tokens(tokens.iter().map(String::as_str)).context("Failed to parse tokens")?;

    if validate {
        let predicate = Predicate::parse(&exps).context("Invalid predicate")?;
        info!("predicate: {}", predicate);
    }

    let bytes = encode_to_bytes(&exps).context("Failed to encode predicate")?;
    info!("{} nodes, {} bytes", exps.len(), bytes.len());

    match format {
        Format::Hex => println!("{}", to_hex(&bytes)),
        Format::Raw => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write output")?;
            stdout.flush().context("Failed to write output")?;
        }
    }
    Ok(())
}

fn decode(hex: &str) -> Result<()> {
    let bytes = from_hex(hex)?;
    let exps = decode_stream(&bytes).context("Failed to decode stream")?;

    for exp in &exps {
        println!("{:>5} {:>6}  {}", exp.tag(), exp.payload_len(), exp);
    }

    match Predicate::parse(&exps) {
        Ok(predicate) => println!("{}", predicate),
        Err(e) => warn!("not a single well-formed predicate: {}", e),
    }
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(hex: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("Hex input has an odd number of digits");
    }

    digits
        .chunks(2)
        .map(|pair| {
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                bail!("Invalid hex byte '{}'", String::from_utf8_lossy(pair));
            }
            let pair = std::str::from_utf8(pair).context("Invalid hex input")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("Invalid hex byte '{}'", pair))
        })
        .collect()
}
