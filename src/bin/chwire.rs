//! chwire: inspect native protocol bytes
//!
//! # Usage
//!
//! ```bash
//! # Dump the packets sent for a query
//! chwire frame "SELECT 1" --revision 54213
//!
//! # Encode a JSON array with a column codec
//! chwire array --type Int32 '[1, 2, 3]'
//!
//! # List registered element types
//! chwire types
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use chwire::config::ClientConfig;
use chwire::prelude::*;
use chwire::protocol::{Block, QueryPacket};
use chwire::protocol::query::write_data_header;
use chwire::types::envelope;

#[derive(Parser)]
#[command(name = "chwire")]
#[command(version = "0.1.0")]
#[command(about = "ClickHouse native protocol encoder", long_about = None)]
#[command(after_help = "EXAMPLES:
    chwire frame 'SELECT 1' --revision 54058
    chwire array --type \"DateTime('UTC')\" '[\"2024-01-02T03:04:05Z\"]'
    chwire types")]
struct Cli {
    /// Client config file (defaults to chwire.toml, then the user config dir)
    #[arg(short, long, env = "CHWIRE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hex dump of the query packet and trailing empty block
    Frame {
        query: String,

        /// Server revision the packet is encoded for
        #[arg(short, long, default_value_t = chwire::protocol::consts::DBMS_TCP_PROTOCOL_VERSION)]
        revision: u64,

        /// Set the compression flag (the block body is still shown raw)
        #[arg(long)]
        compress: bool,

        #[arg(long)]
        query_id: Option<String>,

        #[arg(long)]
        hostname: Option<String>,
    },
    /// Encode a JSON array with a column type
    Array {
        /// Column type, e.g. Int32, FixedString(8), DateTime('UTC')
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// JSON array of values
        json: String,
    },
    /// List element types and their codecs
    Types,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::load()?,
    };
    config.apply_default_timezone()?;

    match &cli.command {
        Commands::Frame {
            query,
            revision,
            compress,
            query_id,
            hostname,
        } => show_frame(&config, query, *revision, *compress, query_id.as_deref(), hostname.as_deref()),
        Commands::Array { type_name, json } => show_array(type_name, json),
        Commands::Types => {
            show_types();
            Ok(())
        }
    }
}

fn show_frame(
    config: &ClientConfig,
    query: &str,
    revision: u64,
    compress: bool,
    query_id: Option<&str>,
    hostname: Option<&str>,
) -> Result<()> {
    let hostname = hostname.map(str::to_string).unwrap_or_else(|| config.hostname());
    let client_info = config.client_info();

    let mut encoder: Encoder = Encoder::default();
    QueryPacket {
        query_id: query_id.unwrap_or(""),
        query,
        hostname: &hostname,
        client_info: &client_info,
        revision,
        compress: compress || config.compress,
    }
    .write(&mut encoder);
    let packet_len = encoder.get_ref().len();

    write_data_header(&mut encoder, "");
    Block::empty().write(&mut encoder);
    let bytes = encoder.into_inner();

    println!("{}", "Query packet:".green().bold());
    hex_dump(&bytes[..packet_len]);
    println!();
    println!("{}", "Data packet (empty block):".green().bold());
    hex_dump(&bytes[packet_len..]);
    println!();
    println!("{} {} bytes", "Total:".dimmed(), bytes.len().to_string().cyan());
    Ok(())
}

/// JSON values for the element type a codec writes.
fn parse_values(codec: &Codec, json: &str) -> Result<Values> {
    macro_rules! from_json {
        ($ty:ty) => {
            Values::from(serde_json::from_str::<Vec<$ty>>(json).context("values do not fit the column type")?)
        };
    }

    Ok(match codec {
        Codec::Int8 => from_json!(i8),
        Codec::Int16 => from_json!(i16),
        Codec::Int32 => from_json!(i32),
        Codec::Int64 => from_json!(i64),
        Codec::UInt8 => from_json!(u8),
        Codec::UInt16 => from_json!(u16),
        Codec::UInt32 => from_json!(u32),
        Codec::UInt64 => from_json!(u64),
        Codec::Float32 => from_json!(f32),
        Codec::Float64 => from_json!(f64),
        Codec::String | Codec::FixedString(_) => from_json!(String),
        Codec::Date { .. } | Codec::DateTime { .. } => from_json!(DateTime<FixedOffset>),
    })
}

fn show_array(type_name: &str, json: &str) -> Result<()> {
    let codec = Registry::global().factory(type_name, chwire::types::default_timezone())?;
    let values = parse_values(&codec, json)?;
    let array = Array::with_type(type_name, values);

    let bytes = array.value()?;
    println!(
        "{} {} ({} values)",
        "Codec:".dimmed(),
        array.codec()?.to_string().cyan(),
        array.len()?.to_string().yellow()
    );
    println!();
    println!("{}", "Wire value:".green().bold());
    hex_dump(&bytes);

    let stored = array.to_envelope()?;
    println!();
    println!("{}", "Envelope:".green().bold());
    hex_dump(&stored);

    let decoded = envelope::decode(&stored)?;
    tracing::debug!(len = decoded.len(), "envelope decoded back");
    Ok(())
}

fn show_types() {
    let registry = Registry::global();
    println!(
        "{:4} {:24} {}",
        "Id".white().bold(),
        "Rust type".white().bold(),
        "Codec".white().bold()
    );
    println!("{}", "─".repeat(48).dimmed());

    for ty in ElementType::ALL {
        let codec = registry
            .codec(ty, None)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:4} {:24} {}",
            ty.id().to_string().cyan(),
            ty.rust_name().yellow(),
            codec.white()
        );
    }
}

fn hex_dump(bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!(
            "  {} {:48} {}",
            format!("{:04x}", row * 16).dimmed(),
            hex.join(" "),
            ascii.dimmed()
        );
    }
}
