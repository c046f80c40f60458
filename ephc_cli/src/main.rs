use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use ephc_cli::dataset::signal_from_raw;
use ephc_cli::{human_bytes, init_logging, run_benchmark, DatasetSource};
use ephc_codecs::{algorithm_by_name, algorithms, build_codec, CodecConfig};
use ephc_core::format::Container;
use ephc_core::{read_container, write_container, Codec, Dtype};

/// Version string stored in containers encoded from an ad-hoc `--config`.
const CONFIG_VERSION: &str = "config";

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ephc",
    about = "Predictive and entropy compression for multi-channel integer signals",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress headerless little-endian samples into an .ephc container
    Compress {
        /// Raw sample file ("-" reads stdin)
        input: PathBuf,
        /// Destination .ephc file
        output: PathBuf,
        /// Sample type: uint8 | uint16 | uint32 | int16 | int32
        #[arg(short, long, default_value = "int16")]
        dtype: Dtype,
        /// Interleaved channels per time point
        #[arg(short, long, default_value_t = 1)]
        channels: usize,
        /// Registered algorithm name (see `ephc list`)
        #[arg(short, long, default_value = "ans-lpc8", conflicts_with = "config")]
        algorithm: String,
        /// Ad-hoc pipeline as JSON, e.g. '{"transform":"delta","order":2}'
        #[arg(long)]
        config: Option<String>,
    },
    /// Decode an .ephc container back to raw little-endian samples
    Decompress {
        /// Source .ephc file
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print container metadata
    Inspect {
        /// .ephc file to inspect
        file: PathBuf,
    },
    /// List registered algorithms
    List {
        /// Print tags and descriptions
        #[arg(long)]
        tags: bool,
    },
    /// Run every compatible algorithm on a dataset and report ratios
    Bench {
        /// Raw sample file; omit with --synthetic
        input: Option<PathBuf>,
        /// Generate a synthetic int16 ephys recording instead of reading a file
        #[arg(long, conflicts_with = "input")]
        synthetic: bool,
        /// Sample type of the input file (synthetic data is always int16)
        #[arg(short, long, default_value = "int16", conflicts_with = "synthetic")]
        dtype: Dtype,
        #[arg(short, long, default_value_t = 32)]
        channels: usize,
        /// Time points for --synthetic
        #[arg(long, default_value_t = 30_000)]
        rows: usize,
        /// Dataset tags for the compatibility filter (comma separated);
        /// defaults to timeseries,integer,correlated for files and to the
        /// generator's own tags for --synthetic
        #[arg(long, value_delimiter = ',')]
        dataset_tags: Option<Vec<String>>,
        /// Only run algorithms whose name contains this string
        #[arg(short, long)]
        filter: Option<String>,
        /// Emit JSON records on stdout instead of a table
        #[arg(long)]
        json: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if input.to_str() == Some("-") {
        io::stdin().lock().read_to_end(&mut bytes)?;
    } else {
        let file = File::open(input).with_context(|| format!("opening input file {:?}", input))?;
        BufReader::new(file).read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

fn open_output(output: &Path) -> anyhow::Result<Box<dyn Write>> {
    if output.to_str() == Some("-") {
        Ok(Box::new(io::stdout()))
    } else {
        let file =
            File::create(output).with_context(|| format!("creating output file {:?}", output))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Codec that decodes `container`, checking the stored version against the registry.
fn codec_for(container: &Container) -> anyhow::Result<std::sync::Arc<dyn Codec>> {
    if container.algorithm_version == CONFIG_VERSION {
        let config: CodecConfig = serde_json::from_str(&container.algorithm)
            .context("container holds an unreadable pipeline config")?;
        return Ok(build_codec(&config)?);
    }
    let alg = algorithm_by_name(&container.algorithm)?;
    container.check_version(&alg.version)?;
    Ok(alg.codec)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    input: PathBuf,
    output: PathBuf,
    dtype: Dtype,
    channels: usize,
    algorithm: &str,
    config: Option<String>,
) -> anyhow::Result<()> {
    let raw = read_input(&input)?;
    let signal = signal_from_raw(&raw, dtype, channels)?;

    let (name, version, codec) = match config {
        Some(json) => {
            let config: CodecConfig =
                serde_json::from_str(&json).context("parsing --config")?;
            // stored compactly so the decoder can rebuild the same pipeline
            (serde_json::to_string(&config)?, CONFIG_VERSION.to_string(), build_codec(&config)?)
        }
        None => {
            let alg = algorithm_by_name(algorithm)?;
            (alg.name, alg.version, alg.codec)
        }
    };

    let t0 = Instant::now();
    let payload = codec.encode(&signal).with_context(|| format!("encoding with {name}"))?;
    let elapsed = t0.elapsed();

    let container = Container::new(&name, &version, dtype, signal.shape(), payload);
    let mut out = BufWriter::new(
        File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
    );
    let written = write_container(&mut out, &container)?;
    info!(algorithm = %name, bytes = written, "wrote container");

    let raw_size = raw.len() as u64;
    eprintln!("  algorithm   : {} (v{})", name, version);
    eprintln!("  shape       : {} {}", signal.shape(), dtype);
    eprintln!("  raw size    : {}", human_bytes(raw_size));
    eprintln!("  compressed  : {}", human_bytes(written));
    eprintln!("  ratio       : {:.2}x", raw_size as f64 / written.max(1) as f64);
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw_size as f64 / elapsed.as_secs_f64().max(1e-9)) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let file = File::open(&input).with_context(|| format!("opening {:?}", input))?;
    let container = read_container(&mut BufReader::new(file))
        .with_context(|| format!("reading container {:?}", input))?;
    let codec = codec_for(&container)?;

    let t0 = Instant::now();
    let signal = codec
        .decode(&container.payload, container.dtype, container.shape)
        .with_context(|| format!("decoding with {}", container.algorithm))?;
    let elapsed = t0.elapsed();

    let raw = signal.to_le_bytes();
    let mut dst = open_output(&output)?;
    dst.write_all(&raw)?;
    dst.flush()?;

    eprintln!("  shape       : {} {}", signal.shape(), signal.dtype());
    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw.len() as f64 / elapsed.as_secs_f64().max(1e-9)) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let f = File::open(&file).with_context(|| format!("opening {:?}", file))?;
    let container = read_container(&mut BufReader::new(f))?;
    let header = container.header()?;
    let raw_size = (container.shape.len() * container.dtype.width()) as u64;
    let on_disk = container.encoded_len();

    println!("=== EPHC1 File: {:?} ===", file);
    println!();
    println!("  format version : {}", header.format_version);
    println!("  algorithm      : {}", container.algorithm);
    println!("  version        : {}", container.algorithm_version);
    println!("  dtype          : {}", container.dtype);
    println!("  shape          : {}", container.shape);
    println!("  raw size       : {}", human_bytes(raw_size));
    println!("  payload        : {}", human_bytes(header.payload_len));
    println!("  file on disk   : {}", human_bytes(on_disk));
    println!("  ratio          : {:.2}x", raw_size as f64 / on_disk.max(1) as f64);
    println!("  checksum       : {:016x}", header.checksum);

    if container.algorithm_version != CONFIG_VERSION {
        match algorithm_by_name(&container.algorithm) {
            Ok(alg) if alg.version == container.algorithm_version => {
                println!("  tags           : {}", alg.tags.join(", "));
            }
            Ok(alg) => println!("  registry       : stale (current version {})", alg.version),
            Err(_) => println!("  registry       : not registered"),
        }
    }
    Ok(())
}

fn run_list(show_tags: bool) -> anyhow::Result<()> {
    for alg in algorithms()? {
        if show_tags {
            println!("{:<26} v{:<5} [{}]  {}", alg.name, alg.version, alg.tags.join(","), alg.description);
        } else {
            println!("{:<26} v{}", alg.name, alg.version);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_bench(
    input: Option<PathBuf>,
    synthetic: bool,
    dtype: Dtype,
    channels: usize,
    rows: usize,
    dataset_tags: Option<Vec<String>>,
    filter: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let source = match input.as_deref() {
        Some(path) => DatasetSource::RawFile {
            path,
            dtype,
            channels,
        },
        None if synthetic => DatasetSource::Synthetic {
            rows,
            channels,
            seed: 42,
        },
        None => anyhow::bail!("bench needs an input file or --synthetic"),
    };
    let dataset = source.load(dataset_tags)?;
    eprintln!(
        "benchmarking {} {} ({}) against the registry...",
        dataset.name,
        dataset.signal.shape(),
        human_bytes(dataset.raw_bytes() as u64)
    );

    let records = run_benchmark(&dataset, &algorithms()?, filter.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!();
    println!(
        "  {:<26}  {:>8}  {:>12}  {:>10}  {:>10}  {:>8}  {:>7}",
        "algorithm", "ratio", "compressed", "enc ms", "dec ms", "rmse", "max err"
    );
    println!("  {}", "─".repeat(93));
    for r in &records {
        let (rmse, max_err) = match &r.loss {
            Some(m) => (format!("{:.3}", m.rmse), m.max_abs_error.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "  {:<26}  {:>7.2}x  {:>12}  {:>10.2}  {:>10.2}  {:>8}  {:>7}",
            r.algorithm(),
            r.ratio,
            human_bytes(r.encoded_bytes as u64),
            r.encode_ms,
            r.decode_ms,
            rmse,
            max_err
        );
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            dtype,
            channels,
            algorithm,
            config,
        } => run_compress(input, output, dtype, channels, &algorithm, config),
        Commands::Decompress { input, output } => run_decompress(input, output),
        Commands::Inspect { file } => run_inspect(file),
        Commands::List { tags } => run_list(tags),
        Commands::Bench {
            input,
            synthetic,
            dtype,
            channels,
            rows,
            dataset_tags,
            filter,
            json,
        } => run_bench(input, synthetic, dtype, channels, rows, dataset_tags, filter, json),
    }
}
