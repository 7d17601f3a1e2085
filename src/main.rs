#[cfg(not(any(target_os = "linux", windows)))]
compile_error!("memory-recorder needs the Linux or Windows process backend");

use anyhow::{Context, Result};
use clap::Parser;
use memory_recorder::cli::{Args, Command};
use memory_recorder::config::{load_config, validate_config, Config, ConfigLoader};
use memory_recorder::process::NativeOpener;
use memory_recorder::{Address, PointerChain, ProcessId, Session, ValueType};
use serde_json::json;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

type NativeSession = Session<NativeOpener>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::new(path)
            .load()
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => load_config()?,
    };
    validate_config(&config)?;
    init_logging(&config);

    info!("memory-recorder v{}", env!("CARGO_PKG_VERSION"));
    let session = Session::with_config(NativeOpener::new(), &config);

    match args.command {
        Command::List => list(&session, args.json),
        Command::Modules { pid } => modules(&session, pid, args.json),
        Command::Read {
            pid,
            address,
            size,
            value_type,
        } => read(&session, pid, &address, size, value_type, args.json),
        Command::Resolve {
            pid,
            chain,
            value_type,
        } => resolve(&session, pid, &chain, value_type, args.json),
        Command::Record {
            pid,
            address,
            size,
            period,
            duration,
            dump,
        } => record(&session, pid, &address, size, period, duration, dump, args.json).await,
    }
}

// Logs go to stderr so stdout stays parseable.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn list(session: &NativeSession, as_json: bool) -> Result<()> {
    let processes = session.list_candidate_processes()?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&processes)?);
    } else {
        for process in &processes {
            println!("{}", process);
        }
    }
    Ok(())
}

fn modules(session: &NativeSession, pid: ProcessId, as_json: bool) -> Result<()> {
    let modules = session.modules(pid)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
    } else {
        for module in &modules {
            println!("{:>18}  {}", module.base_address.to_string(), module.name);
        }
    }
    Ok(())
}

fn read(
    session: &NativeSession,
    pid: ProcessId,
    address: &str,
    size: usize,
    value_type: Option<ValueType>,
    as_json: bool,
) -> Result<()> {
    let parsed = Address::from_hex(address)?;
    match value_type {
        Some(value_type) => {
            let value = session.read_value(pid, address, value_type)?;
            if as_json {
                println!("{}", json!({ "address": parsed, "value": value }));
            } else {
                println!("{}: {}", parsed, value);
            }
        }
        None => {
            let bytes = session.read_bytes(pid, address, size)?;
            if as_json {
                println!("{}", json!({ "address": parsed, "bytes": hex::encode(&bytes) }));
            } else {
                println!("{}: {}", parsed, hex::encode(&bytes));
            }
        }
    }
    Ok(())
}

fn resolve(
    session: &NativeSession,
    pid: ProcessId,
    chain: &PointerChain,
    value_type: Option<ValueType>,
    as_json: bool,
) -> Result<()> {
    let address = session.resolve_pointer(pid, chain)?;
    let value = value_type
        .map(|value_type| session.read_value(pid, &format!("{:X}", address), value_type))
        .transpose()?;

    if as_json {
        println!(
            "{}",
            json!({ "chain": chain.to_string(), "address": address, "value": value })
        );
    } else {
        match value {
            Some(value) => println!("{} -> {} = {}", chain, address, value),
            None => println!("{} -> {}", chain, address),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn record(
    session: &NativeSession,
    pid: ProcessId,
    address: &str,
    size: usize,
    period_ms: u64,
    duration_secs: u64,
    dump: bool,
    as_json: bool,
) -> Result<()> {
    let recording = session.start_recording(pid, address, size, period_ms)?;

    if duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(duration_secs)) => {}
            signal = tokio::signal::ctrl_c() => signal?,
        }
    } else {
        info!("recording, press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
    }

    tokio::task::block_in_place(|| session.stop_recording())?;
    let summary = recording.summary();

    if as_json {
        let frames = if dump { recording.frames() } else { Vec::new() };
        let frames: Vec<_> = frames
            .iter()
            .map(|f| json!({ "timestamp": f.timestamp, "data": f.to_hex() }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "summary": summary, "frames": frames }))?
        );
    } else {
        println!(
            "{} frames of {} bytes at {} over {} ms",
            summary.frame_count,
            summary.size,
            summary.start_address,
            summary.duration_ms()
        );
        if dump {
            for frame in recording.frames() {
                println!("{} {}", frame.timestamp, frame.to_hex());
            }
        }
    }
    Ok(())
}
