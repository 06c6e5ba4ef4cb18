use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Default)]
struct CliArgs {
    playlist: Option<PathBuf>,
    folder: Option<PathBuf>,
    delay_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so they never interleave with streamed content.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunestream=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    tunestream::app::run_with_startup(tunestream::app::AppStartupOptions {
        playlist: args.playlist,
        folder: args.folder,
        delay_ms: args.delay_ms,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            flag @ ("--playlist" | "--folder") => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("{flag} requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("{flag} cannot be empty");
                }
                let path = PathBuf::from(value.trim());
                if flag == "--playlist" {
                    out.playlist = Some(path);
                } else {
                    out.folder = Some(path);
                }
            }
            "--delay-ms" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--delay-ms requires a value");
                };
                let Ok(delay) = value.trim().parse::<u64>() else {
                    anyhow::bail!("--delay-ms expects whole milliseconds, got {value}");
                };
                out.delay_ms = Some(delay);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    if out.playlist.is_some() && out.folder.is_some() {
        anyhow::bail!("--playlist and --folder cannot be combined");
    }
    Ok(out)
}

fn print_help() {
    println!("tunestream");
    println!("  --playlist <file>   Open a playlist file at startup");
    println!("  --folder <dir>      Import every track file in a folder at startup");
    println!("  --delay-ms <ms>     Delay between streamed content units");
    println!();
    println!("Set RUST_LOG (e.g. tunestream=debug) for diagnostics on stderr.");
}
