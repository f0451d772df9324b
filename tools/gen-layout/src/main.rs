// main.rs — gen-layout command line.
//
//   gen-layout --tag v3.4.0 -o src/layout/v3_4.rs
//   gen-layout --tag main --series 4.3 --source-dir ~/src/blender

use anyhow::{Context, Result};
use clap::Parser;
use gen_layout::source::Source;
use gen_layout::Target;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Generate a host struct layout module from the host's headers", long_about = None)]
struct Args {
    /// Release tag or branch to read headers from (e.g. v3.4.0).
    #[arg(short, long, default_value = "main")]
    tag: String,

    /// MAJOR.MINOR the layouts apply to; required when --tag is a branch.
    #[arg(long)]
    series: Option<String>,

    /// Read headers from a local checkout instead of fetching them.
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let target = Target::new(&args.tag, args.series.as_deref())?;
    let source = match args.source_dir {
        Some(dir) => Source::Local(dir),
        None => Source::remote(&args.tag)?,
    };

    let module = gen_layout::generate(&target, |path| source.read(path))?;

    match args.output {
        Some(path) => std::fs::write(&path, module).with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().write_all(module.as_bytes())?,
    }
    Ok(())
}
