use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tabwriter::TabWriter;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use nwsynth_algo::{is_bounded, write_report, Synthesizer};
use nwsynth_cli::{load_config, Cli, Commands, NwsynthConfig, SynthesizeArgs};
use nwsynth_core::{is_computed, SynthesisKey};
use nwsynth_io::{DirectoryDeck, FileExporter};

const REPORT_FILE: &str = "synthesis_report.json";

fn run_synthesize(args: &SynthesizeArgs) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => NwsynthConfig::default(),
    };
    let run = config.resolve(args)?;
    let deck = DirectoryDeck::open(&args.case)
        .with_context(|| format!("opening case '{}'", args.case.display()))?;
    fs::create_dir_all(&run.out)
        .with_context(|| format!("creating output directory '{}'", run.out.display()))?;
    info!(
        case = %args.case.display(),
        out = %run.out.display(),
        format = %run.format,
        "synthesizing"
    );

    let exporter = FileExporter::new(&run.out, run.format);
    let synthesizer = Synthesizer::new(Arc::new(deck), Arc::new(exporter), &run.synthesis)?;
    let report = synthesizer.synthesize(&args.variables)?;
    let report_path = run.out.join(REPORT_FILE);
    write_report(&report_path, &report)?;

    let total = report.succeeded.len() + report.failed.len();
    println!(
        "Synthesized {} of {} syntheses into {}",
        report.succeeded.len(),
        total,
        run.out.display()
    );
    for failed in &report.failed {
        println!("  failed {}: {}", failed.key, failed.error);
    }
    println!("Report written to {}", report_path.display());
    Ok(if report.is_total_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_catalog() -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SYNTHESIS\tVARIABLE\tRESOLUTION\tUNIT\tCOMPUTED\tBOUNDED")?;
    for key in SynthesisKey::supported() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            key,
            key.variable.long_name(),
            key.resolution.long_name(),
            key.variable.unit().as_str(),
            is_computed(&key),
            is_bounded(&key)
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    let result = match &cli.command {
        Commands::Synthesize(args) => run_synthesize(args),
        Commands::List => print_catalog().map(|_| ExitCode::SUCCESS),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
