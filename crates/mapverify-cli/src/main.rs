use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mapverify_checks::{MappingVerifier, VerifyReport};
use mapverify_config::{init_tracing, VerifierConfig};
use mapverify_mappings::Mappings;

#[derive(Parser)]
#[command(
    name = "mapverify",
    version,
    about = "Check a rename mapping against the jar it renames"
)]
struct Cli {
    /// Jar (or exploded class directory) the mappings rename
    #[arg(long)]
    jar: PathBuf,
    /// Mapping file (SRG, CSRG, TSRG or TSRG2)
    #[arg(long)]
    map: PathBuf,
    /// Library jar the classes under test reference (repeatable)
    #[arg(long = "lib", value_name = "JAR")]
    libs: Vec<PathBuf>,
    /// File listing library jars, one per line
    #[arg(long = "libs", value_name = "FILE")]
    lib_list: Option<PathBuf>,
    /// Constructor id table (`<id> <class> <descriptor>` per line)
    #[arg(long)]
    ctrs: Option<PathBuf>,
    /// Class suffix table (`<ancestor> <Suffix>` per line)
    #[arg(long)]
    suffixes: Option<PathBuf>,
    /// Task to run (repeatable); defaults to accesslevels, overridenames and uniqueids
    #[arg(long = "task", value_name = "NAME")]
    tasks: Vec<String>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append log output to this file
    #[arg(long)]
    log: Option<PathBuf>,
    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => VerifierConfig::load_from_path(path)?,
        None => VerifierConfig::default(),
    };
    if let Some(log) = &cli.log {
        config.logging.file = Some(log.clone());
    }
    if cli.verbose {
        config.logging.level = "debug".to_owned();
    }
    if !cli.tasks.is_empty() {
        config.tasks = cli.tasks.clone();
    }
    init_tracing(&config.logging);

    let mappings = Mappings::load(&cli.map)
        .with_context(|| format!("failed to load mappings from {}", cli.map.display()))?;

    let mut verifier = MappingVerifier::new(mappings);
    verifier.configure(&config)?;
    if let Some(path) = &cli.ctrs {
        verifier.load_constructors(path)?;
    }
    if let Some(path) = &cli.suffixes {
        verifier.load_suffixes(path)?;
    }

    // The jar goes first so its classes win over same-named library copies.
    verifier
        .load_jar(&cli.jar)
        .with_context(|| format!("failed to load {}", cli.jar.display()))?;
    let mut libs = cli.libs.clone();
    if let Some(list) = &cli.lib_list {
        libs.extend(read_lib_list(list)?);
    }
    for lib in &libs {
        verifier
            .load_library(lib)
            .with_context(|| format!("failed to load library {}", lib.display()))?;
    }

    let report = verifier.verify();
    tracing::info!(
        passed = report.passed(),
        findings = report.finding_count(),
        "verification finished"
    );
    print_report(&report, cli.json)?;
    Ok(if report.passed() { 0 } else { 1 })
}

fn read_lib_list(path: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read library list {}", path.display()))?;
    Ok(parse_lib_list(&text))
}

/// One path per line; `#` starts a comment and a leading `-e=` is ignored.
fn parse_lib_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before).trim())
        .filter(|line| !line.is_empty())
        .map(|line| PathBuf::from(line.strip_prefix("-e=").unwrap_or(line)))
        .collect()
}

fn print_report(report: &VerifyReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report)?;
        println!("{out}");
        return Ok(());
    }

    for task in &report.tasks {
        if task.passed {
            println!("{}: PASS", task.task);
            continue;
        }
        println!("{}: FAIL ({} findings)", task.task, task.findings.len());
        for finding in &task.findings {
            println!("  {finding}");
        }
    }
    if report.passed() {
        println!("result: PASS");
    } else {
        println!("result: FAIL ({} findings)", report.finding_count());
    }
    Ok(())
}
