use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info, warn};
use split_accuracy::batch::{BatchConfig, run_batch};
use split_accuracy::compare::compare_files;
use split_accuracy::record::{format_result, write_record};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// Score inferred phylogenies against their true trees by comparing
/// non-trivial bipartitions (false negative / false positive rates).
#[derive(Parser, Debug)]
#[command(name = "split-accuracy", version, about = "Split-based accuracy of inferred trees")]
struct Args {
    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", global = true, default_value_t = false)]
    quiet: bool,

    /// Verbose mode: log every work unit
    #[arg(short = 'v', long = "verbose", global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare one inferred tree against the true tree
    Compare {
        /// Path to the true (reference) tree, Newick or Nexus
        #[arg(short = 't', long = "true-tree")]
        true_tree: PathBuf,

        /// Path to the inferred tree, Newick or Nexus
        #[arg(short = 'i', long = "inferred")]
        inferred: PathBuf,

        /// Output path for the comparison record (stdout when omitted or `-`)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Compare every <model>/<replicate>/<method> tree under a results directory
    Batch {
        /// Results directory holding <model>/<replicate>/ subdirectories
        #[arg(short = 'r', long = "results")]
        results: PathBuf,

        /// Model condition to process (repeatable); all when omitted
        #[arg(short = 'm', long = "model")]
        models: Vec<String>,

        /// Method to compare (repeatable); every *.<ext> file when omitted
        #[arg(long = "method")]
        methods: Vec<String>,

        /// File name of the true tree inside each replicate directory
        #[arg(long = "true-tree", default_value = "true.tre")]
        true_tree: String,

        /// Extension of inferred tree files
        #[arg(long = "ext", default_value = "tre")]
        ext: String,

        /// Worker threads (0 = all cores)
        #[arg(short = 'j', long = "threads", default_value_t = 0)]
        threads: usize,

        /// Recompute units that already have a completed record
        #[arg(long = "force", default_value_t = false)]
        force: bool,

        /// Output path for the per-unit status table (TSV, `.gz` compresses)
        #[arg(short = 's', long = "summary")]
        summary: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Compare { true_tree, inferred, output } => {
            let t0 = Instant::now();
            let result = compare_files(&true_tree, &inferred);
            let text = format_result(&result);

            match output.filter(|p| p.as_os_str() != "-") {
                Some(path) => {
                    write_record(&path, &text)
                        .with_context(|| format!("Failed to write output {}", path.display()))?;
                    info!("Comparison written to {}", path.display());
                }
                None => print!("{text}"),
            }

            match result {
                Ok(cmp) => {
                    info!(
                        "Compared {} leaves in {:.3}s: FN rate {:.4}, FP rate {:.4}",
                        cmp.num_leaves,
                        t0.elapsed().as_secs_f64(),
                        cmp.fn_rate(),
                        cmp.fp_rate()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    warn!("Tree comparison failed ({}): {e}", e.kind());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Batch {
            results,
            models,
            methods,
            true_tree,
            ext,
            threads,
            force,
            summary,
        } => {
            let config = BatchConfig {
                results_dir: results,
                models,
                methods,
                true_tree,
                tree_ext: ext.trim_start_matches('.').to_string(),
                threads,
                force,
                summary,
            };

            let t0 = Instant::now();
            let report = run_batch(&config)
                .with_context(|| format!("Batch over {} failed", config.results_dir.display()))?;
            info!("Batch finished in {:.3}s", t0.elapsed().as_secs_f64());
            if report.has_failures() {
                warn!("Some work units failed; see their comparison records");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
