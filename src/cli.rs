use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use crate::output::{self, Format};
use crate::probe::SystemPing;
use crate::provider::PsDhcpProvider;
use crate::{run_report, scan_stats, ReportOptions, ScanStats};

#[derive(Parser)]
#[command(
    name = "leasewatch",
    about = "Report last lease activity and reachability for Windows DHCP server reservations",
    long_about = "Correlates the DHCP server's rotating audit logs with its configured \
                  reservations and probes each reserved address once.\n\
                  The probe does not verify the responding host's hardware address, so an \
                  inactive reservation that shows online may be a different live host; \
                  follow up on those manually."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate reservations with audit log activity and render the report
    Report {
        /// Server name shown in the report
        #[arg(short, long)]
        server: Option<String>,

        /// Audit log directory (default: ask the server, then the stock install path)
        #[arg(short, long)]
        log_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long, requires = "out")]
        force: bool,

        /// Show per-reservation progress on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show scope, reservation and audit log counts (read-only)
    Scan {
        /// Audit log directory (default: ask the server, then the stock install path)
        #[arg(short, long)]
        log_dir: Option<PathBuf>,

        /// Show ingestion progress on stderr
        #[arg(short, long)]
        verbose: bool,
    },
}

pub fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Report {
            server,
            log_dir,
            format,
            out,
            force,
            verbose,
        } => {
            // Refuse a clobbering output path before touching the server
            if let Some(out) = &out {
                if !force && out.exists() {
                    bail!(
                        "Output file already exists: {} (use --force to overwrite)",
                        out.display()
                    );
                }
            }

            let provider = PsDhcpProvider::new();
            let prober = SystemPing::new();
            let options = ReportOptions { verbose };
            let server = server.unwrap_or_else(local_server_name);

            let results = run_report(&provider, &prober, &server, log_dir.as_deref(), &options)?;
            let rows = output::project(&results);

            match out {
                Some(path) => {
                    let file = OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .open(&path)
                        .with_context(|| {
                            format!("Failed to create output file: {}", path.display())
                        })?;
                    output::write_report(&rows, &format, file)?;
                    println!("Report written to: {}", path.display());
                }
                None => output::write_report(&rows, &format, io::stdout().lock())?,
            }
        }

        Commands::Scan { log_dir, verbose } => {
            let provider = PsDhcpProvider::new();
            if verbose {
                eprintln!("Enumerating scopes and reservations");
            }
            let stats = scan_stats(&provider, log_dir.as_deref())?;
            print_scan_stats(&stats);
        }
    }

    Ok(())
}

/// Default server display name when none is given on the command line.
fn local_server_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn print_scan_stats(stats: &ScanStats) {
    println!("DHCP scopes found: {}", stats.scopes_found);
    println!("Reservations found: {}", stats.reservations_found);
    println!("Audit log files read: {}", stats.log_files_read);
    println!("Audit log files skipped: {}", stats.log_files_skipped);
    println!("Audit log records parsed: {}", stats.log_records_parsed);
}
