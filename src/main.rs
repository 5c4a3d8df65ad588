//! nflaunch CLI Entry Point
//!
//! # Usage
//!
//! ```bash
//! # Launch an nf-core pipeline on Google Batch
//! nflaunch -b gs://my-bucket --project-id my-project --region europe-west4 \
//!     --service-account-email runner@my-project.iam.gserviceaccount.com \
//!     --network default --subnetwork default \
//!     --pipeline-name nf-core/rnaseq --pipeline-version 3.14.0
//!
//! # Preview the job request without touching the cloud
//! nflaunch ... --dry-run
//!
//! # Generate an oncoanalyser samplesheet from remote alignments
//! nflaunch ... -s TUMOR01,NORMAL01 -p oncoanalyser \
//!     -o '{"remote_sample_bucket_uri": "gs://samples/aligned", "filetype": ".bam"}'
//! ```

use std::env;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use nflaunch::cli::LaunchArgs;
use nflaunch::launcher::NextflowLauncher;

/// Configures the logging system with appropriate formatting.
///
/// The level defaults to `info`, raised by `-v`/`-vv`, and can be overridden
/// entirely with the `NF_LAUNCH_LOG_LEVEL` environment variable.
fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let level = env::var("NF_LAUNCH_LOG_LEVEL").unwrap_or_else(|_| level.to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

fn run() -> nflaunch::Result<()> {
    let args = LaunchArgs::parse();
    setup_logging(args.verbose);

    NextflowLauncher::new(args).run()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
