//! mcm-driver: the `mcm-check` command-line front end.
//!
//! Loads a JSON litmus test and a memory model, runs the checker, and
//! reports the verdict as colored text or JSON. Exposed as a library so
//! integration tests can drive it without spawning the binary.

pub mod cli;
pub mod error;
pub mod json_output;
pub mod litmus;
pub mod model_file;
pub mod output;

use std::time::{Duration, Instant};

use mcm_checker::{CheckerConfig, ErrorPolicy, McmChecker, McmResult, SearchMode, Verdict};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, OutputFormat, SOLVER_ENV, parse_args, print_usage};
use crate::error::DriverError;
use crate::json_output::{JsonReport, print_json_report};
use crate::litmus::LitmusTest;

pub const EXIT_ALLOWED: i32 = 0;
pub const EXIT_FORBIDDEN: i32 = 1;
pub const EXIT_INCONCLUSIVE: i32 = 2;

pub fn exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Allowed => EXIT_ALLOWED,
        Verdict::Forbidden => EXIT_FORBIDDEN,
        Verdict::Inconclusive => EXIT_INCONCLUSIVE,
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins; otherwise `warn`,
/// or `debug` with `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when driven from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
pub fn walltime_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// A finished check together with what is needed to report it.
#[derive(Debug)]
pub struct LitmusRun {
    pub test: String,
    pub model: String,
    pub outcome: String,
    pub result: McmResult,
}

/// Load the test and model named by `cli` and run the checker.
pub fn check_litmus(cli: &CliArgs) -> Result<LitmusRun, DriverError> {
    let test = LitmusTest::from_file(&cli.litmus)?;
    let automata = test.automata()?;
    let outcome = test.outcome()?;
    let mcm = model_file::load_model(&cli.model)?;
    if cli.print_automata {
        output::print_automata(&automata);
    }

    let config = CheckerConfig::default()
        .with_jobs(cli.jobs)
        .with_backend(cli.solver)
        .with_timeout(cli.timeout_ms)
        .with_subsumption(cli.subsumption)
        .with_search(if cli.first {
            SearchMode::FirstSolution
        } else {
            SearchMode::Exhaustive
        })
        .with_errors(if cli.eager_errors {
            ErrorPolicy::Eager
        } else {
            ErrorPolicy::Batch
        });
    let model = mcm.name().to_string();
    let checker = McmChecker::new(automata, &test.initial_writes(), mcm, config);
    let result = checker.check(&test.precision(cli.step_bound), &outcome)?;

    Ok(LitmusRun {
        test: test.name,
        model,
        outcome: outcome.to_string(),
        result,
    })
}

/// Run a check and print its report; returns the verdict.
pub fn run_check(cli: &CliArgs) -> Result<Verdict, DriverError> {
    let start = Instant::now();
    let run = check_litmus(cli)?;
    let walltime = start.elapsed();
    match cli.output_format {
        OutputFormat::Text => {
            output::print_header(&run.test, &run.model, &run.outcome);
            output::print_result(&run.result, cli.verbose);
            output::print_walltime(walltime_millis(walltime));
        }
        OutputFormat::Json => {
            let report = JsonReport::new(
                &run.test,
                &run.model,
                &run.outcome,
                &run.result,
                walltime_millis(walltime),
            );
            print_json_report(&report);
        }
    }
    Ok(run.result.verdict())
}

/// Entry point of `mcm-check`; `args` excludes the program name.
pub fn run(args: &[String]) -> i32 {
    let env_solver = std::env::var(SOLVER_ENV).ok();
    let cli = match parse_args(args, env_solver.as_deref()) {
        Ok(Command::Check(cli)) => cli,
        Ok(Command::Help) => {
            print_usage();
            return EXIT_ALLOWED;
        }
        Ok(Command::Version) => {
            eprintln!("mcm-check {}", env!("CARGO_PKG_VERSION"));
            return EXIT_ALLOWED;
        }
        Err(err) => {
            output::print_error(&err);
            print_usage();
            return EXIT_INCONCLUSIVE;
        }
    };

    init_tracing(cli.verbose);
    match run_check(&cli) {
        Ok(verdict) => exit_code(verdict),
        Err(err) => {
            tracing::debug!(error = ?err, "check aborted");
            output::print_error(&err);
            EXIT_INCONCLUSIVE
        }
    }
}
