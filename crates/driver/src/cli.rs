//! Command-line arguments of `mcm-check`.

use std::path::PathBuf;

use mcm_checker::config::default_jobs;
use mcm_solver::BackendKind;

use crate::error::DriverError;

/// Environment variable selecting the default solver backend.
pub const SOLVER_ENV: &str = "MCM_SOLVER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub litmus: PathBuf,
    /// Built-in model name or path to a JSON model.
    pub model: String,
    pub solver: BackendKind,
    /// Per-query timeout in milliseconds.
    pub timeout_ms: u64,
    pub jobs: usize,
    pub first: bool,
    pub subsumption: bool,
    pub eager_errors: bool,
    pub step_bound: Option<usize>,
    pub output_format: OutputFormat,
    pub print_automata: bool,
    pub verbose: bool,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Check(Box<CliArgs>),
    Help,
    Version,
}

fn parse_value<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, DriverError> {
    raw.parse()
        .map_err(|_| DriverError::Usage(format!("invalid value '{raw}' for {flag}")))
}

/// Parse arguments (without the program name). `env_solver` is the value
/// of [`SOLVER_ENV`], if set; `--solver` wins over it.
pub fn parse_args(args: &[String], env_solver: Option<&str>) -> Result<Command, DriverError> {
    let mut litmus = None;
    let mut model = "sc".to_string();
    let mut solver = None;
    let mut timeout_ms = 30_000;
    let mut jobs = default_jobs();
    let mut first = false;
    let mut subsumption = false;
    let mut eager_errors = false;
    let mut step_bound = None;
    let mut output_format = OutputFormat::Text;
    let mut print_automata = false;
    let mut verbose = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| DriverError::Usage(format!("{flag} needs a value")))
        };
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--litmus" => litmus = Some(PathBuf::from(value()?)),
            "--model" => model = value()?,
            "--solver" => {
                let raw = value()?;
                solver = Some(raw.parse::<BackendKind>().map_err(DriverError::Usage)?);
            }
            "--timeout" => timeout_ms = parse_value(flag, &value()?)?,
            "--jobs" => jobs = parse_value::<usize>(flag, &value()?)?.max(1),
            "--step-bound" => step_bound = Some(parse_value(flag, &value()?)?),
            "--output-format" => {
                output_format = match value()?.as_str() {
                    "text" => OutputFormat::Text,
                    "json" => OutputFormat::Json,
                    other => {
                        return Err(DriverError::Usage(format!(
                            "unknown output format '{other}' (expected text or json)"
                        )));
                    }
                }
            }
            "--first" => first = true,
            "--subsumption" => subsumption = true,
            "--eager-errors" => eager_errors = true,
            "--print-automata" => print_automata = true,
            "--verbose" | "-v" => verbose = true,
            other if other.starts_with('-') => {
                return Err(DriverError::Usage(format!("unknown option '{other}'")));
            }
            // A bare argument is the litmus file.
            path => litmus = Some(PathBuf::from(path)),
        }
    }

    let solver = match (solver, env_solver) {
        (Some(kind), _) => kind,
        (None, Some(raw)) => raw.parse().map_err(DriverError::Usage)?,
        (None, None) => BackendKind::default(),
    };
    let litmus = litmus.ok_or_else(|| DriverError::Usage("no litmus test given".to_string()))?;

    Ok(Command::Check(Box::new(CliArgs {
        litmus,
        model,
        solver,
        timeout_ms,
        jobs,
        first,
        subsumption,
        eager_errors,
        step_bound,
        output_format,
        print_automata,
        verbose,
    })))
}

pub fn print_usage() {
    eprintln!("mcm-check: bounded memory-model checking of litmus tests");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    mcm-check [OPTIONS] --litmus <FILE>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    --litmus <FILE>             Litmus test in JSON");
    eprintln!("    --model <NAME|FILE>         sc, tso, ra, coherence or a JSON model (default: sc)");
    eprintln!(
        "    --solver <NAME>             builtin, z3, cvc5, yices or z3-native (default: builtin, or ${SOLVER_ENV})"
    );
    eprintln!("    --timeout <MS>              Per-query solver timeout (default: 30000)");
    eprintln!("    --jobs <N>                  Worker threads (default: num_cpus/2)");
    eprintln!("    --first                     Stop at the first witness");
    eprintln!("    --subsumption               Prune states covered by visited ones");
    eprintln!("    --eager-errors              Abort on the first solver failure");
    eprintln!("    --step-bound <N>            Per-thread step bound for loops");
    eprintln!("    --output-format <FORMAT>    text or json (default: text)");
    eprintln!("    --print-automata            Print the compiled thread automata");
    eprintln!("    --verbose, -v               Debug logging and all witnesses");
    eprintln!();
    eprintln!("EXIT STATUS:");
    eprintln!("    0 allowed, 1 forbidden, 2 inconclusive or error");
}
