//! mcm-check: decide whether a litmus test outcome is allowed by a memory
//! model.
//!
//! Usage:
//!   mcm-check --litmus sb.json --model tso
//!
//! Exit status is 0 when the outcome is allowed, 1 when it is forbidden and
//! 2 when the check is inconclusive or fails.

use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = mcm_driver::run(&args);
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}
