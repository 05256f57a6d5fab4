//! Queried final states.
//!
//! An outcome is a conjunction of atoms over final register values and
//! final (coherence-last) memory values, written litmus style:
//! `0:r0=1 /\ 1:r0=0 /\ x=2`. The empty outcome matches every execution.

use std::fmt;
use std::str::FromStr;

use crate::composition::Composition;
use crate::error::CheckError;
use crate::graph::ResolvedGraph;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutcomeAtom {
    Register {
        process: usize,
        register: String,
        value: i128,
    },
    Memory {
        var: String,
        value: i128,
    },
}

impl fmt::Display for OutcomeAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeAtom::Register {
                process,
                register,
                value,
            } => write!(f, "{process}:{register}={value}"),
            OutcomeAtom::Memory { var, value } => write!(f, "{var}={value}"),
        }
    }
}

impl FromStr for OutcomeAtom {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CheckError::InvalidOutcome(format!("cannot parse atom '{s}'"));
        let (lhs, rhs) = s.split_once('=').ok_or_else(invalid)?;
        let value: i128 = rhs.trim().parse().map_err(|_| invalid())?;
        let lhs = lhs.trim();
        match lhs.split_once(':') {
            Some((process, register)) => Ok(OutcomeAtom::Register {
                process: process.trim().parse().map_err(|_| invalid())?,
                register: register.trim().to_string(),
                value,
            }),
            None if !lhs.is_empty() => Ok(OutcomeAtom::Memory {
                var: lhs.to_string(),
                value,
            }),
            None => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    atoms: Vec<OutcomeAtom>,
}

impl Outcome {
    /// The outcome every execution satisfies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(atoms: Vec<OutcomeAtom>) -> Self {
        Self { atoms }
    }

    pub fn with_register(mut self, process: usize, register: impl Into<String>, value: i128) -> Self {
        self.atoms.push(OutcomeAtom::Register {
            process,
            register: register.into(),
            value,
        });
        self
    }

    pub fn with_memory(mut self, var: impl Into<String>, value: i128) -> Self {
        self.atoms.push(OutcomeAtom::Memory {
            var: var.into(),
            value,
        });
        self
    }

    pub fn atoms(&self) -> &[OutcomeAtom] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Every atom must refer to an existing process and one of its
    /// registers, or to a shared variable of the program.
    pub fn validate(&self, composition: &Composition) -> Result<(), CheckError> {
        for atom in &self.atoms {
            match atom {
                OutcomeAtom::Register {
                    process, register, ..
                } => {
                    let wrapper = composition.processes().get(*process).ok_or_else(|| {
                        CheckError::InvalidOutcome(format!("no process {process} in '{atom}'"))
                    })?;
                    if !wrapper.automaton().registers().contains(register) {
                        return Err(CheckError::InvalidOutcome(format!(
                            "process {process} ({}) has no register '{register}'",
                            wrapper.automaton().name()
                        )));
                    }
                }
                OutcomeAtom::Memory { var, .. } => {
                    if !composition.initial_writes().contains_key(var) {
                        return Err(CheckError::InvalidOutcome(format!(
                            "no shared variable '{var}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a resolved execution exhibits this outcome.
    pub fn holds_in(&self, resolved: &ResolvedGraph) -> bool {
        self.atoms.iter().all(|atom| match atom {
            OutcomeAtom::Register {
                process,
                register,
                value,
            } => resolved
                .final_registers
                .get(*process)
                .map(|regs| regs.get(register).copied().unwrap_or(0) == *value)
                .unwrap_or(false),
            OutcomeAtom::Memory { var, value } => resolved.final_memory.get(var) == Some(value),
        })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.atoms.is_empty() {
            return write!(f, "true");
        }
        let atoms: Vec<String> = self.atoms.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", atoms.join(" /\\ "))
    }
}

impl FromStr for Outcome {
    type Err = CheckError;

    /// Atoms separated by `/\`, `&&` or `,`. Blank input and `true` are
    /// the empty outcome.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "true" {
            return Ok(Outcome::any());
        }
        let atoms = trimmed
            .replace("/\\", ",")
            .replace("&&", ",")
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<OutcomeAtom>, _>>()?;
        Ok(Outcome::new(atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Label, ProcessAutomaton};
    use mcm_smtlib::term::Term;
    use std::sync::Arc;

    fn composition() -> Composition {
        Composition::new(
            vec![Arc::new(ProcessAutomaton::straight_line(
                "P0",
                vec![
                    Label::Load("r0".into(), "x".into()),
                    Label::Store("y".into(), Term::int(1)),
                ],
            ))],
            &[],
        )
    }

    #[test]
    fn parse_and_display() {
        let o: Outcome = "0:r0=1 /\\ 1:r1 = -2 /\\ x=3".parse().unwrap();
        assert_eq!(
            o,
            Outcome::any()
                .with_register(0, "r0", 1)
                .with_register(1, "r1", -2)
                .with_memory("x", 3)
        );
        assert_eq!(o.to_string(), "0:r0=1 /\\ 1:r1=-2 /\\ x=3");
        assert_eq!("true".parse::<Outcome>().unwrap(), Outcome::any());
        assert!("0:r0".parse::<Outcome>().is_err());
        assert!("=1".parse::<Outcome>().is_err());
    }

    #[test]
    fn validate_checks_names() {
        let comp = composition();
        assert!(Outcome::any().with_register(0, "r0", 1).validate(&comp).is_ok());
        assert!(Outcome::any().with_memory("y", 1).validate(&comp).is_ok());
        assert!(matches!(
            Outcome::any().with_register(1, "r0", 1).validate(&comp),
            Err(CheckError::InvalidOutcome(_))
        ));
        assert!(matches!(
            Outcome::any().with_register(0, "r7", 1).validate(&comp),
            Err(CheckError::InvalidOutcome(_))
        ));
        assert!(matches!(
            Outcome::any().with_memory("z", 0).validate(&comp),
            Err(CheckError::InvalidOutcome(_))
        ));
    }
}
