use crate::model::Model;

/// Result of one satisfiability query.
///
/// For the memory-model checker, `Sat` means a consistent execution exists
/// for the queried terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverResult {
    /// Satisfiable, with a model when the backend produced one.
    Sat(Option<Model>),
    /// Unsatisfiable.
    Unsat,
    /// Solver couldn't determine (timeout, resource limit, unsupported domain).
    Unknown(String),
}

impl SolverResult {
    /// Returns `true` if the result is `Sat`.
    pub fn is_sat(&self) -> bool {
        matches!(self, SolverResult::Sat(_))
    }

    /// Returns `true` if the result is `Unsat`.
    pub fn is_unsat(&self) -> bool {
        matches!(self, SolverResult::Unsat)
    }

    /// Returns `true` if the result is `Unknown`.
    pub fn is_unknown(&self) -> bool {
        matches!(self, SolverResult::Unknown(_))
    }

    /// Returns the model if the result is `Sat` with a model.
    pub fn model(&self) -> Option<&Model> {
        match self {
            SolverResult::Sat(Some(model)) => Some(model),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_are_exclusive() {
        let all = [
            SolverResult::Sat(None),
            SolverResult::Unsat,
            SolverResult::Unknown("timeout".to_string()),
        ];
        for r in &all {
            let hits = [r.is_sat(), r.is_unsat(), r.is_unknown()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(hits, 1, "{r:?}");
        }
    }

    #[test]
    fn model_accessor() {
        let model = Model::with_assignments(vec![("rv_t0_0".to_string(), "1".to_string())]);
        let sat_with = SolverResult::Sat(Some(model.clone()));
        assert_eq!(sat_with.model(), Some(&model));
        assert_eq!(SolverResult::Sat(None).model(), None);
        assert_eq!(SolverResult::Unsat.model(), None);
    }
}
