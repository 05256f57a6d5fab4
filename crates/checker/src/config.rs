use mcm_solver::backend::BackendKind;

/// Whether to stop at the first consistent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Exhaustive,
    /// Stop expanding and skip pending queries after the first solution.
    FirstSolution,
}

/// What a solver failure does to the rest of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Record the failure and keep checking.
    #[default]
    Batch,
    /// Abort the check with the first failure.
    Eager,
}

/// Checker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    pub search: SearchMode,
    pub errors: ErrorPolicy,
    /// Prune states covered by a visited state. Off by default: covering
    /// relies on the transition functions being monotone.
    pub subsumption: bool,
    /// Worker threads for expansion and solver queries.
    pub jobs: usize,
    pub backend: BackendKind,
    /// Per-query solver timeout in milliseconds (0 = none).
    pub timeout_ms: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            search: SearchMode::default(),
            errors: ErrorPolicy::default(),
            subsumption: false,
            jobs: default_jobs(),
            backend: BackendKind::default(),
            timeout_ms: 30_000,
        }
    }
}

impl CheckerConfig {
    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    pub fn with_errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_subsumption(mut self, enabled: bool) -> Self {
        self.subsumption = enabled;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Half the available cores, at least one.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}
