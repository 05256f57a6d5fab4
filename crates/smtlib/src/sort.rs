/// SMT-LIB sort (type) representation.
///
/// Memory-model queries only need Booleans (edge choices, relation membership)
/// and mathematical integers (observed and written values).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Mathematical integer sort
    Int,
    /// Uninterpreted sort
    Uninterpreted(String),
}
