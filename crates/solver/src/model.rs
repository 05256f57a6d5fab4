/// A satisfying assignment returned by a backend.
///
/// Values are kept in SMT-LIB text form (`true`, `42`, `(- 3)`) so that
/// subprocess and in-process backends produce interchangeable models.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    /// Variable assignments: `(name, value_string)` pairs.
    pub assignments: Vec<(String, String)>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Create a model from assignment pairs.
    pub fn with_assignments(assignments: Vec<(String, String)>) -> Self {
        Self { assignments }
    }

    /// Look up a variable's value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Boolean value of `name`, if assigned and well-formed.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)?.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Integer value of `name`; accepts both `-3` and `(- 3)`.
    pub fn get_int(&self, name: &str) -> Option<i128> {
        parse_int_value(self.get(name)?)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

fn parse_int_value(text: &str) -> Option<i128> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        let inner = inner.trim();
        let magnitude = inner.strip_prefix('-')?.trim();
        return magnitude.parse::<i128>().ok().map(|n| -n);
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model() {
        let model = Model::new();
        assert!(model.is_empty());
        assert_eq!(model.len(), 0);
        assert_eq!(model.get("x"), None);
    }

    #[test]
    fn typed_accessors() {
        let model = Model::with_assignments(vec![
            ("rf_2_0".to_string(), "true".to_string()),
            ("co_1_3".to_string(), "false".to_string()),
            ("rv_t0_1".to_string(), "42".to_string()),
            ("rv_t1_1".to_string(), "(- 3)".to_string()),
            ("neg".to_string(), "-7".to_string()),
        ]);
        assert_eq!(model.get_bool("rf_2_0"), Some(true));
        assert_eq!(model.get_bool("co_1_3"), Some(false));
        assert_eq!(model.get_bool("rv_t0_1"), None);
        assert_eq!(model.get_int("rv_t0_1"), Some(42));
        assert_eq!(model.get_int("rv_t1_1"), Some(-3));
        assert_eq!(model.get_int("neg"), Some(-7));
        assert_eq!(model.get_int("rf_2_0"), None);
        assert_eq!(model.get_int("missing"), None);
    }

    #[test]
    fn default_is_empty() {
        assert!(Model::default().is_empty());
    }
}
