use crate::command::Command;
use crate::sort::Sort;
use crate::term::Term;

/// An SMT-LIB script: a sequence of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn extend(&mut self, cmds: impl IntoIterator<Item = Command>) {
        self.commands.extend(cmds);
    }

    /// Append `(declare-const name sort)`.
    pub fn declare_const(&mut self, name: impl Into<String>, sort: Sort) {
        self.commands.push(Command::DeclareConst(name.into(), sort));
    }

    /// Append `(assert term)` unless the term is literally `true`.
    pub fn assert(&mut self, term: Term) {
        if term != Term::BoolLit(true) {
            self.commands.push(Command::Assert(term));
        }
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.commands.push(Command::Comment(text.into()));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Nullary constants declared by the script, in declaration order.
    pub fn declared_consts(&self) -> impl Iterator<Item = (&str, &Sort)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DeclareConst(name, sort) => Some((name.as_str(), sort)),
            Command::DeclareFun(name, params, sort) if params.is_empty() => {
                Some((name.as_str(), sort))
            }
            _ => None,
        })
    }

    /// Asserted formulas, in order.
    pub fn assertions(&self) -> impl Iterator<Item = &Term> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Assert(t) => Some(t),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_empty_script() {
        let script = Script::new();
        assert!(script.is_empty());
        assert_eq!(script.len(), 0);
        assert!(script.commands().is_empty());
    }

    #[test]
    fn with_commands_creates_script() {
        let cmds = vec![
            Command::SetLogic("QF_LIA".to_string()),
            Command::DeclareConst("x".to_string(), Sort::Int),
            Command::CheckSat,
        ];
        let script = Script::with_commands(cmds);
        assert_eq!(script.len(), 3);
        assert!(!script.is_empty());
    }

    #[test]
    fn assert_skips_trivially_true() {
        let mut script = Script::new();
        script.assert(Term::BoolLit(true));
        assert!(script.is_empty());
        script.assert(Term::var("rf_1_0"));
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn declared_consts_includes_nullary_funs() {
        let mut script = Script::new();
        script.declare_const("rf_3_1", Sort::Bool);
        script.push(Command::DeclareFun("rv_t0_0".into(), vec![], Sort::Int));
        script.push(Command::DeclareFun("f".into(), vec![Sort::Int], Sort::Int));
        script.push(Command::CheckSat);
        let names: Vec<_> = script.declared_consts().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["rf_3_1", "rv_t0_0"]);
    }

    #[test]
    fn assertions_preserve_order() {
        let mut script = Script::new();
        script.declare_const("a", Sort::Bool);
        script.assert(Term::var("a"));
        script.comment("separator");
        script.assert(Term::not(Term::var("a")));
        let asserted: Vec<_> = script.assertions().cloned().collect();
        assert_eq!(asserted, vec![Term::var("a"), Term::not(Term::var("a"))]);
    }

    #[test]
    fn extend_after_push() {
        let mut script = Script::new();
        script.push(Command::SetLogic("QF_LIA".to_string()));
        script.extend(vec![Command::CheckSat, Command::GetModel]);
        assert_eq!(script.len(), 3);
        assert!(matches!(&script.commands()[0], Command::SetLogic(_)));
        assert_eq!(script.commands()[1], Command::CheckSat);
        assert_eq!(script.commands()[2], Command::GetModel);
    }

    #[test]
    fn into_commands_returns_vec() {
        let mut script = Script::new();
        script.push(Command::CheckSat);
        script.push(Command::Exit);
        let cmds = script.into_commands();
        assert_eq!(cmds, vec![Command::CheckSat, Command::Exit]);
    }
}
