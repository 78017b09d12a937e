use std::{
    io::Write,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use log::{debug, trace};
use rustyline::{error::ReadlineError, DefaultEditor};
use tcad_syntax::{
    ast::{Phrase, PhraseKind},
    error::Context,
    parse::parse,
    script::Script,
};

use crate::{
    environment::{Environ, Namespace},
    error::{Error, ErrorMsg},
    interpret::eval,
    interrupt::Interrupt,
    resolve::analyze_expr,
    stdlib::builtin_namespace,
    types::Value,
};

pub const PROMPT: &str = "tcad> ";
/// Name given to every script read from the terminal.
pub const SCRIPT_NAME: &str = "<stdin>";

/// One attempt at reading a line.
#[derive(Debug, PartialEq)]
pub enum Input {
    Line(String),
    /// The read was aborted by the user, any partial line is gone.
    Interrupted,
    Eof,
}

pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Input, Error>;
}

/// Terminal line reader with editing and in-memory history.
pub struct Editor {
    editor: DefaultEditor,
    interrupt: Interrupt,
}

impl Editor {
    pub fn new(interrupt: Interrupt) -> Result<Self, Error> {
        let editor = DefaultEditor::new().map_err(|e| Error::Generic(e.to_string()))?;
        Ok(Self { editor, interrupt })
    }
}

impl LineReader for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<Input, Error> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        debug!("Failed to add history entry: {e}");
                    }
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => {
                self.interrupt.set();
                Ok(Input::Interrupted)
            }
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(e) => Err(Error::Generic(e.to_string())),
        }
    }
}

/// What a successfully evaluated line produced.
#[derive(Debug)]
pub enum Outcome {
    Blank,
    Defined { name: String, value: Value },
    Value(Value),
}

/// A read-eval-print session. Definitions accumulate in the namespace
/// for as long as the session lives.
#[derive(Debug)]
pub struct Session {
    names: Namespace,
    interrupt: Interrupt,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            names: builtin_namespace(),
            interrupt: Interrupt::new(),
        }
    }

    /// The token raised when the user interrupts, by the line reader or by
    /// a signal handler. It is observed once per line, after the read.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn names(&self) -> &Namespace {
        &self.names
    }

    /// Reads and evaluates lines until end of input. Diagnostics are
    /// written to `out` and never end the session, only a failing reader
    /// or output stream does.
    pub fn run(
        &mut self,
        reader: &mut impl LineReader,
        out: &mut impl Write,
    ) -> Result<(), Error> {
        loop {
            self.interrupt.clear();
            let line = match reader.read_line(PROMPT)? {
                Input::Eof => {
                    writeln!(out)?;
                    return Ok(());
                }
                Input::Line(line) if !self.interrupt.is_set() => line,
                // A line read while an interrupt arrived is discarded
                Input::Line(_) | Input::Interrupted => {
                    debug!("Read interrupted");
                    writeln!(out)?;
                    continue;
                }
            };
            match self.eval_line(&line) {
                Ok(Outcome::Value(value)) => writeln!(out, "{value}")?,
                Ok(Outcome::Blank | Outcome::Defined { .. }) => (),
                Err(e) => writeln!(out, "{e:#}")?,
            }
            out.flush()?;
        }
    }

    /// Evaluates one line as its own script. A definition is bound only if
    /// its right side evaluates successfully.
    pub fn eval_line(&mut self, line: &str) -> Result<Outcome, Error> {
        let script = Rc::new(Script::new(SCRIPT_NAME, line));
        let names = &self.names;
        let outcome = guard(|| eval_script(&script, names))?;
        if let Outcome::Defined { name, value } = &outcome {
            self.names.set(name, value.clone());
        }
        Ok(outcome)
    }
}

fn eval_script(script: &Rc<Script>, names: &Namespace) -> Result<Outcome, Error> {
    let Some(phrase) = parse(script)? else {
        return Ok(Outcome::Blank);
    };
    if let PhraseKind::Definition {
        left,
        equate,
        right,
    } = &phrase.kind
    {
        if left.kind != PhraseKind::Ident {
            return Err(Context::at(equate).error(ErrorMsg::NotAnIdentifier).into());
        }
        let value = eval_phrase(right, names)?;
        return Ok(Outcome::Defined {
            name: left.text().to_string(),
            value,
        });
    }
    Ok(Outcome::Value(eval_phrase(&phrase, names)?))
}

fn eval_phrase(phrase: &Phrase, names: &Namespace) -> Result<Value, Error> {
    trace!("Analyzing {phrase}");
    let expr = analyze_expr(phrase, &mut Environ::new(names))?;
    trace!("Evaluating {expr:?}");
    Ok(eval(&expr)?)
}

/// Runs `f`, turning a panic into a generic failure so that one bad line
/// cannot end the session.
fn guard<T>(f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let msg = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg.to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "internal failure".to_string()
        };
        Err(Error::Generic(msg))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned input, then reports end of input.
    struct Scripted(VecDeque<Input>);

    impl Scripted {
        fn lines(lines: &[&str]) -> Self {
            Self(lines.iter().map(|l| Input::Line(l.to_string())).collect())
        }
    }

    impl LineReader for Scripted {
        fn read_line(&mut self, prompt: &str) -> Result<Input, Error> {
            assert_eq!(prompt, PROMPT);
            Ok(self.0.pop_front().unwrap_or(Input::Eof))
        }
    }

    struct Broken;

    impl LineReader for Broken {
        fn read_line(&mut self, _: &str) -> Result<Input, Error> {
            Err(Error::Generic("terminal went away".to_string()))
        }
    }

    fn run(reader: &mut impl LineReader) -> String {
        let mut session = Session::new();
        let mut out = Vec::new();
        session.run(reader, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn run_test(lines: &[&str], expected: &str) {
        assert_eq!(run(&mut Scripted::lines(lines)), expected);
    }

    #[test]
    fn definition_then_use() {
        run_test(&["x = 3", "x"], "3\n\n");
    }

    #[test]
    fn blank_lines() {
        run_test(&["", "   ", "// only a comment"], "\n");
    }

    #[test]
    fn undefined_name_recovers() {
        run_test(
            &["y", "1 + 1"],
            "<stdin>:1:1: y: not defined\ny\n^\n2\n\n",
        );
    }

    #[test]
    fn definition_needs_identifier() {
        run_test(
            &["3 = 4", "x"],
            "<stdin>:1:3: = not preceded by identifier\n3 = 4\n  ^\n\
             <stdin>:1:1: x: not defined\nx\n^\n\n",
        );
    }

    #[test]
    fn syntax_error_recovers() {
        run_test(
            &["(1 +", "2"],
            "<stdin>:1:5: unexpected token\n(1 +\n    ^\n2\n\n",
        );
        run_test(
            &["{a: 1}.b"],
            "<stdin>:1:1: {a:1} does not contain field .b\n{a: 1}.b\n^^^^^^^^\n\n",
        );
    }

    #[test]
    fn deep_nesting_recovers() {
        let mut session = Session::new();
        session.eval_line("x = 1").unwrap();
        let parens = format!("{}x{}", "(".repeat(3000), ")".repeat(3000));
        let chain = vec!["x"; 50000].join("+");
        let negations = format!("y = {}x", "-".repeat(3000));
        for line in [parens, chain, negations] {
            let err = session.eval_line(&line).unwrap_err();
            assert!(
                err.to_string().ends_with(": expression too deeply nested"),
                "{err}"
            );
        }
        assert!(!session.names().contains("y"));
        let Outcome::Value(x) = session.eval_line("x + 1").unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(x.to_string(), "2");
    }

    #[test]
    fn interrupt_continues() {
        let mut reader = Scripted(VecDeque::from([
            Input::Interrupted,
            Input::Line("1".to_string()),
        ]));
        assert_eq!(run(&mut reader), "\n1\n\n");
    }

    /// Raises the interrupt during the first read but still hands back the
    /// line, as when a signal arrives while the line is being read.
    struct Signalled {
        interrupt: Interrupt,
        lines: Scripted,
        reads: usize,
    }

    impl LineReader for Signalled {
        fn read_line(&mut self, prompt: &str) -> Result<Input, Error> {
            if self.reads == 0 {
                self.interrupt.set();
            }
            self.reads += 1;
            self.lines.read_line(prompt)
        }
    }

    #[test]
    fn interrupted_line_is_discarded() {
        let mut session = Session::new();
        let mut reader = Signalled {
            interrupt: session.interrupt().clone(),
            lines: Scripted::lines(&["1 +", "2"]),
            reads: 0,
        };
        let mut out = Vec::new();
        session.run(&mut reader, &mut out).unwrap();
        // The flag is cleared again before the second read
        assert_eq!(String::from_utf8(out).unwrap(), "\n2\n\n");
        assert!(!session.interrupt().is_set());
    }

    #[test]
    fn reader_failure_ends_session() {
        let mut session = Session::new();
        let err = session.run(&mut Broken, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "ERROR: terminal went away");
    }

    #[test]
    fn failed_definition_leaves_namespace() {
        let mut session = Session::new();
        session.eval_line("x = 1").unwrap();
        let size = session.names().len();
        assert!(session.eval_line("x = 1 + #a").is_err());
        assert!(session.eval_line("z = z").is_err());
        assert_eq!(session.names().len(), size);
        assert!(!session.names().contains("z"));
        let Outcome::Value(x) = session.eval_line("x").unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(x.to_string(), "1");
    }

    #[test]
    fn redefinition() {
        run_test(&["x = 1", "x = x + 1", "x"], "2\n\n");
    }

    #[test]
    fn closures_outlive_their_line() {
        run_test(&["f = x -> x * 2", "g = y -> f(y) + 1", "g(20)"], "41\n\n");
    }

    #[test]
    fn record_print_reparses() {
        let mut session = Session::new();
        session
            .eval_line("r = {a: 1, \"b c\": [#x, \"s\\n\"], d: {e: null}}")
            .unwrap();
        let Outcome::Value(printed) = session.eval_line("r").unwrap() else {
            panic!("expected a value");
        };
        let printed = printed.to_string();
        assert_eq!(printed, "{a:1,\"b c\":[#x,\"s\\n\"],d:{e:null}}");
        let Outcome::Value(same) = session.eval_line(&format!("r == {printed}")).unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(same.to_string(), "true");
    }

    #[test]
    fn quoted_symbols_reparse() {
        run_test(
            &[
                "r = {a: tag({\"b c\": 1})}",
                "r",
                "r == {a: #\"b c\"}",
                "fields({\"if\": 1, x: 2})",
            ],
            "{a:#\"b c\"}\ntrue\n[#\"if\",#x]\n\n",
        );
    }

    #[test]
    fn panics_become_generic_errors() {
        let err = guard::<()>(|| panic!("boom")).unwrap_err();
        assert_eq!(err.to_string(), "ERROR: boom");
        let err = guard::<()>(|| panic!("{} failed", "lookup")).unwrap_err();
        assert_eq!(err.to_string(), "ERROR: lookup failed");
    }
}
