use std::{collections::HashSet, rc::Rc};

use tcad_syntax::{
    ast::{BinOp, Field, Phrase, PhraseKind, UnaryOp},
    error::{self as syntax_error, Context, Exception},
    lex::unescape,
    location::Location,
};

use crate::{
    environment::{Binding, Environ},
    error::{name_error, ErrorMsg},
    symbol::Symbol,
    types::Value,
};

/// An analysed phrase, ready to be evaluated.
#[derive(Clone, Debug)]
pub struct Expression {
    pub location: Location,
    pub kind: ExprKind,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Constant(Value),
    Local {
        depth: usize,
        index: usize,
    },
    Unary {
        op: UnaryOp,
        arg: Box<Expression>,
    },
    Binary {
        lhs: Box<Expression>,
        op: BinOp,
        rhs: Box<Expression>,
    },
    List(Vec<Expression>),
    Record(Vec<(Symbol, Expression)>),
    Call {
        func: Box<Expression>,
        args: Vec<Expression>,
    },
    Dot {
        object: Box<Expression>,
        field: Symbol,
    },
    If {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    Lambda(Rc<Lambda>),
}

#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Expression,
}

impl Expression {
    fn new(location: &Location, kind: ExprKind) -> Self {
        Self {
            location: location.clone(),
            kind,
        }
    }
}

/// Resolves the identifiers in `phrase` against `env` and checks that it
/// is a well formed expression.
pub fn analyze_expr(phrase: &Phrase, env: &mut Environ) -> Result<Expression, Exception> {
    let loc = &phrase.location;
    let kind = match &phrase.kind {
        PhraseKind::Ident => return analyze_ident(phrase, env),
        PhraseKind::Number => ExprKind::Constant(analyze_number(phrase)?),
        PhraseKind::Str => ExprKind::Constant(Value::from(unescape(phrase.text()).as_str())),
        PhraseKind::Symbol => {
            // Skip the leading #
            let name = decode_name(&phrase.text()[1..]);
            ExprKind::Constant(Symbol::new(&name).into())
        }
        PhraseKind::Unary { op, arg } => ExprKind::Unary {
            op: *op,
            arg: Box::new(analyze_expr(arg, env)?),
        },
        PhraseKind::Binary { lhs, op, rhs } => ExprKind::Binary {
            lhs: Box::new(analyze_expr(lhs, env)?),
            op: *op,
            rhs: Box::new(analyze_expr(rhs, env)?),
        },
        PhraseKind::Paren(items) => match items.as_slice() {
            [item] => return analyze_expr(item, env),
            _ => return Err(Context::at(loc).error(ErrorMsg::NotAnExpression)),
        },
        PhraseKind::List(items) => ExprKind::List(
            items
                .iter()
                .map(|item| analyze_expr(item, env))
                .collect::<Result<_, _>>()?,
        ),
        PhraseKind::Record(fields) => ExprKind::Record(analyze_fields(fields, env)?),
        PhraseKind::Call { func, args } => ExprKind::Call {
            func: Box::new(analyze_expr(func, env)?),
            args: args
                .iter()
                .map(|arg| analyze_expr(arg, env))
                .collect::<Result<_, _>>()?,
        },
        PhraseKind::Dot { object, field } => ExprKind::Dot {
            object: Box::new(analyze_expr(object, env)?),
            field: Symbol::new(field.range()),
        },
        PhraseKind::If {
            condition,
            then_branch,
            else_branch,
        } => ExprKind::If {
            condition: Box::new(analyze_expr(condition, env)?),
            then_branch: Box::new(analyze_expr(then_branch, env)?),
            else_branch: Box::new(analyze_expr(else_branch, env)?),
        },
        PhraseKind::Lambda { params, body } => ExprKind::Lambda(analyze_lambda(params, body, env)?),
        PhraseKind::Definition { .. } => {
            return Err(Context::at(loc).error(ErrorMsg::NotAnExpression))
        }
    };
    Ok(Expression::new(loc, kind))
}

fn analyze_ident(phrase: &Phrase, env: &Environ) -> Result<Expression, Exception> {
    let name = phrase.text();
    let kind = match env.lookup(name) {
        Some(Binding::Local { depth, index }) => ExprKind::Local { depth, index },
        Some(Binding::Global(value)) => ExprKind::Constant(value),
        None => {
            return Err(name_error(
                &Context::at(&phrase.location),
                name,
                ErrorMsg::NotDefined,
            ))
        }
    };
    Ok(Expression::new(&phrase.location, kind))
}

fn analyze_number(phrase: &Phrase) -> Result<Value, Exception> {
    phrase
        .text()
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| Context::at(&phrase.location).error(syntax_error::ErrorMsg::MalformedNumber))
}

fn analyze_fields(
    fields: &[Field],
    env: &mut Environ,
) -> Result<Vec<(Symbol, Expression)>, Exception> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let name = decode_name(field.name.range());
        if !seen.insert(name.clone()) {
            return Err(name_error(
                &Context::at(&field.name),
                &name,
                ErrorMsg::DuplicateField,
            ));
        }
        out.push((Symbol::new(&name), analyze_expr(&field.value, env)?));
    }
    Ok(out)
}

/// A field or symbol name, written either bare or as a string literal.
fn decode_name(text: &str) -> String {
    if text.starts_with('"') {
        unescape(text)
    } else {
        text.to_string()
    }
}

fn analyze_lambda(
    params: &Phrase,
    body: &Phrase,
    env: &mut Environ,
) -> Result<Rc<Lambda>, Exception> {
    let names = analyze_params(params)?;
    env.init_scope(names.clone());
    let body = analyze_expr(body, env);
    env.end_scope();
    Ok(Rc::new(Lambda {
        params: names,
        body: body?,
    }))
}

/// `x` or `(x, y, ...)`, with distinct names.
fn analyze_params(params: &Phrase) -> Result<Vec<String>, Exception> {
    let items = match &params.kind {
        PhraseKind::Ident => std::slice::from_ref(params),
        PhraseKind::Paren(items) => items.as_slice(),
        _ => return Err(Context::at(&params.location).error(ErrorMsg::NotAParameter)),
    };
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if item.kind != PhraseKind::Ident {
            return Err(Context::at(&item.location).error(ErrorMsg::NotAParameter));
        }
        let name = item.text();
        if names.iter().any(|n| n == name) {
            return Err(name_error(
                &Context::at(&item.location),
                name,
                ErrorMsg::DuplicateParam,
            ));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Namespace;
    use tcad_syntax::{parse::parse, script::Script};

    fn analyze(input: &str) -> Result<Expression, Exception> {
        let script = Rc::new(Script::new("<test>", input));
        let phrase = parse(&script)?.expect("input must not be blank");
        let names = Namespace::new();
        analyze_expr(&phrase, &mut Environ::new(&names))
    }

    fn analyze_err_test(input: &str, expected: &str) {
        assert_eq!(analyze(input).unwrap_err().to_string(), expected);
    }

    #[test]
    fn constants() {
        let expr = analyze("\"a\\nb\"").unwrap();
        assert!(matches!(&expr.kind, ExprKind::Constant(Value::Str(s)) if &**s == "a\nb"));
        let expr = analyze("#tag").unwrap();
        assert!(matches!(&expr.kind, ExprKind::Constant(Value::Symbol(s)) if s.as_str() == "tag"));
        let expr = analyze("#\"b c\"").unwrap();
        assert!(matches!(&expr.kind, ExprKind::Constant(Value::Symbol(s)) if s.as_str() == "b c"));
        // Builtins are captured by value
        let expr = analyze("pi").unwrap();
        assert!(matches!(&expr.kind, ExprKind::Constant(Value::Number(_))));
    }

    #[test]
    fn lambda_locals() {
        let expr = analyze("(a, b) -> c -> a").unwrap();
        let ExprKind::Lambda(outer) = &expr.kind else {
            panic!("expected a lambda, found {expr:?}");
        };
        assert_eq!(outer.params, vec!["a", "b"]);
        let ExprKind::Lambda(inner) = &outer.body.kind else {
            panic!("expected a lambda, found {:?}", outer.body);
        };
        assert!(matches!(
            inner.body.kind,
            ExprKind::Local { depth: 1, index: 0 }
        ));
    }

    #[test]
    fn record_fields() {
        let expr = analyze("{a: 1, \"b c\": 2}").unwrap();
        let ExprKind::Record(fields) = &expr.kind else {
            panic!("expected a record, found {expr:?}");
        };
        let names: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a", "b c"]);
    }

    #[test]
    fn errors() {
        analyze_err_test("1 + y", "<test>:1:5: y: not defined");
        analyze_err_test("x -> y", "<test>:1:6: y: not defined");
        analyze_err_test("(1, 2)", "<test>:1:1: not an expression");
        analyze_err_test("()", "<test>:1:1: not an expression");
        analyze_err_test("1 -> 2", "<test>:1:1: not a parameter");
        analyze_err_test("(a, 1) -> 2", "<test>:1:5: not a parameter");
        analyze_err_test("(a, a) -> a", "<test>:1:5: a: duplicate parameter");
        analyze_err_test("{a: 1, a: 2}", "<test>:1:8: a: duplicate field");
    }
}
