use std::rc::Rc;

use tcad_syntax::error::{Context, Exception};

use crate::{
    environment::Namespace,
    error::{value_error, ErrorMsg},
    record::value_to_variant,
    types::{NativeBody, NativeFunc, Value},
};

/// A fresh namespace holding only the builtins.
pub fn builtin_namespace() -> Namespace {
    Namespace::new()
}

pub fn init(names: &mut Namespace) {
    init_constants(names);
    init_math(names);
    init_aggregates(names);
    init_variants(names);
}

fn define(
    names: &mut Namespace,
    name: &'static str,
    params: &'static [&'static str],
    body: NativeBody,
) {
    names.set(name, Value::NativeFunc(NativeFunc { name, params, body }));
}

fn init_constants(names: &mut Namespace) {
    names.set("true", Value::Boolean(true));
    names.set("false", Value::Boolean(false));
    names.set("null", Value::Null);
    names.set("pi", Value::Number(std::f64::consts::PI));
    names.set("tau", Value::Number(std::f64::consts::TAU));
    names.set("inf", Value::Number(f64::INFINITY));
}

fn init_math(names: &mut Namespace) {
    define(names, "sqrt", &["x"], |args, cxs| {
        Ok(args[0].to_num(&cxs[0])?.sqrt().into())
    });
    define(names, "abs", &["x"], |args, cxs| {
        Ok(args[0].to_num(&cxs[0])?.abs().into())
    });
    define(names, "floor", &["x"], |args, cxs| {
        Ok(args[0].to_num(&cxs[0])?.floor().into())
    });
    define(names, "max", &["a", "b"], |args, cxs| {
        Ok(args[0].to_num(&cxs[0])?.max(args[1].to_num(&cxs[1])?).into())
    });
    define(names, "min", &["a", "b"], |args, cxs| {
        Ok(args[0].to_num(&cxs[0])?.min(args[1].to_num(&cxs[1])?).into())
    });
}

fn init_aggregates(names: &mut Namespace) {
    // count(list | record | string)
    define(names, "count", &["x"], |args, cxs| {
        let n = match &args[0] {
            Value::List(items) => items.len(),
            Value::Record(r) => r.size(),
            Value::Str(s) => s.chars().count(),
            val => return Err(value_error(&cxs[0], val, ErrorMsg::ExpectedCountable)),
        };
        Ok(Value::Number(n as f64))
    });
    define(names, "fields", &["record"], |args, cxs| {
        let record = args[0].to_record(&cxs[0])?;
        let keys = record.fields().iter().cloned().map(Value::Symbol).collect();
        Ok(Value::List(Rc::new(keys)))
    });
    define(names, "values", &["record"], |args, cxs| {
        let record = args[0].to_record(&cxs[0])?;
        let mut values = Vec::with_capacity(record.size());
        record.each_field(&cxs[0], &mut |_, val| {
            values.push(val);
            Ok(())
        })?;
        Ok(Value::List(Rc::new(values)))
    });
    define(names, "has_field", &["record", "key"], |args, cxs| {
        let record = args[0].to_record(&cxs[0])?;
        let key = args[1].to_symbol(&cxs[1])?;
        Ok(record.hasfield(key).into())
    });
    // update(record, #key, value) copies the record with one field replaced
    define(names, "update", &["record", "key", "value"], |args, cxs| {
        let key = args[1].to_symbol(&cxs[1])?;
        let mut copy = args[0].to_record(&cxs[0])?.clone_record();
        *copy.ref_field(key, true, &cxs[1])? = args[2].clone();
        Ok(Value::Record(Rc::from(copy)))
    });
}

fn init_variants(names: &mut Namespace) {
    define(names, "is_variant", &["value"], |args, cxs| {
        Ok(value_to_variant(&args[0], &cxs[0]).is_ok().into())
    });
    define(names, "tag", &["variant"], |args, cxs| {
        let (tag, _) = value_to_variant(&args[0], &cxs[0])?;
        Ok(tag.into())
    });
    define(names, "payload", &["variant"], payload);
}

fn payload(args: &[Value], cxs: &[Context]) -> Result<Value, Exception> {
    let (_, payload) = value_to_variant(&args[0], &cxs[0])?;
    if payload.is_missing() {
        return Err(value_error(&cxs[0], &args[0], ErrorMsg::NoPayload));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{environment::Environ, interpret::eval, resolve::analyze_expr};
    use tcad_syntax::{parse::parse, script::Script};

    fn eval_str(input: &str) -> Result<Value, Exception> {
        let script = Rc::new(Script::new("<test>", input));
        let phrase = parse(&script)?.expect("input must not be blank");
        let names = builtin_namespace();
        let expr = analyze_expr(&phrase, &mut Environ::new(&names))?;
        eval(&expr)
    }

    fn eval_test(input: &str, expected: &str) {
        assert_eq!(eval_str(input).unwrap().to_string(), expected);
    }

    fn eval_err_test(input: &str, expected: &str) {
        assert_eq!(eval_str(input).unwrap_err().to_string(), expected);
    }

    #[test]
    fn constants() {
        eval_test("[true, false, null, inf]", "[true,false,null,inf]");
        eval_test("tau == 2 * pi", "true");
    }

    #[test]
    fn math() {
        eval_test("sqrt(16)", "4");
        eval_test("abs(-2.5)", "2.5");
        eval_test("floor(3.7)", "3");
        eval_test("max(1, 2)", "2");
        eval_test("min(1, 2)", "1");
        eval_err_test(
            "max(1, #two)",
            "<test>:1:8: argument #2 of max: #two is not a number",
        );
    }

    #[test]
    fn aggregates() {
        eval_test("count([1, 2, 3])", "3");
        eval_test("count({a: 1})", "1");
        eval_test("count(\"héllo\")", "5");
        eval_err_test(
            "count(1)",
            "<test>:1:7: argument #1 of count: 1 is not a list, string or record",
        );
        eval_test("fields({z: 1, a: 2})", "[#z,#a]");
        eval_test("values({z: 1, a: 2})", "[1,2]");
        eval_test("has_field({a: 1}, #a)", "true");
        eval_test("has_field({a: 1}, #b)", "false");
    }

    #[test]
    fn update() {
        eval_test("update({a: 1, b: 2}, #a, 5)", "{a:5,b:2}");
        eval_test(
            "(r -> [update(r, #a, 0), r])({a: 1})",
            "[{a:0},{a:1}]",
        );
        eval_err_test(
            "update({a: 1}, #b, 5)",
            "<test>:1:16: argument #2 of update: {a:1} has no field named b",
        );
    }

    #[test]
    fn variants() {
        eval_test("is_variant(#circle)", "true");
        eval_test("is_variant({circle: 3})", "true");
        eval_test("is_variant({a: 1, b: 2})", "false");
        eval_test("tag({circle: 3})", "#circle");
        eval_test("payload({circle: 3})", "3");
        eval_err_test(
            "payload(#circle)",
            "<test>:1:9: argument #1 of payload: #circle has no payload",
        );
        eval_err_test(
            "tag(5)",
            "<test>:1:5: argument #1 of tag: 5 is not a variant",
        );
    }
}
