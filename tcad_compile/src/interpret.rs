use std::{cmp::Ordering, rc::Rc};

use log::trace;
use tcad_syntax::{
    ast::{BinOp, UnaryOp},
    error::{Context, Exception},
};

use crate::{
    environment::Frame,
    error::{value_error, ErrorMsg},
    record::DRecord,
    resolve::{ExprKind, Expression},
    types::{Callable, Func, Value},
};

/// Evaluation nested deeper than this, counting both sub-expressions and
/// function calls, fails instead of overflowing the stack.
const MAX_EVAL_DEPTH: usize = 256;

/// Evaluates a top level expression.
pub fn eval(expr: &Expression) -> Result<Value, Exception> {
    Interpreter::default().eval(expr)
}

#[derive(Default, Debug)]
pub struct Interpreter {
    env: Option<Rc<Frame>>,
    depth: usize,
}

impl Interpreter {
    pub fn eval(&mut self, expr: &Expression) -> Result<Value, Exception> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(Context::at(&expr.location).error(ErrorMsg::RecursionTooDeep));
        }
        self.depth += 1;
        let res = self.eval_expr(expr);
        self.depth -= 1;
        res
    }

    fn eval_expr(&mut self, expr: &Expression) -> Result<Value, Exception> {
        let cx = Context::at(&expr.location);
        match &expr.kind {
            ExprKind::Constant(value) => Ok(value.clone()),
            ExprKind::Local { depth, index } => self
                .env
                .as_ref()
                .and_then(|frame| frame.get_at_depth(*depth, *index))
                .cloned()
                .ok_or_else(|| cx.error(ErrorMsg::MisresolvedVar)),
            ExprKind::Unary { op, arg } => self.eval_unary(*op, arg),
            ExprKind::Binary { lhs, op, rhs } => self.eval_binary(lhs, *op, rhs, &cx),
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(Rc::new(values)))
            }
            ExprKind::Record(fields) => {
                let mut record = DRecord::new();
                for (key, value) in fields {
                    record.insert(key.clone(), self.eval(value)?);
                }
                Ok(record.into())
            }
            ExprKind::Call { func, args } => self.eval_func_call(func, args, &cx),
            ExprKind::Dot { object, field } => {
                let value = self.eval(object)?;
                let record = value.to_record(&Context::at(&object.location))?;
                record.getfield(field, &cx)
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval(condition)?;
                if cond.to_bool(&Context::at(&condition.location))? {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            ExprKind::Lambda(lambda) => Ok(Value::Func(Func {
                lambda: Rc::clone(lambda),
                env: self.env.clone(),
            })),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, arg: &Expression) -> Result<Value, Exception> {
        let value = self.eval(arg)?;
        let cx = Context::at(&arg.location);
        Ok(match op {
            UnaryOp::Minus => Value::Number(-value.to_num(&cx)?),
            UnaryOp::Bang => Value::Boolean(!value.to_bool(&cx)?),
        })
    }

    fn eval_binary(
        &mut self,
        lhs: &Expression,
        op: BinOp,
        rhs: &Expression,
        cx: &Context,
    ) -> Result<Value, Exception> {
        let left = self.eval(lhs)?;
        let lcx = Context::at(&lhs.location);
        let rcx = Context::at(&rhs.location);

        // Logical operators short circuit
        match op {
            BinOp::And => {
                if !left.to_bool(&lcx)? {
                    return Ok(Value::Boolean(false));
                }
                return Ok(Value::Boolean(self.eval(rhs)?.to_bool(&rcx)?));
            }
            BinOp::Or => {
                if left.to_bool(&lcx)? {
                    return Ok(Value::Boolean(true));
                }
                return Ok(Value::Boolean(self.eval(rhs)?.to_bool(&rcx)?));
            }
            _ => (),
        }

        let right = self.eval(rhs)?;
        match op {
            BinOp::EqualEqual => return Ok(Value::Boolean(left.equal(&right, cx)?)),
            BinOp::BangEqual => return Ok(Value::Boolean(!left.equal(&right, cx)?)),
            _ => (),
        }

        // Everything else is numeric
        let left_num = left.to_num(&lcx)?;
        let right_num = right.to_num(&rcx)?;
        Ok(match op {
            BinOp::Plus => Value::Number(left_num + right_num),
            BinOp::Minus => Value::Number(left_num - right_num),
            BinOp::Star => Value::Number(left_num * right_num),
            BinOp::Slash => Value::Number(left_num / right_num),
            BinOp::Greater => Value::Boolean(left_num > right_num),
            BinOp::GreaterEqual => Value::Boolean(left_num >= right_num),
            BinOp::Less => Value::Boolean(left_num < right_num),
            BinOp::LessEqual => Value::Boolean(left_num <= right_num),
            BinOp::And | BinOp::Or | BinOp::EqualEqual | BinOp::BangEqual => {
                unreachable!("non-numeric operators are handled above")
            }
        })
    }

    fn eval_func_call(
        &mut self,
        fn_expr: &Expression,
        arg_exprs: &[Expression],
        cx: &Context,
    ) -> Result<Value, Exception> {
        let value = self.eval(fn_expr)?;
        let func: &dyn Callable = match &value {
            Value::Func(f) => f,
            Value::NativeFunc(f) => f,
            _ => {
                return Err(value_error(
                    &Context::at(&fn_expr.location),
                    &value,
                    ErrorMsg::InvalidCallExpr,
                ))
            }
        };
        // Ensure the number of arguments matches the function definition
        let msg = match func.arity().cmp(&arg_exprs.len()) {
            Ordering::Greater => Some(ErrorMsg::TooFewArgs),
            Ordering::Less => Some(ErrorMsg::TooManyArgs),
            Ordering::Equal => None,
        };
        if let Some(msg) = msg {
            return Err(cx.error(format!(
                "{msg}: {} given, {} expected",
                arg_exprs.len(),
                func.arity()
            )));
        }

        let mut args = Vec::with_capacity(arg_exprs.len());
        let mut contexts = Vec::with_capacity(arg_exprs.len());
        for (i, arg) in arg_exprs.iter().enumerate() {
            args.push(self.eval(arg)?);
            contexts.push(Context::arg(&arg.location, i, func.name()));
        }

        trace!("Calling {} with {} arguments", func.name(), args.len());
        func.call(self, args, contexts)
    }

    pub(crate) fn call_func(&mut self, func: &Func, args: Vec<Value>) -> Result<Value, Exception> {
        let frame = Frame::new(args, func.env.clone());
        let old_env = self.env.replace(Rc::new(frame));
        let res = self.eval(&func.lambda.body);
        // Restore the env
        self.env = old_env;
        res
    }
}
