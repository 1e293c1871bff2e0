use std::io;

use crate::common::data::{Builtin, Data};
use crate::vm::env::Env;
use crate::vm::trace::{Trace, TraceKind};

/// Builds the outermost environment, seeded with every built-in
/// function under its canonical name.
pub fn prelude() -> Env {
    let env = Env::base();
    for builtin in [
        Builtin::new("print", print),
        Builtin::new("println", println),
        Builtin::new("range", range),
    ] {
        env.define(builtin.name, Data::Builtin(builtin));
    }
    env
}

/// Extracts the single argument of `print`/`println`.
fn single<'a>(name: &str, args: &'a [Data]) -> Result<&'a Data, Trace> {
    match args {
        [value] => Ok(value),
        _ => Err(Trace::error(
            TraceKind::Arity,
            &format!("{}() takes exactly one argument, {} were given", name, args.len()),
            vec![],
        )),
    }
}

/// Writes the plain form of a value.
/// String contents go through byte-for-byte; everything else prints its
/// `Display` form. The sink is host-supplied; a broken one is the
/// host's problem, so write failures are ignored.
fn write_value(value: &Data, out: &mut dyn io::Write) {
    match value {
        Data::String(bytes) => {
            let _ = out.write_all(bytes);
        }
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}

fn print(args: &[Data], out: &mut dyn io::Write) -> Result<Data, Trace> {
    let value = single("print", args)?;
    write_value(value, out);
    Ok(Data::None)
}

fn println(args: &[Data], out: &mut dyn io::Write) -> Result<Data, Trace> {
    let value = single("println", args)?;
    write_value(value, out);
    let _ = out.write_all(b"\n");
    Ok(Data::None)
}

/// `range(hi)`, `range(lo, hi)`, or `range(lo, hi, step)`:
/// the integers `[lo, lo + step, .. < hi)`.
/// A negative step counts down towards `hi` instead.
fn range(args: &[Data], _out: &mut dyn io::Write) -> Result<Data, Trace> {
    let mut bounds = [0i64; 3];
    for (slot, arg) in bounds.iter_mut().zip(args) {
        match arg {
            Data::Integer(n) => *slot = *n,
            other => {
                return Err(Trace::error(
                    TraceKind::Type,
                    &format!("range() expects integer arguments, found {}", other.type_name()),
                    vec![],
                ))
            }
        }
    }

    let (lo, hi, step) = match args.len() {
        1 => (0, bounds[0], 1),
        2 => (bounds[0], bounds[1], 1),
        3 => (bounds[0], bounds[1], bounds[2]),
        n => {
            return Err(Trace::error(
                TraceKind::Arity,
                &format!("range() takes one to three arguments, {} were given", n),
                vec![],
            ))
        }
    };

    if step == 0 {
        return Err(Trace::error(
            TraceKind::Arithmetic,
            "range() step must not be zero",
            vec![],
        ));
    }

    let mut items = vec![];
    let mut value = lo;
    while if step > 0 { value < hi } else { value > hi } {
        items.push(Data::Integer(value));
        match value.checked_add(step) {
            Some(next) => value = next,
            None => break,
        }
    }

    Ok(Data::list(items))
}
