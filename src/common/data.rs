use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::common::lambda::Lambda;
use crate::vm::closure::Closure;
use crate::vm::trace::Trace;

/// The backing dictionary of a map value.
/// Buckets are keyed by the `repr` of the key;
/// the original key value is kept alongside the entry for display.
pub type Map = IndexMap<String, (Data, Data)>;

/// `Data` is the value domain shared by the compiler and the VM:
/// constants embedded in instructions and everything the stack holds.
/// Lists and maps have reference semantics, so they sit behind `Rc<RefCell<…>>`;
/// assigning or passing one shares it rather than copying it.
///
/// Strings are byte sequences with their escape sequences already
/// decoded. Indexing one addresses a single byte, so the contents are
/// kept as raw bytes; only `Display` and `repr` decode them (lossily)
/// for human-facing output, while `print` writes them through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Integer(i64),
    String(Vec<u8>),
    Boolean(bool),
    None,
    List(Rc<RefCell<Vec<Data>>>),
    Map(Rc<RefCell<Map>>),
    /// An uncaptured function body, as embedded in bytecode by the compiler.
    Lambda(Rc<Lambda>),
    /// A function body paired with its defining environment.
    /// Only ever constructed by the VM; never appears in bytecode.
    Closure(Closure),
    Builtin(Builtin),
}

impl Data {
    /// Wrap a vector of values into a list.
    pub fn list(items: Vec<Data>) -> Data {
        Data::List(Rc::new(RefCell::new(items)))
    }

    /// Wrap key-value pairs into a map, bucketed by each key's `repr`.
    /// Later duplicates of a bucket overwrite earlier ones in place.
    pub fn map(pairs: Vec<(Data, Data)>) -> Data {
        let mut map = Map::new();
        for (key, value) in pairs {
            map.insert(key.repr(), (key, value));
        }
        Data::Map(Rc::new(RefCell::new(map)))
    }

    /// The name of this value's variant, as diagnostics spell it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Integer(_) => "integer",
            Data::String(_) => "string",
            Data::Boolean(_) => "bool",
            Data::None => "none",
            Data::List(_) => "list",
            Data::Map(_) => "map",
            Data::Lambda(_) | Data::Closure(_) => "function",
            Data::Builtin(_) => "built-in function",
        }
    }

    /// The canonical textual form of a value:
    /// what the repl echoes and what maps bucket their keys by.
    /// Strings come out quoted with their escape sequences re-applied;
    /// everything else matches its `Display` form.
    pub fn repr(&self) -> String {
        match self {
            Data::String(bytes) => {
                let mut out = String::with_capacity(bytes.len() + 2);
                out.push('"');
                for c in String::from_utf8_lossy(bytes).chars() {
                    match c {
                        '\x07' => out.push_str("\\a"),
                        '\x08' => out.push_str("\\b"),
                        '\x0c' => out.push_str("\\f"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        '\x0b' => out.push_str("\\v"),
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        c => out.push(c),
                    }
                }
                out.push('"');
                out
            }
            other => format!("{}", other),
        }
    }
}

impl fmt::Display for Data {
    /// The plain textual form of a value: what `print` writes.
    /// Strings print their raw contents; compound values print
    /// their elements in `repr` form, in insertion order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Integer(n) => write!(f, "{}", n),
            Data::String(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Data::Boolean(b) => write!(f, "{}", b),
            Data::None => write!(f, "none"),
            Data::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.borrow().iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Data::Map(map) => {
                write!(f, "{{")?;
                for (index, (key, value)) in map.borrow().values().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.repr(), value.repr())?;
                }
                write!(f, "}}")
            }
            Data::Lambda(_) | Data::Closure(_) => write!(f, "<function object>"),
            Data::Builtin(_) => write!(f, "<built-in function>"),
        }
    }
}

/// The signature of a native function: arguments in textual order,
/// plus the sink that `print` and `println` write to.
pub type NativeFn = fn(&[Data], &mut dyn io::Write) -> Result<Data, Trace>;

/// A native callable seeded into the outermost environment.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    func: NativeFn,
}

impl Builtin {
    pub fn new(name: &'static str, func: NativeFn) -> Builtin {
        Builtin { name, func }
    }

    pub fn call(&self, args: &[Data], out: &mut dyn io::Write) -> Result<Data, Trace> {
        (self.func)(args, out)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Builtin) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}
