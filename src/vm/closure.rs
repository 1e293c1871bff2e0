use std::fmt;
use std::rc::Rc;

use crate::common::lambda::Lambda;
use crate::vm::env::Env;

/// A function body paired with the environment it was defined in.
/// The VM builds one whenever a function constant is pushed, so a call
/// can run the body in a fresh child of the *defining* environment -
/// lexical scoping, whoever the caller happens to be.
#[derive(Clone)]
pub struct Closure {
    pub lambda: Rc<Lambda>,
    pub env: Env,
}

impl Closure {
    pub fn wrap(lambda: Rc<Lambda>, env: &Env) -> Closure {
        Closure { lambda, env: env.clone() }
    }
}

impl PartialEq for Closure {
    /// Identity, not structure: two closures are equal when they wrap
    /// the same body captured in the same environment.
    fn eq(&self, other: &Closure) -> bool {
        Rc::ptr_eq(&self.lambda, &other.lambda) && self.env.ptr_eq(&other.env)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the environment is deliberately not printed:
        // it usually points back at the scope holding this closure
        write!(f, "Closure(fn({}))", self.lambda.params.join(", "))
    }
}
