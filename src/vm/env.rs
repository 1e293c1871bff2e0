use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::common::data::Data;

/// A mapping from symbol names to values, with an optional enclosing
/// environment. Lookups walk outwards; `define` writes only into this
/// scope; `assign` replaces a binding wherever in the chain it lives.
///
/// Environments are shared: a child holds its parent alive, and closures
/// hold their defining environment alive, so `Env` is a cheap handle.
#[derive(Clone)]
pub struct Env {
    scope: Rc<RefCell<Scope>>,
}

struct Scope {
    symbols: HashMap<String, Data>,
    enclosing: Option<Env>,
}

impl Env {
    /// The outermost environment, with nothing enclosing it.
    pub fn base() -> Env {
        Env::wrap(Scope { symbols: HashMap::new(), enclosing: None })
    }

    /// A fresh scope enclosed by `self`, as pushed for a function call.
    pub fn child(&self) -> Env {
        Env::wrap(Scope {
            symbols: HashMap::new(),
            enclosing: Some(self.clone()),
        })
    }

    fn wrap(scope: Scope) -> Env {
        Env { scope: Rc::new(RefCell::new(scope)) }
    }

    /// Looks a name up through the chain.
    pub fn get(&self, name: &str) -> Option<Data> {
        let scope = self.scope.borrow();
        match scope.symbols.get(name) {
            Some(data) => Some(data.clone()),
            None => scope.enclosing.as_ref()?.get(name),
        }
    }

    /// Creates a binding in this scope.
    /// Fails when the name is already bound here; shadowing an outer
    /// binding is fine.
    pub fn define(&self, name: &str, data: Data) -> bool {
        let mut scope = self.scope.borrow_mut();
        if scope.symbols.contains_key(name) {
            return false;
        }
        scope.symbols.insert(name.to_string(), data);
        true
    }

    /// Replaces an existing binding in the scope that defines it.
    /// Fails when the name is bound nowhere in the chain.
    pub fn assign(&self, name: &str, data: Data) -> bool {
        let mut scope = self.scope.borrow_mut();
        if let Some(slot) = scope.symbols.get_mut(name) {
            *slot = data;
            return true;
        }
        match &scope.enclosing {
            Some(enclosing) => enclosing.assign(name, data),
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // names only: values can point back at this environment
        let scope = self.scope.borrow();
        let mut names: Vec<&String> = scope.symbols.keys().collect();
        names.sort();
        write!(f, "Env{:?}", names)?;
        if scope.enclosing.is_some() {
            write!(f, " -> ..")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_walks_outwards() {
        let outer = Env::base();
        assert!(outer.define("x", Data::Integer(1)));

        let inner = outer.child();
        assert_eq!(inner.get("x"), Some(Data::Integer(1)));
        assert_eq!(inner.get("y"), None);
    }

    #[test]
    fn define_rejects_local_rebinding_but_allows_shadowing() {
        let outer = Env::base();
        assert!(outer.define("x", Data::Integer(1)));
        assert!(!outer.define("x", Data::Integer(2)));

        let inner = outer.child();
        assert!(inner.define("x", Data::Integer(3)));
        assert_eq!(inner.get("x"), Some(Data::Integer(3)));
        assert_eq!(outer.get("x"), Some(Data::Integer(1)));
    }

    #[test]
    fn assign_updates_the_defining_scope() {
        let outer = Env::base();
        outer.define("count", Data::Integer(0));

        let inner = outer.child();
        assert!(inner.assign("count", Data::Integer(7)));

        // the write landed in the outer scope, not a shadow
        assert_eq!(outer.get("count"), Some(Data::Integer(7)));
        assert!(!inner.assign("missing", Data::Integer(1)));
    }
}
