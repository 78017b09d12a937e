use std::{
    cell::RefCell,
    collections::HashSet,
    fmt::{Debug, Display},
    rc::Rc,
};

thread_local! {
    static INTERNED: RefCell<HashSet<Rc<str>>> = RefCell::default();
}

/// An interned name, used for record keys and variant tags.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        INTERNED.with(|interned| {
            let mut interned = interned.borrow_mut();
            if let Some(existing) = interned.get(name) {
                return Self(Rc::clone(existing));
            }
            let name: Rc<str> = Rc::from(name);
            interned.insert(Rc::clone(&name));
            Self(name)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
