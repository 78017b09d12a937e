use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

use indexmap::IndexMap;
use tcad_syntax::{
    error::{Context, Exception},
    lex::{escape, is_identifier},
};

use crate::{
    error::{field_error, value_error, ErrorMsg},
    symbol::Symbol,
    types::Value,
};

/// A mapping from symbols to values with unique keys. Implementations
/// decide how fields are stored and in which order they are visited.
pub trait Record: Debug + Display {
    fn size(&self) -> usize;

    /// Field names, in the order the fields are visited.
    fn keys(&self) -> Box<dyn Iterator<Item = Symbol> + '_>;

    /// The value of a field, or `Value::Missing` if it is absent.
    fn find_field(&self, key: &Symbol) -> Value;

    fn hasfield(&self, key: &Symbol) -> bool;

    /// A mutable slot for an existing field. `need_value` asks for a slot
    /// that already holds a computed value, for records that compute their
    /// fields on demand.
    fn ref_field(
        &mut self,
        key: &Symbol,
        need_value: bool,
        cx: &Context,
    ) -> Result<&mut Value, Exception>;

    /// An independent copy holding the same fields.
    fn clone_record(&self) -> Box<dyn Record>;

    fn getfield(&self, key: &Symbol, cx: &Context) -> Result<Value, Exception> {
        let val = self.find_field(key);
        if val.is_missing() {
            return Err(field_error(cx, self, ErrorMsg::MissingField, key));
        }
        Ok(val)
    }

    fn each_field(
        &self,
        cx: &Context,
        visitor: &mut dyn FnMut(&Symbol, Value) -> Result<(), Exception>,
    ) -> Result<(), Exception> {
        for key in self.keys() {
            let val = self.getfield(&key, cx)?;
            visitor(&key, val)?;
        }
        Ok(())
    }

    fn fields(&self) -> Rc<[Symbol]> {
        self.keys().collect()
    }

    fn equal(&self, other: &dyn Record, cx: &Context) -> Result<bool, Exception> {
        if self.size() != other.size() {
            return Ok(false);
        }
        for key in self.keys() {
            if !other.hasfield(&key) {
                return Ok(false);
            }
            if !self.getfield(&key, cx)?.equal(&other.getfield(&key, cx)?, cx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Writes a field or symbol name so that the parser reads it back as the
/// same name.
pub fn write_key(f: &mut std::fmt::Formatter<'_>, key: &Symbol) -> std::fmt::Result {
    if is_identifier(key.as_str()) {
        write!(f, "{key}")
    } else {
        f.write_str(&escape(key.as_str()))
    }
}

/// A record whose fields are all stored in a map. Fields are visited in
/// insertion order.
#[derive(Clone, Debug, Default)]
pub struct DRecord {
    fields: IndexMap<Symbol, Value>,
}

impl DRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field. Only used while building a record, before
    /// it is shared as a `Value`.
    pub fn insert(&mut self, key: Symbol, value: Value) {
        self.fields.insert(key, value);
    }
}

impl FromIterator<(Symbol, Value)> for DRecord {
    fn from_iter<T: IntoIterator<Item = (Symbol, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<DRecord> for Value {
    fn from(record: DRecord) -> Self {
        Value::Record(Rc::new(record))
    }
}

impl Display for DRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write_key(f, key)?;
            write!(f, ":{value}")?;
        }
        f.write_str("}")
    }
}

impl Record for DRecord {
    fn size(&self) -> usize {
        self.fields.len()
    }

    fn keys(&self) -> Box<dyn Iterator<Item = Symbol> + '_> {
        Box::new(self.fields.keys().cloned())
    }

    fn find_field(&self, key: &Symbol) -> Value {
        self.fields.get(key).cloned().unwrap_or(Value::Missing)
    }

    fn hasfield(&self, key: &Symbol) -> bool {
        self.fields.contains_key(key)
    }

    fn ref_field(
        &mut self,
        key: &Symbol,
        _need_value: bool,
        cx: &Context,
    ) -> Result<&mut Value, Exception> {
        // Fields are always materialised, so need_value makes no difference
        if !self.fields.contains_key(key) {
            return Err(field_error(cx, &*self, ErrorMsg::NoSuchField, key));
        }
        Ok(&mut self.fields[key])
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }
}

/// Splits a variant into its tag and payload. A bare symbol is a tag with
/// a missing payload, a record with exactly one field is that field.
pub fn value_to_variant(val: &Value, cx: &Context) -> Result<(Symbol, Value), Exception> {
    match val {
        Value::Symbol(sym) => Ok((sym.clone(), Value::Missing)),
        Value::Record(rec) if rec.size() == 1 => {
            let Some(key) = rec.keys().next() else {
                return Err(value_error(cx, val, ErrorMsg::NotAVariant));
            };
            let payload = rec.getfield(&key, cx)?;
            Ok((key, payload))
        }
        _ => Err(value_error(cx, val, ErrorMsg::NotAVariant)),
    }
}
