use std::fmt::{Debug, Display};

/// Source text for one parse unit. The buffer is immutable once the script
/// is constructed; scripts are shared between the tokens, locations and
/// phrases derived from them through `Rc<Script>`.
pub struct Script {
    name: String,
    buffer: String,
}

impl Script {
    pub fn new(name: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer: buffer.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("len", &self.buffer.len())
            .finish()
    }
}

impl Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
