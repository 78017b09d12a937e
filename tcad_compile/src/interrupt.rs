use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag recording that the user interrupted the session. Clones
/// observe the same flag, so a line reader can raise it for the driver.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_between_clones() {
        let interrupt = Interrupt::new();
        let reader_side = interrupt.clone();
        assert!(!interrupt.is_set());
        reader_side.set();
        assert!(interrupt.is_set());
        interrupt.clear();
        assert!(!reader_side.is_set());
    }
}
