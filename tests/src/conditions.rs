use courier_kernel::Condition;
use courier_kernel::conditions::from_fn;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of times a [`counting`] condition was evaluated.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// A condition with a fixed answer that counts its evaluations.
pub fn counting<S: 'static>(name: &str, answer: bool) -> (Condition<S>, CallCounter) {
    let counter = CallCounter::default();
    let calls = counter.0.clone();
    let condition = from_fn(name, move |_: &S| {
        calls.fetch_add(1, Ordering::SeqCst);
        answer
    });
    (condition, counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_kernel::CapabilityProbe;

    #[test]
    fn counts_each_evaluation() {
        let probe = CapabilityProbe::empty();
        let (condition, counter) = counting::<()>("spy", true);

        assert!(condition.accept(&(), &probe));
        assert!(condition.accept(&(), &probe));
        assert_eq!(counter.count(), 2);

        counter.reset();
        assert_eq!(counter.count(), 0);
    }
}
