#![forbid(unsafe_code)]

//! Memoized derived values.
//!
//! A [`Computed`] pairs a *version function* with a compute function. The
//! version function returns a number that changes whenever any dependency
//! changes (an [`Observable::version`](super::Observable::version), a
//! [`Trigger::version`](super::Trigger::version), or a sum of them). `get()`
//! recomputes only when that number differs from the cached one, so it never
//! returns a stale value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::observable::Observable;

struct ComputedInner<T> {
    source_version: Box<dyn Fn() -> u64>,
    compute: Box<dyn Fn() -> T>,
    cache: RefCell<Option<(u64, T)>>,
    evaluations: Cell<u64>,
}

/// A lazily evaluated, memoized derivation. Cloning shares the cache.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a derivation from a version function and a compute function.
    pub fn new(
        source_version: impl Fn() -> u64 + 'static,
        compute: impl Fn() -> T + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                source_version: Box::new(source_version),
                compute: Box::new(compute),
                cache: RefCell::new(None),
                evaluations: Cell::new(0),
            }),
        }
    }

    /// Derive from a single observable.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let upstream = source.clone();
        let src = source.clone();
        Self::new(move || upstream.version(), move || src.with(&map))
    }

    /// Current value, recomputing if a dependency moved.
    #[must_use]
    pub fn get(&self) -> T {
        let version = (self.inner.source_version)();
        if let Some((cached_version, value)) = self.inner.cache.borrow().as_ref()
            && *cached_version == version
        {
            return value.clone();
        }
        let value = (self.inner.compute)();
        self.inner
            .evaluations
            .set(self.inner.evaluations.get() + 1);
        *self.inner.cache.borrow_mut() = Some((version, value.clone()));
        value
    }

    /// Whether the next `get()` will recompute.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let version = (self.inner.source_version)();
        !matches!(self.inner.cache.borrow().as_ref(), Some((v, _)) if *v == version)
    }

    /// How many times the compute function has run.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.inner.evaluations.get()
    }

    /// Chain a further transform sharing this derivation's version function.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Computed<U> {
        let upstream = self.clone();
        let src = self.clone();
        Computed::new(
            move || (upstream.inner.source_version)(),
            move || f(src.get()),
        )
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.get())
            .field("evaluations", &self.evaluations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_only_on_change() {
        let count = Observable::new(2);
        let doubled = Computed::from_observable(&count, |c| c * 2);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.evaluations(), 1);

        count.set(5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.evaluations(), 2);
    }

    #[test]
    fn equal_write_keeps_cache() {
        let count = Observable::new(1);
        let c = Computed::from_observable(&count, |v| v + 1);
        let _ = c.get();
        count.set(1);
        assert!(!c.is_dirty());
    }

    #[test]
    fn multi_source_version() {
        let a = Observable::new(1);
        let b = Observable::new(10);
        let (pa, pb, ca, cb) = (a.clone(), b.clone(), a.clone(), b.clone());
        let sum = Computed::new(
            move || pa.version() + pb.version(),
            move || ca.get() + cb.get(),
        );
        assert_eq!(sum.get(), 11);
        b.set(20);
        assert_eq!(sum.get(), 21);
    }

    #[test]
    fn map_chains() {
        let name = Observable::new(String::from("al"));
        let upper = Computed::from_observable(&name, |n| n.to_uppercase());
        let greeting = upper.map(|n| format!("hi {n}"));
        assert_eq!(greeting.get(), "hi AL");
        name.set("bo".into());
        assert_eq!(greeting.get(), "hi BO");
    }
}
