use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::search::SearchRun;

/// Shared, mutable handle to a registered property.
pub type PropertyHandle = Rc<RefCell<dyn Property>>;

/// Wrap a property so it can be registered with a search.
pub fn property_handle<P: Property + 'static>(property: P) -> PropertyHandle {
    Rc::new(RefCell::new(property))
}

/// Deep copy of a property into a fresh, independent handle.
///
/// Implemented for every `Property + Clone`; implementors never write this by hand.
pub trait PropertyClone {
    fn clone_handle(&self) -> PropertyHandle;
}

impl<T: Property + Clone + 'static> PropertyClone for T {
    fn clone_handle(&self) -> PropertyHandle {
        Rc::new(RefCell::new(self.clone()))
    }
}

/// A correctness condition evaluated after every forward step.
pub trait Property: PropertyClone + fmt::Debug {
    /// `false` means the property is violated in the current state.
    fn check(&mut self, run: &SearchRun) -> bool;

    /// Clear any state accumulated while checking.
    fn reset(&mut self) {}

    fn name(&self) -> &str;

    /// Details about the last violation, if the property keeps any.
    fn error_message(&self) -> Option<String> {
        None
    }
}

/// Property backed by a plain predicate over the run.
#[derive(Clone)]
pub struct PredicateProperty<F> {
    name: String,
    predicate: F,
}

impl<F> PredicateProperty<F>
where
    F: Fn(&SearchRun) -> bool + Clone + 'static,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for PredicateProperty<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateProperty")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Property for PredicateProperty<F>
where
    F: Fn(&SearchRun) -> bool + Clone + 'static,
{
    fn check(&mut self, run: &SearchRun) -> bool {
        (self.predicate)(run)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
