use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ListenerError;
use crate::search::SearchRun;

pub type ListenerResult = Result<(), ListenerError>;

/// Observer of search phase transitions.
///
/// Every callback receives the run itself, so listeners can query state, request a
/// backtrack or terminate the search. All callbacks default to doing nothing.
pub trait SearchListener {
    /// Name used when a failure is reported and for lookups by name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn search_started(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn state_advanced(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn state_processed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn state_backtracked(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn state_stored(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn state_restored(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn property_violated(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn search_constraint_hit(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn search_probed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }

    fn search_finished(&mut self, _run: &mut SearchRun) -> ListenerResult {
        Ok(())
    }
}

/// Lets a listener be registered while the caller keeps a handle to inspect it.
impl<L: SearchListener + ?Sized> SearchListener for Rc<RefCell<L>> {
    fn name(&self) -> &'static str {
        self.borrow().name()
    }

    fn search_started(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().search_started(run)
    }

    fn state_advanced(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().state_advanced(run)
    }

    fn state_processed(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().state_processed(run)
    }

    fn state_backtracked(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().state_backtracked(run)
    }

    fn state_stored(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().state_stored(run)
    }

    fn state_restored(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().state_restored(run)
    }

    fn property_violated(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().property_violated(run)
    }

    fn search_constraint_hit(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().search_constraint_hit(run)
    }

    fn search_probed(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().search_probed(run)
    }

    fn search_finished(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.borrow_mut().search_finished(run)
    }
}
