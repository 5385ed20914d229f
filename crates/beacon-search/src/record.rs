use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::property::PropertyHandle;
use crate::vm::{Path, SharedPath, SharedThreadList, ThreadList};

/// A detected property violation.
///
/// In multi-error mode the record owns deep copies of the property, path and thread
/// list. In single-error mode it aliases the live objects and is only meaningful
/// until the engine mutates them again.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    id: usize,
    property: PropertyHandle,
    path: SharedPath,
    thread_list: SharedThreadList,
}

impl ErrorRecord {
    pub(crate) fn new(
        id: usize,
        property: PropertyHandle,
        path: SharedPath,
        thread_list: SharedThreadList,
    ) -> Self {
        Self {
            id,
            property,
            path,
            thread_list,
        }
    }

    /// Record that shares nothing with the live objects it was created from.
    pub(crate) fn detached(
        id: usize,
        property: &PropertyHandle,
        path: &SharedPath,
        thread_list: &SharedThreadList,
    ) -> Self {
        let property = property.borrow().clone_handle();
        let path = Rc::new(RefCell::new(path.borrow().clone()));
        let thread_list = Rc::new(RefCell::new(thread_list.borrow().clone()));
        Self::new(id, property, path, thread_list)
    }

    /// 1-based, sequential within a run.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn property(&self) -> &PropertyHandle {
        &self.property
    }

    pub fn path(&self) -> &SharedPath {
        &self.path
    }

    pub fn thread_list(&self) -> &SharedThreadList {
        &self.thread_list
    }

    pub fn property_name(&self) -> String {
        self.property.borrow().name().to_string()
    }

    /// Serializable copy of the record's current contents.
    pub fn summary(&self) -> ErrorSummary {
        let property = self.property.borrow();
        ErrorSummary {
            id: self.id,
            property: property.name().to_string(),
            message: property.error_message(),
            path: self.path.borrow().clone(),
            threads: self.thread_list.borrow().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub id: usize,
    pub property: String,
    pub message: Option<String>,
    pub path: Path,
    pub threads: ThreadList,
}
