//! Hook-call contexts and type-erased data slots.
//!
//! A hook never sees the manager directly. It receives a [`HookCtx`], a view
//! assembled immediately before the call from the owning module's record,
//! the (module, build-unit) context, and the build unit the dispatch is
//! bound to. The view disappears when the call returns, which is what makes
//! the "registration calls are only legal during init, mutation calls only
//! during the right kind of hook" rules structural instead of runtime
//! bookkeeping.

use std::any::Any;

use packmill_core::error::BuildError;
use packmill_core::result::BuildResult;
use packmill_core::traits::{BuildUnit, PackageAccess};
use packmill_core::types::PackageNaming;

use crate::hooks::definitions::HookPoint;

/// A type-erased single-owner data slot.
///
/// The engine never interprets the payload; modules store whatever they want
/// and get it back with typed accessors at the boundary.
#[derive(Default)]
pub struct DataSlot(Option<Box<dyn Any>>);

impl DataSlot {
    /// Stores a value, replacing any previous one.
    pub fn set<T: Any>(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }

    /// Returns a reference to the stored value if it has type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns a mutable reference to the stored value if it has type `T`.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut().and_then(|boxed| boxed.downcast_mut())
    }

    /// Returns the stored `T`, initializing the slot first if it is empty or
    /// holds a value of a different type.
    pub fn get_or_insert_with<T: Any>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        if !self.0.as_ref().is_some_and(|boxed| boxed.is::<T>()) {
            self.0 = Some(Box::new(init()));
        }
        self.0
            .as_mut()
            .and_then(|boxed| boxed.downcast_mut())
            .expect("slot holds a value of this type")
    }

    /// Removes and returns the stored value if it has type `T`.
    pub fn take<T: Any>(&mut self) -> Option<T> {
        let boxed = self.0.take()?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.0 = Some(other);
                None
            }
        }
    }

    /// Drops whatever the slot holds.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Whether the slot holds a value.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for DataSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DataSlot")
            .field(&self.0.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

/// What kind of dispatch a [`HookCtx`] was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    /// A build hook running at the given pipeline point.
    Build(HookPoint),
    /// A file hook running during the file-processing stage.
    File,
}

/// The context handed to a running hook.
pub struct HookCtx<'a> {
    module: &'a str,
    kind: DispatchKind,
    last_point: Option<HookPoint>,
    global_data: &'a mut DataSlot,
    user_data: &'a mut DataSlot,
    unit: &'a mut dyn BuildUnit,
}

impl<'a> HookCtx<'a> {
    pub(crate) fn new(
        module: &'a str,
        kind: DispatchKind,
        last_point: Option<HookPoint>,
        global_data: &'a mut DataSlot,
        user_data: &'a mut DataSlot,
        unit: &'a mut dyn BuildUnit,
    ) -> Self {
        Self {
            module,
            kind,
            last_point,
            global_data,
            user_data,
            unit,
        }
    }

    /// Name of the module that registered the running hook.
    pub fn module_name(&self) -> &str {
        self.module
    }

    /// The pipeline point of the running build hook, `None` in a file hook.
    pub fn point(&self) -> Option<HookPoint> {
        match self.kind {
            DispatchKind::Build(point) => Some(point),
            DispatchKind::File => None,
        }
    }

    /// The most recent pipeline point dispatched to this context: the
    /// current point inside a build hook, the last build point this
    /// module saw for the unit inside a file hook.
    pub fn last_build_point(&self) -> Option<HookPoint> {
        self.last_point
    }

    /// The build unit this dispatch is bound to.
    pub fn unit(&self) -> &dyn BuildUnit {
        &*self.unit
    }

    /// Mutable access to the build unit.
    pub fn unit_mut(&mut self) -> &mut dyn BuildUnit {
        &mut *self.unit
    }

    /// Module-wide data, shared by all of this module's hooks across every
    /// build unit.
    pub fn global_data(&self) -> &DataSlot {
        self.global_data
    }

    /// Mutable access to the module-wide data slot.
    pub fn global_data_mut(&mut self) -> &mut DataSlot {
        &mut *self.global_data
    }

    /// Build-unit-scoped data, shared by all of this module's hooks working
    /// on the same build unit.
    pub fn user_data(&self) -> &DataSlot {
        self.user_data
    }

    /// Mutable access to the build-unit-scoped data slot.
    pub fn user_data_mut(&mut self) -> &mut DataSlot {
        &mut *self.user_data
    }

    /// Defines a new package on the current build unit.
    ///
    /// Only legal from a build hook at a point before the file-processing
    /// stage; the packaging pipeline consumes the package set when it starts
    /// assigning files.
    pub fn new_package(
        &mut self,
        name: &str,
        summary: &str,
        naming: PackageNaming,
    ) -> BuildResult<&mut dyn PackageAccess> {
        match self.kind {
            DispatchKind::Build(point) if point <= HookPoint::PostCheck => {}
            DispatchKind::Build(point) => {
                return Err(BuildError::misuse(format!(
                    "Packages cannot be added at {point}; file processing has already consumed the package set. Cannot add: {name}"
                )));
            }
            DispatchKind::File => {
                return Err(BuildError::misuse(format!(
                    "Packages must be added from a build hook. Cannot add: {name}"
                )));
            }
        }
        self.unit.add_package(name, summary, naming)
    }
}

/// The context handed to a module's cleanup callback at manager shutdown.
pub struct CleanupCtx<'a> {
    module: &'a str,
    global_data: &'a mut DataSlot,
}

impl<'a> CleanupCtx<'a> {
    pub(crate) fn new(module: &'a str, global_data: &'a mut DataSlot) -> Self {
        Self {
            module,
            global_data,
        }
    }

    /// Name of the module being torn down.
    pub fn module_name(&self) -> &str {
        self.module
    }

    /// The module-wide data slot, for final bookkeeping before it is dropped.
    pub fn global_data_mut(&mut self) -> &mut DataSlot {
        &mut *self.global_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_typed_roundtrip() {
        let mut slot = DataSlot::default();
        assert!(!slot.is_set());

        slot.set(42u32);
        assert_eq!(slot.get::<u32>(), Some(&42));
        assert_eq!(slot.get::<String>(), None);

        *slot.get_mut::<u32>().expect("slot holds a u32") += 1;
        assert_eq!(slot.take::<u32>(), Some(43));
        assert!(!slot.is_set());
    }

    #[test]
    fn test_slot_take_wrong_type_keeps_value() {
        let mut slot = DataSlot::default();
        slot.set("kept".to_string());
        assert_eq!(slot.take::<u32>(), None);
        assert_eq!(slot.get::<String>().map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_slot_get_or_insert_with() {
        let mut slot = DataSlot::default();
        slot.get_or_insert_with(Vec::<String>::new)
            .push("first".to_string());
        slot.get_or_insert_with(Vec::<String>::new)
            .push("second".to_string());
        assert_eq!(slot.get::<Vec<String>>().map(Vec::len), Some(2));
    }
}
