use std::any::Any;

use crate::system::snapshot::Snapshot;

/// A component replicated as a single snapshot value.
pub trait ReplicatedComponent: Any + Send + Sync + Sized {
    type Snapshot: Snapshot;

    fn to_snapshot(&self) -> Self::Snapshot;

    fn from_snapshot(snapshot: &Self::Snapshot) -> Self;

    /// Writes a received snapshot onto an existing component.
    fn apply_snapshot(&mut self, snapshot: &Self::Snapshot) {
        *self = Self::from_snapshot(snapshot);
    }
}

/// A component holding a resizable list of snapshot elements.
pub trait ReplicatedBuffer: Any + Send + Sync + Sized {
    type Element: Snapshot;

    fn elements(&self) -> &[Self::Element];

    fn elements_mut(&mut self) -> &mut Vec<Self::Element>;

    fn from_elements(elements: Vec<Self::Element>) -> Self;
}
