use super::Entity;

/// A change-set a unit of work can commit: it yields the entities whose
/// raised events go to the outbox, in the order they should be dispatched.
///
/// Aggregates get an impl from [`impl_aggregate!`](crate::impl_aggregate).
/// Several aggregates saved together are passed as an array of their
/// entities: `&mut [a.entity_mut(), b.entity_mut()]`.
pub trait Committable {
    fn entities_mut(&mut self) -> Vec<&mut Entity>;
}

impl Committable for Entity {
    fn entities_mut(&mut self) -> Vec<&mut Entity> {
        vec![self]
    }
}

impl<const N: usize> Committable for [&mut Entity; N] {
    fn entities_mut(&mut self) -> Vec<&mut Entity> {
        self.iter_mut().map(|entity| &mut **entity).collect()
    }
}
