use crate::entity::Entity;

/// Domain aggregate that embeds an [`Entity`].
///
/// Implement with [`impl_aggregate!`](crate::impl_aggregate), which also makes
/// the aggregate [`Committable`](crate::Committable).
pub trait Aggregate {
    fn entity(&self) -> &Entity;
    fn entity_mut(&mut self) -> &mut Entity;

    fn id(&self) -> uuid::Uuid {
        self.entity().id()
    }
}

#[macro_export]
macro_rules! impl_aggregate {
    ($ty:ty, $entity:ident) => {
        impl $crate::Aggregate for $ty {
            fn entity(&self) -> &$crate::Entity {
                &self.$entity
            }

            fn entity_mut(&mut self) -> &mut $crate::Entity {
                &mut self.$entity
            }
        }

        impl $crate::Committable for $ty {
            fn entities_mut(&mut self) -> Vec<&mut $crate::Entity> {
                vec![&mut self.$entity]
            }
        }
    };
}
