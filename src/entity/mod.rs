mod committable;
mod entity;

pub use committable::Committable;
pub use entity::Entity;
