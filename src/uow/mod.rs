mod session;
mod unit_of_work;

pub use session::{Database, Session};
pub use unit_of_work::{SaveError, UnitOfWork};
