mod money;
mod ratio;
mod summary;
mod transaction;
mod user;

pub use money::*;
pub use ratio::*;
pub use summary::*;
pub use transaction::*;
pub use user::*;
