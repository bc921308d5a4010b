//! Application services behind the HTTP handlers.

pub mod orders;
pub mod users;

pub use orders::{OrderInput, OrderService};
pub use users::{NewUser, UserChanges, UserService};
