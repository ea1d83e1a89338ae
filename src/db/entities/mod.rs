//! SeaORM entities mapping the billing tables this subsystem touches.
//!
//! Each entity lives in its own module; the `prelude` re-exports the
//! commonly used aliases.

pub mod activity_log;
pub mod customer;
pub mod package;
pub mod router;

pub mod prelude {
    pub use super::router::Entity as Router;
    pub use super::router::Model as RouterModel;
    pub use super::router::ActiveModel as RouterActiveModel;
    pub use super::router::Column as RouterColumn;

    pub use super::customer::Entity as Customer;
    pub use super::customer::Model as CustomerModel;
    pub use super::customer::ActiveModel as CustomerActiveModel;
    pub use super::customer::Column as CustomerColumn;

    pub use super::package::Entity as Package;
    pub use super::package::Model as PackageModel;
    pub use super::package::ActiveModel as PackageActiveModel;
    pub use super::package::Column as PackageColumn;

    pub use super::activity_log::Entity as ActivityLog;
    pub use super::activity_log::Model as ActivityLogModel;
    pub use super::activity_log::ActiveModel as ActivityLogActiveModel;
    pub use super::activity_log::Column as ActivityLogColumn;
}
