//! Core domain logic for Estatio parties and capex orders.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod fixture;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use fixture::{run_fixture, ExecutionContext, ExecutionReport, Fixture, FixtureError};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError, LoggingOptions};
pub use model::order::{NewOrder, Order, OrderDetail, OrderItem, OrderItemLine};
pub use model::party::{NewParty, Party, PartyKind, PersonGender};
pub use model::relationship::{PartyRelationship, RelationshipType};
pub use model::tenancy::ApplicationTenancy;
pub use model::validation::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::order_service::OrderService;
pub use service::party_service::{PartyService, PartyServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
