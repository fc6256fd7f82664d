//! Domain model for tenancies, parties and capex orders.
//!
//! # Responsibility
//! - Define persisted entities and the draft structs used to create them.
//! - Own field-level validation shared by repositories.
//!
//! # Invariants
//! - Every persisted entity carries a store-assigned surrogate id and a
//!   `version` counter used for optimistic locking.
//! - Drafts never fail to construct; `validate()` enforces required fields
//!   and runs before any SQL is issued.

pub mod order;
pub mod party;
pub mod reference;
pub mod relationship;
pub mod tenancy;
pub mod validation;
