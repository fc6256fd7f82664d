//! Fixture engine for seeding demo and test data.
//!
//! # Responsibility
//! - Run a root fixture and, recursively, the child fixtures it depends on.
//! - Record every object a fixture creates, in creation order.
//! - Make one run atomic: a failing fixture rolls back the whole run.
//!
//! # Invariants
//! - A fixture executes at most once per run, however many parents ask for it.
//! - Fixtures only write through repositories, so re-running a fixture on a
//!   seeded store creates nothing new.

use crate::model::order::{Order, OrderItem};
use crate::model::party::{CommunicationChannel, Party};
use crate::model::reference::ReferenceEntity;
use crate::model::relationship::PartyRelationship;
use crate::model::tenancy::ApplicationTenancy;
use crate::repo::order_item_repo::SqliteOrderItemRepository;
use crate::repo::order_repo::SqliteOrderRepository;
use crate::repo::party_repo::SqlitePartyRepository;
use crate::repo::reference_repo::SqliteReferenceRepository;
use crate::repo::relationship_repo::SqliteRelationshipRepository;
use crate::repo::tenancy_repo::SqliteTenancyRepository;
use crate::repo::RepoError;
use crate::service::order_service::OrderService;
use crate::service::party_service::{PartyService, PartyServiceError};
use log::{debug, error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub mod capex;
pub mod party;
pub mod tenancy;

pub use capex::{CapexReferenceDataForGb, DemoFixture, OrderForTopModelGb};
pub use party::{
    create_organisation, create_person, OrganisationForHelloWorldGb, OrganisationForTopModelGb,
    PersonForGinoVannelliGb, PersonSpec,
};
pub use tenancy::{ApplicationTenancyForGb, ApplicationTenancyForGlobal};

pub type FixtureResult<T> = Result<T, FixtureError>;

/// Failure that aborts the current fixture run.
#[derive(Debug)]
pub enum FixtureError {
    /// A fixture referenced a party code that does not exist.
    PartyNotFound(String),
    /// A fixture referenced a tenancy path that does not exist.
    TenancyNotFound(String),
    /// A relationship title matches no relationship type.
    UnknownRelationshipTitle(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for FixtureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartyNotFound(reference) => write!(f, "party not found: {reference}"),
            Self::TenancyNotFound(path) => write!(f, "tenancy not found: {path}"),
            Self::UnknownRelationshipTitle(title) => {
                write!(f, "unknown relationship title `{title}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FixtureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FixtureError {
    fn from(value: RepoError) -> Self {
        // Party misses from repositories are keyed by id, not by code, so
        // they stay `Repo(NotFound)`.
        match value {
            RepoError::NotFound {
                entity: "tenancy",
                key,
            } => Self::TenancyNotFound(key),
            other => Self::Repo(other),
        }
    }
}

impl From<PartyServiceError> for FixtureError {
    fn from(value: PartyServiceError) -> Self {
        match value {
            PartyServiceError::PartyNotFound(reference) => Self::PartyNotFound(reference),
            PartyServiceError::UnknownRelationshipTitle(title) => {
                Self::UnknownRelationshipTitle(title)
            }
            PartyServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<rusqlite::Error> for FixtureError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// One seeding routine.
pub trait Fixture {
    /// Stable name, also used to run the fixture at most once per run.
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()>;
}

/// Object recorded by a fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureObject {
    Tenancy(ApplicationTenancy),
    Party(Party),
    Channel(CommunicationChannel),
    Relationship(PartyRelationship),
    Reference(ReferenceEntity),
    Order(Order),
    OrderItem(OrderItem),
}

/// Entry in the ordered result log of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Zero-based position in the run.
    pub sequence: usize,
    pub fixture: &'static str,
    pub key: String,
    pub object: FixtureObject,
}

/// Outcome of a committed run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub executed: Vec<&'static str>,
    pub results: Vec<ExecutionResult>,
}

impl ExecutionReport {
    /// Keys recorded by the run, in creation order.
    pub fn keys(&self) -> Vec<&str> {
        self.results.iter().map(|result| result.key.as_str()).collect()
    }
}

/// Built-in fixtures in dependency order, ending with the full demo seed.
pub fn builtin_fixtures() -> Vec<&'static dyn Fixture> {
    let fixtures: [&'static dyn Fixture; 8] = [
        &ApplicationTenancyForGlobal,
        &ApplicationTenancyForGb,
        &OrganisationForTopModelGb,
        &OrganisationForHelloWorldGb,
        &PersonForGinoVannelliGb,
        &CapexReferenceDataForGb,
        &OrderForTopModelGb,
        &DemoFixture,
    ];
    fixtures.to_vec()
}

/// Looks up a built-in fixture by its [`Fixture::name`].
pub fn find_fixture(name: &str) -> Option<&'static dyn Fixture> {
    builtin_fixtures()
        .into_iter()
        .find(|fixture| fixture.name() == name)
}

pub type SqlitePartyService<'conn> =
    PartyService<SqlitePartyRepository<'conn>, SqliteRelationshipRepository<'conn>>;
pub type SqliteOrderService<'conn> = OrderService<
    SqliteOrderRepository<'conn>,
    SqliteOrderItemRepository<'conn>,
    SqliteTenancyRepository<'conn>,
>;

/// State shared by every fixture of one run.
pub struct ExecutionContext<'conn> {
    conn: &'conn Connection,
    run_id: Uuid,
    executed: Vec<&'static str>,
    seen: HashSet<&'static str>,
    results: Vec<ExecutionResult>,
}

impl<'conn> ExecutionContext<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            run_id: Uuid::new_v4(),
            executed: Vec::new(),
            seen: HashSet::new(),
            results: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Connection (inside the run transaction) the fixtures write through.
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Runs `child` on behalf of `parent` unless it already ran in this run.
    pub fn execute_child(&mut self, parent: &dyn Fixture, child: &dyn Fixture) -> FixtureResult<()> {
        if self.seen.contains(child.name()) {
            debug!(
                "event=fixture_execute module=fixture status=skipped run_id={} parent={} fixture={}",
                self.run_id,
                parent.name(),
                child.name()
            );
            return Ok(());
        }
        debug!(
            "event=fixture_execute module=fixture status=start run_id={} parent={} fixture={}",
            self.run_id,
            parent.name(),
            child.name()
        );
        self.execute(child)
    }

    fn execute(&mut self, fixture: &dyn Fixture) -> FixtureResult<()> {
        self.seen.insert(fixture.name());
        self.executed.push(fixture.name());
        fixture.execute(self).map_err(|err| {
            error!(
                "event=fixture_execute module=fixture status=error run_id={} fixture={} error={}",
                self.run_id,
                fixture.name(),
                err
            );
            err
        })
    }

    /// Records an object created (or found) by `fixture`.
    pub fn add_result(
        &mut self,
        fixture: &dyn Fixture,
        key: impl Into<String>,
        object: FixtureObject,
    ) {
        let key = key.into();
        debug!(
            "event=fixture_result module=fixture run_id={} fixture={} key={}",
            self.run_id,
            fixture.name(),
            key
        );
        self.results.push(ExecutionResult {
            sequence: self.results.len(),
            fixture: fixture.name(),
            key,
            object,
        });
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    pub fn tenancies(&self) -> FixtureResult<SqliteTenancyRepository<'conn>> {
        Ok(SqliteTenancyRepository::try_new(self.conn)?)
    }

    pub fn references(&self) -> FixtureResult<SqliteReferenceRepository<'conn>> {
        Ok(SqliteReferenceRepository::try_new(self.conn)?)
    }

    pub fn party_service(&self) -> FixtureResult<SqlitePartyService<'conn>> {
        Ok(PartyService::new(
            SqlitePartyRepository::try_new(self.conn)?,
            SqliteRelationshipRepository::try_new(self.conn)?,
        ))
    }

    pub fn order_service(&self) -> FixtureResult<SqliteOrderService<'conn>> {
        Ok(OrderService::new(
            SqliteOrderRepository::try_new(self.conn)?,
            SqliteOrderItemRepository::try_new(self.conn)?,
            SqliteTenancyRepository::try_new(self.conn)?,
        ))
    }

    fn into_report(self) -> ExecutionReport {
        ExecutionReport {
            run_id: self.run_id,
            executed: self.executed,
            results: self.results,
        }
    }
}

/// Runs `fixture` and its children inside one IMMEDIATE transaction.
///
/// Any error aborts the remaining chain and rolls back everything the run
/// wrote.
pub fn run_fixture(conn: &mut Connection, fixture: &dyn Fixture) -> FixtureResult<ExecutionReport> {
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let outcome = {
        let mut ctx = ExecutionContext::new(&tx);
        info!(
            "event=fixture_run module=fixture status=start run_id={} fixture={}",
            ctx.run_id,
            fixture.name()
        );
        ctx.execute(fixture).map(|()| ctx.into_report())
    };

    match outcome {
        Ok(report) => {
            tx.commit()?;
            info!(
                "event=fixture_run module=fixture status=ok run_id={} fixture={} executed={} results={} duration_ms={}",
                report.run_id,
                fixture.name(),
                report.executed.len(),
                report.results.len(),
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=fixture_run module=fixture status=rolled_back fixture={} duration_ms={} error={}",
                fixture.name(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
