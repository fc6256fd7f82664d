//! Application tenancy fixtures.

use super::{ExecutionContext, Fixture, FixtureObject, FixtureResult};
use crate::model::tenancy::{ApplicationTenancy, NewTenancy, ROOT_PATH};
use crate::repo::tenancy_repo::TenancyRepository;

/// Seeds the global tenancy `/`.
pub struct ApplicationTenancyForGlobal;

impl ApplicationTenancyForGlobal {
    pub const PATH: &'static str = ROOT_PATH;
    pub const NAME: &'static str = "Global";
}

impl Fixture for ApplicationTenancyForGlobal {
    fn name(&self) -> &'static str {
        "application-tenancy-global"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        create_tenancy(ctx, self, &NewTenancy::new(Self::PATH, Self::NAME, None))?;
        Ok(())
    }
}

/// Seeds the Great Britain country tenancy `/GB`.
pub struct ApplicationTenancyForGb;

impl ApplicationTenancyForGb {
    pub const PATH: &'static str = "/GB";
    pub const NAME: &'static str = "Great Britain";
}

impl Fixture for ApplicationTenancyForGb {
    fn name(&self) -> &'static str {
        "application-tenancy-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &ApplicationTenancyForGlobal)?;
        create_tenancy(
            ctx,
            self,
            &NewTenancy::new(
                Self::PATH,
                Self::NAME,
                Some(ApplicationTenancyForGlobal::PATH),
            ),
        )?;
        Ok(())
    }
}

fn create_tenancy(
    ctx: &mut ExecutionContext<'_>,
    fixture: &dyn Fixture,
    draft: &NewTenancy,
) -> FixtureResult<ApplicationTenancy> {
    let tenancy = ctx.tenancies()?.find_or_create(draft)?;
    ctx.add_result(
        fixture,
        tenancy.path.clone(),
        FixtureObject::Tenancy(tenancy.clone()),
    );
    Ok(tenancy)
}
