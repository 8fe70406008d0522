// src/exec/target_runner.rs

use tracing::{error, info};

use crate::exec::backend::{BoxFuture, BuildOutcome, PackageTester, RecipeBuilder, TargetBuilder};
use crate::recipe::Target;

/// Builds a target and, if a tester is configured, tests the artifact in a
/// minimal environment. Either step failing fails the target.
pub struct TargetRunner {
    builder: Box<dyn RecipeBuilder>,
    tester: Option<Box<dyn PackageTester>>,
}

impl TargetRunner {
    pub fn new(builder: Box<dyn RecipeBuilder>) -> Self {
        Self {
            builder,
            tester: None,
        }
    }

    /// Run the package test after every successful build.
    pub fn with_package_test(mut self, tester: Box<dyn PackageTester>) -> Self {
        self.tester = Some(tester);
        self
    }

    async fn run(&mut self, target: &Target) -> crate::errors::Result<BuildOutcome> {
        let envstring = target.envstring();
        info!("BUILD START {}, env: {}", target.recipe, envstring);

        if !self.builder.build(target).await? {
            error!("BUILD FAILED {}, {}", target.recipe, envstring);
            return Ok(BuildOutcome::failure());
        }
        info!("BUILD SUCCESS {}, {}", target.pkg.display(), envstring);

        let Some(tester) = self.tester.as_mut() else {
            return Ok(BuildOutcome::success(None));
        };

        info!("TEST START via package test {}, {}", target.recipe, envstring);
        let result = tester.test(&target.pkg).await?;

        if result.passed() {
            info!("TEST SUCCESS {}, {}", target.recipe, envstring);
            Ok(BuildOutcome::success(tester.image_name(&target.pkg)))
        } else {
            error!("TEST FAILED: {}, {}", target.recipe, envstring);
            error!("STDOUT+STDERR:\n{}", result.output);
            Ok(BuildOutcome::failure())
        }
    }
}

impl TargetBuilder for TargetRunner {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, BuildOutcome> {
        Box::pin(self.run(target))
    }
}
