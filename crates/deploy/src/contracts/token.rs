//! OpenToken, the ERC20 sold by the genesis sale.

use alloy_core::primitives::Address;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::Contract;
use crate::{
    backend::DeploymentBackend,
    deployer::{DeployStep, Deployer},
    settings::{Merge, StepOptions, merge, merge_nested},
    store::DeploymentStore,
};

/// Context the token is deployed in when resolved as a dependency.
pub const CONTEXT: &str = "lib/open-token";

/// Default step id.
pub const STEP_ID: &str = "OpenToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTokenDeployment {
    #[serde(alias = "opentoken")]
    pub open_token: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTokenSettings {
    /// Deep-merged one level with the default step options.
    pub options: Option<StepOptions>,
}

impl OpenTokenSettings {
    pub fn defaults() -> Self {
        Self {
            options: Some(StepOptions::named(STEP_ID)),
        }
    }
}

impl Merge for OpenTokenSettings {
    fn merge(self, defaults: Self) -> Self {
        Self {
            options: merge_nested(self.options, defaults.options),
        }
    }
}

/// Deploy the token. The constructor takes no arguments.
pub async fn resolve<B, S>(
    deployer: &mut Deployer<B, S>,
    settings: Option<OpenTokenSettings>,
) -> Result<OpenTokenDeployment>
where
    B: DeploymentBackend,
    S: DeploymentStore,
{
    let settings = merge(settings, OpenTokenSettings::defaults());
    let step = DeployStep::with_options(
        Contract::OpenToken.as_ref(),
        settings.options.unwrap_or_default(),
    )?;

    let artifact = deployer.deploy(step).await?;

    Ok(OpenTokenDeployment {
        open_token: artifact.address,
    })
}
