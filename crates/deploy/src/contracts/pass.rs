//! ValidatorPass, the NFT minted by the genesis sale.

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

/// Context the pass is deployed in when resolved as a dependency.
pub const CONTEXT: &str = "lib/validator-pass";

pub const STEP_ID: &str = "ValidatorPass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorPassDeployment {
    #[serde(alias = "validatorpass")]
    pub validator_pass: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorPassSettings {
    /// Deep-merged one level with the default step options.
    pub options: Option<StepOptions>,
}

impl ValidatorPassSettings {
    pub fn defaults() -> Self {
        Self {
            options: Some(StepOptions::named(STEP_ID)),
        }
    }
}

impl Merge for ValidatorPassSettings {
    fn merge(self, defaults: Self) -> Self {
        Self {
            options: merge_nested(self.options, defaults.options),
        }
    }
}

pub async fn resolve<B, S>(
    deployer: &mut Deployer<B, S>,
    settings: Option<ValidatorPassSettings>,
) -> Result<ValidatorPassDeployment>
where
    B: DeploymentBackend,
    S: DeploymentStore,
{
    let settings = merge(settings, ValidatorPassSettings::defaults());
    let step = DeployStep::with_options(
        Contract::ValidatorPass.as_ref(),
        settings.options.unwrap_or_default(),
    )?;

    let artifact = deployer.deploy(step).await?;

    Ok(ValidatorPassDeployment {
        validator_pass: artifact.address,
    })
}
