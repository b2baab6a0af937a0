//! OpenmeshGenesis whitelist mint: ValidatorPass mints priced by a tiered
//! schedule, open to whitelisted accounts first and to everyone after the
//! public mint time.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{
    Contract,
    pass::{self, ValidatorPassDeployment},
};
use crate::{
    backend::DeploymentBackend,
    deployer::{DeployStep, Deployer},
    price::{PricePeriod, PriceSchedule},
    settings::{Merge, StepOptions, merge, merge_nested, required},
    store::DeploymentStore,
};

pub const STEP_ID: &str = "OpenmeshGenesis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintDeployment {
    pub openmesh_genesis: Address,
    pub validator_pass: Address,
}

/// Whitelist mint settings.
///
/// `price_periods`, `public_mint_time` and `whitelist_root` have no defaults
/// and must be supplied. `validator_pass` is replaced whole; `options` is
/// deep-merged one level. Keys also accept the lowercase spelling produced by
/// environment variables, e.g. `publicminttime`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintSettings {
    #[serde(alias = "validatorpass")]
    pub validator_pass: Option<ValidatorPassDeployment>,
    #[serde(alias = "priceperiods")]
    pub price_periods: Option<Vec<PricePeriod>>,
    #[serde(alias = "publicminttime")]
    pub public_mint_time: Option<u32>,
    #[serde(alias = "whitelistroot")]
    pub whitelist_root: Option<B256>,
    pub options: Option<StepOptions>,
}

impl MintSettings {
    pub fn defaults() -> Self {
        Self {
            options: Some(StepOptions::named(STEP_ID)),
            ..Default::default()
        }
    }
}

impl Merge for MintSettings {
    fn merge(self, defaults: Self) -> Self {
        Self {
            validator_pass: self.validator_pass.merge(defaults.validator_pass),
            price_periods: self.price_periods.merge(defaults.price_periods),
            public_mint_time: self.public_mint_time.merge(defaults.public_mint_time),
            whitelist_root: self.whitelist_root.merge(defaults.whitelist_root),
            options: merge_nested(self.options, defaults.options),
        }
    }
}

/// Deploy the whitelist mint, deploying the pass first unless supplied.
///
/// Constructor arguments, in order: `validatorPass (address)`,
/// `mintThresholds ((uint256,uint256)[])`, `publicMintTime (uint32)`,
/// `whitelistRoot (bytes32)`.
pub async fn resolve<B, S>(
    deployer: &mut Deployer<B, S>,
    settings: Option<MintSettings>,
) -> Result<MintDeployment>
where
    B: DeploymentBackend,
    S: DeploymentStore,
{
    let settings = merge(settings, MintSettings::defaults());

    // Configuration errors surface before anything is deployed.
    let schedule = PriceSchedule::new(required(settings.price_periods, "pricePeriods")?)?;
    let public_mint_time = required(settings.public_mint_time, "publicMintTime")?;
    let whitelist_root = required(settings.whitelist_root, "whitelistRoot")?;

    let pass = match settings.validator_pass {
        Some(pass) => pass,
        None => {
            deployer
                .in_context(pass::CONTEXT, async |deployer| {
                    pass::resolve(deployer, None).await
                })
                .await?
        }
    };

    let step = DeployStep::with_options(
        Contract::OpenmeshGenesis.as_ref(),
        settings.options.unwrap_or_default(),
    )?
    .args(vec![
        DynSolValue::Address(pass.validator_pass),
        schedule.to_abi(),
        DynSolValue::Uint(U256::from(public_mint_time), 32),
        DynSolValue::FixedBytes(whitelist_root, 32),
    ]);

    let artifact = deployer.deploy(step).await?;

    Ok(MintDeployment {
        openmesh_genesis: artifact.address,
        validator_pass: pass.validator_pass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::SimulatedBackend, store::MemoryStore};

    fn deployer() -> Deployer<SimulatedBackend, MemoryStore> {
        Deployer::new(
            SimulatedBackend::new(Address::repeat_byte(0x42)),
            MemoryStore::new(),
        )
    }

    fn settings() -> MintSettings {
        MintSettings {
            price_periods: Some(vec![
                PricePeriod::new(0, U256::from(1_000)),
                PricePeriod::new(10, U256::from(2_000)),
            ]),
            public_mint_time: Some(1_710_028_800),
            whitelist_root: Some(B256::repeat_byte(0xab)),
            ..Default::default()
        }
    }

    #[test]
    fn test_lowercase_keys_deserialize() {
        let settings: MintSettings = serde_json::from_value(serde_json::json!({
            "publicminttime": 1_710_028_800u32,
            "whitelistroot": B256::repeat_byte(0xab),
            "priceperiods": [{"mintcount": "0x0", "price": "0x3e8"}],
        }))
        .unwrap();

        assert_eq!(settings.public_mint_time, Some(1_710_028_800));
        assert_eq!(settings.whitelist_root, Some(B256::repeat_byte(0xab)));
        assert_eq!(
            settings.price_periods,
            Some(vec![PricePeriod::new(0, U256::from(1_000))])
        );
    }

    #[tokio::test]
    async fn test_deploys_pass_then_mint() {
        let mut deployer = deployer();
        let deployment = resolve(&mut deployer, Some(settings())).await.unwrap();

        let deployments = deployer.backend().deployments();
        assert_eq!(deployments.len(), 2);
        assert_eq!(deployments[0].key.to_string(), "lib/validator-pass/ValidatorPass");
        assert_eq!(deployments[1].key.to_string(), "OpenmeshGenesis");
        assert_eq!(
            deployments[1].args[0],
            DynSolValue::Address(deployment.validator_pass)
        );
        assert_eq!(
            deployments[1].args[3],
            DynSolValue::FixedBytes(B256::repeat_byte(0xab), 32)
        );
    }

    #[tokio::test]
    async fn test_missing_root_fails_before_deploying() {
        let mut deployer = deployer();
        let result = resolve(
            &mut deployer,
            Some(MintSettings {
                whitelist_root: None,
                ..settings()
            }),
        )
        .await;

        let error = result.unwrap_err().to_string();
        assert!(error.contains("whitelistRoot"), "unexpected error: {error}");
        assert!(deployer.backend().deployments().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let mut deployer = deployer();
        let result = resolve(
            &mut deployer,
            Some(MintSettings {
                price_periods: Some(Vec::new()),
                ..settings()
            }),
        )
        .await;

        assert!(result.is_err());
        assert!(deployer.backend().deployments().is_empty());
    }
}
