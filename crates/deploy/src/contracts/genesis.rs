//! OpenmeshGenesis periodic sale: OpenToken sold for ether at a rate that
//! decreases period by period, with the ValidatorPass minted to participants.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{
    Contract,
    pass::{self, ValidatorPassDeployment},
    token::{self, OpenTokenDeployment},
};
use crate::{
    backend::DeploymentBackend,
    deployer::{DeployStep, Deployer},
    settings::{Merge, StepOptions, merge, merge_nested, required},
    store::DeploymentStore,
    units::{DAYS, WEI_PER_ETHER, ether, utc_blockchain_date},
};

pub const STEP_ID: &str = "Openmesh Genesis";

/// Addresses produced by a genesis sale deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisDeployment {
    pub openmesh_genesis: Address,
    pub open_token: Address,
    pub validator_pass: Address,
}

/// Genesis sale settings.
///
/// Merge semantics per field:
/// - `tokens_per_wei_per_period`, `start`, `period_ends`, `min_wei_per_account`,
///   `max_wei_per_account`: override wins, default fallback. Lists are replaced
///   whole, never merged element-wise.
/// - `token`, `nft`: whole-object replacement. A supplied deployment is used as
///   is and the nested deployment is skipped.
/// - `options`: deep-merged one level with the default step options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSettings {
    #[serde(alias = "tokensperweiperperiod")]
    pub tokens_per_wei_per_period: Option<Vec<U256>>,
    pub token: Option<OpenTokenDeployment>,
    pub nft: Option<ValidatorPassDeployment>,
    pub start: Option<u32>,
    #[serde(alias = "periodends")]
    pub period_ends: Option<Vec<u32>>,
    #[serde(alias = "minweiperaccount")]
    pub min_wei_per_account: Option<U256>,
    #[serde(alias = "maxweiperaccount")]
    pub max_wei_per_account: Option<U256>,
    pub options: Option<StepOptions>,
}

impl GenesisSettings {
    /// Defaults: three periods in March 2024 at 30000, 27500 and 25000 tokens
    /// per wei, with 0.5 to 2 ether per account.
    pub fn defaults() -> Result<Self> {
        let start = utc_blockchain_date(2024, 3, 2)?;
        Ok(Self {
            tokens_per_wei_per_period: Some(
                [30_000u64, 27_500, 25_000].map(U256::from).to_vec(),
            ),
            token: None,
            nft: None,
            start: Some(start),
            period_ends: Some([8, 18, 28].map(|days| start + days * DAYS).to_vec()),
            min_wei_per_account: Some(U256::from(WEI_PER_ETHER / 2)),
            max_wei_per_account: Some(ether(2)),
            options: Some(StepOptions::named(STEP_ID)),
        })
    }
}

impl Merge for GenesisSettings {
    fn merge(self, defaults: Self) -> Self {
        Self {
            tokens_per_wei_per_period: self
                .tokens_per_wei_per_period
                .merge(defaults.tokens_per_wei_per_period),
            token: self.token.merge(defaults.token),
            nft: self.nft.merge(defaults.nft),
            start: self.start.merge(defaults.start),
            period_ends: self.period_ends.merge(defaults.period_ends),
            min_wei_per_account: self.min_wei_per_account.merge(defaults.min_wei_per_account),
            max_wei_per_account: self.max_wei_per_account.merge(defaults.max_wei_per_account),
            options: merge_nested(self.options, defaults.options),
        }
    }
}

/// Deploy the genesis sale, deploying the token and the pass first unless
/// they are supplied.
///
/// Constructor arguments, in order: `tokensPerWeiPerPeriod (uint256[])`,
/// `token (address)`, `nft (address)`, `start (uint32)`,
/// `periodEnds (uint32[])`, `minWeiPerAccount (uint256)`,
/// `maxWeiPerAccount (uint256)`.
pub async fn resolve<B, S>(
    deployer: &mut Deployer<B, S>,
    settings: Option<GenesisSettings>,
) -> Result<GenesisDeployment>
where
    B: DeploymentBackend,
    S: DeploymentStore,
{
    let settings = merge(settings, GenesisSettings::defaults()?);

    let tokens_per_wei_per_period =
        required(settings.tokens_per_wei_per_period, "tokensPerWeiPerPeriod")?;
    let start = required(settings.start, "start")?;
    let period_ends = required(settings.period_ends, "periodEnds")?;
    let min_wei_per_account = required(settings.min_wei_per_account, "minWeiPerAccount")?;
    let max_wei_per_account = required(settings.max_wei_per_account, "maxWeiPerAccount")?;

    anyhow::ensure!(
        tokens_per_wei_per_period.len() == period_ends.len(),
        "Expected one period end per sale period, got {} rates and {} period ends",
        tokens_per_wei_per_period.len(),
        period_ends.len()
    );
    anyhow::ensure!(
        std::iter::once(&start)
            .chain(&period_ends)
            .is_sorted_by(|a, b| a < b),
        "Sale start and period ends must be strictly increasing"
    );
    anyhow::ensure!(
        min_wei_per_account <= max_wei_per_account,
        "minWeiPerAccount ({}) exceeds maxWeiPerAccount ({})",
        min_wei_per_account,
        max_wei_per_account
    );

    let token = match settings.token {
        Some(token) => token,
        None => {
            deployer
                .in_context(token::CONTEXT, async |deployer| {
                    token::resolve(deployer, None).await
                })
                .await?
        }
    };
    let nft = match settings.nft {
        Some(nft) => nft,
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
        DynSolValue::Array(
            tokens_per_wei_per_period
                .into_iter()
                .map(|rate| DynSolValue::Uint(rate, 256))
                .collect(),
        ),
        DynSolValue::Address(token.open_token),
        DynSolValue::Address(nft.validator_pass),
        DynSolValue::Uint(U256::from(start), 32),
        DynSolValue::Array(
            period_ends
                .into_iter()
                .map(|end| DynSolValue::Uint(U256::from(end), 32))
                .collect(),
        ),
        DynSolValue::Uint(min_wei_per_account, 256),
        DynSolValue::Uint(max_wei_per_account, 256),
    ]);

    let artifact = deployer.deploy(step).await?;

    Ok(GenesisDeployment {
        openmesh_genesis: artifact.address,
        open_token: token.open_token,
        validator_pass: nft.validator_pass,
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

    #[test]
    fn test_defaults() {
        let defaults = GenesisSettings::defaults().unwrap();
        assert_eq!(defaults.start, Some(1_709_337_600));
        assert_eq!(
            defaults.period_ends,
            Some(vec![
                utc_blockchain_date(2024, 3, 10).unwrap(),
                utc_blockchain_date(2024, 3, 20).unwrap(),
                utc_blockchain_date(2024, 3, 30).unwrap(),
            ])
        );
        assert_eq!(
            defaults.min_wei_per_account,
            Some(U256::from(500_000_000_000_000_000u128))
        );
        assert!(defaults.token.is_none());
    }

    #[test]
    fn test_partial_options_keep_default_step_id() {
        let sender = Address::repeat_byte(0x07);
        let overrides = GenesisSettings {
            options: Some(StepOptions {
                id: None,
                from: Some(sender),
            }),
            ..Default::default()
        };

        let merged = merge(Some(overrides), GenesisSettings::defaults().unwrap());
        let options = merged.options.unwrap();
        assert_eq!(options.id.as_deref(), Some(STEP_ID));
        assert_eq!(options.from, Some(sender));
    }

    #[tokio::test]
    async fn test_prebuilt_dependencies_are_used_verbatim() {
        let mut deployer = deployer();
        let token = OpenTokenDeployment {
            open_token: Address::repeat_byte(0x01),
        };
        let nft = ValidatorPassDeployment {
            validator_pass: Address::repeat_byte(0x02),
        };

        let deployment = resolve(
            &mut deployer,
            Some(GenesisSettings {
                token: Some(token),
                nft: Some(nft),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let deployments = deployer.backend().deployments();
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].contract, "OpenmeshGenesis");
        assert_eq!(deployments[0].args[1], DynSolValue::Address(token.open_token));
        assert_eq!(deployments[0].args[2], DynSolValue::Address(nft.validator_pass));
        assert_eq!(deployment.open_token, token.open_token);
    }

    #[tokio::test]
    async fn test_mismatched_periods_are_rejected() {
        let mut deployer = deployer();
        let result = resolve(
            &mut deployer,
            Some(GenesisSettings {
                period_ends: Some(vec![1_710_028_800]),
                ..Default::default()
            }),
        )
        .await;

        assert!(result.is_err());
        assert!(deployer.backend().deployments().is_empty());
    }
}
