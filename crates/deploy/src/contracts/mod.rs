//! Resolvers for the deployable contracts.
//!
//! Each resolver merges its settings with its own defaults, resolves missing
//! dependencies inside a context named after the dependency's module, and issues
//! exactly one deployment for its own contract.

pub mod genesis;
pub mod mint;
pub mod pass;
pub mod token;

pub use genesis::{GenesisDeployment, GenesisSettings};
pub use mint::{MintDeployment, MintSettings};
pub use pass::{ValidatorPassDeployment, ValidatorPassSettings};
pub use token::{OpenTokenDeployment, OpenTokenSettings};

/// Compiled contracts known to the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr)]
pub enum Contract {
    OpenToken,
    ValidatorPass,
    OpenmeshGenesis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_contract_names_match_artifacts() {
        assert_eq!(Contract::OpenmeshGenesis.to_string(), "OpenmeshGenesis");
        assert_eq!(Contract::from_str("ValidatorPass").unwrap(), Contract::ValidatorPass);
        assert_eq!(Contract::OpenToken.as_ref(), "OpenToken");
    }
}
