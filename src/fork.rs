//! Hardfork rules: a monotone ordering of protocol revisions plus the boolean
//! flags they gate, and a chain-type tag distinguishing mainnet from L2 deployments.

use serde::{Deserialize, Serialize};

/// A named protocol revision. Variants are declared oldest-first so that the
/// derived [`PartialOrd`]/[`Ord`] implementations give the usual
/// `fork >= Fork::London` style availability checks used throughout the
/// opcode and gas tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Fork {
    #[default]
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Merge,
    Shanghai,
    Cancun,
}

impl Fork {
    /// The latest fork this core knows how to execute.
    pub const LATEST: Fork = Fork::Cancun;

    pub const fn is_homestead(self) -> bool {
        self as u8 >= Fork::Homestead as u8
    }

    pub const fn is_tangerine_whistle(self) -> bool {
        self as u8 >= Fork::TangerineWhistle as u8
    }

    pub const fn is_spurious_dragon(self) -> bool {
        self as u8 >= Fork::SpuriousDragon as u8
    }

    pub const fn is_byzantium(self) -> bool {
        self as u8 >= Fork::Byzantium as u8
    }

    pub const fn is_constantinople(self) -> bool {
        self as u8 >= Fork::Constantinople as u8
    }

    pub const fn is_petersburg(self) -> bool {
        self as u8 >= Fork::Petersburg as u8
    }

    pub const fn is_istanbul(self) -> bool {
        self as u8 >= Fork::Istanbul as u8
    }

    pub const fn is_berlin(self) -> bool {
        self as u8 >= Fork::Berlin as u8
    }

    pub const fn is_london(self) -> bool {
        self as u8 >= Fork::London as u8
    }

    pub const fn is_merge(self) -> bool {
        self as u8 >= Fork::Merge as u8
    }

    pub const fn is_shanghai(self) -> bool {
        self as u8 >= Fork::Shanghai as u8
    }

    pub const fn is_cancun(self) -> bool {
        self as u8 >= Fork::Cancun as u8
    }
}

/// Distinguishes the mainnet precompile/opcode set from an L2 chain's.
///
/// L2 chains built on this core may expose additional precompiles at
/// reserved addresses; the core itself only ever dispatches the mainnet set,
/// but the tag is threaded through so a host can extend the precompile
/// dispatcher without forking the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChainType {
    #[default]
    Mainnet,
    L2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_ordering_is_monotone() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::London < Fork::Shanghai);
        assert!(Fork::Shanghai < Fork::Cancun);
    }

    #[test]
    fn flags_follow_ordering() {
        assert!(!Fork::Frontier.is_london());
        assert!(Fork::London.is_london());
        assert!(Fork::Cancun.is_london());
        assert!(Fork::Cancun.is_cancun());
        assert!(!Fork::Shanghai.is_cancun());
    }
}
