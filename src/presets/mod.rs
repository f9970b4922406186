//! Built-in reference records
//!
//! Two presets for the point-mass task. The MPC preset differs from the
//! NPG preset in eval_rollouts, refresh_fit and an added planning block.

use crate::errors::Result;
use crate::literal::{self, Mapping};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

impl Preset {
    pub fn mapping(&self) -> Result<Mapping> {
        literal::parse(self.source)
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "point_mass_npg",
        description: "Model-based NPG on mjrl_point_mass-v0",
        source: include_str!("../../configs/point_mass_npg.txt"),
    },
    Preset {
        name: "point_mass_mpc",
        description: "Model-based NPG with MPC planning on mjrl_point_mass-v0",
        source: include_str!("../../configs/point_mass_mpc.txt"),
    },
];

pub fn all() -> &'static [Preset] {
    PRESETS
}

pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_parse() {
        for p in all() {
            let m = p.mapping().unwrap();
            assert!(!m.is_empty(), "{} parsed empty", p.name);
        }
    }

    #[test]
    fn test_lookup() {
        assert!(preset("point_mass_mpc").is_some());
        assert!(preset("cheetah").is_none());
    }
}
