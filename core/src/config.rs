use crate::{
    bonus::{BonusReelSets, BonusRules},
    error::{SimError, SimResult},
    reels::{ReelSet, ReelSource},
    symbol::{SpecialSymbols, Symbol, SymbolTable},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Bet modes ──────────────────────────────────────────────────────

/// How a mode is priced, which fixes its RTP divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeCategory {
    /// Plain base-cost spins.
    Base,
    /// Base game at a raised price for a better trigger rate.
    Ante,
    /// Bonus bought as a package.
    BuyBonus,
    /// Fixed-structure side mode, already in bet-multiplier units.
    Side,
}

impl ModeCategory {
    /// Σ win / numSims, or Σ win / (numSims × cost) for priced modes.
    pub fn rtp(&self, wins: f64, num_sims: u64, cost: f64) -> f64 {
        if num_sims == 0 || cost <= 0.0 {
            log::warn!("cannot compute RTP: num_sims={num_sims} cost={cost}");
            return 0.0;
        }
        match self {
            Self::Base | Self::Side => wins / num_sims as f64,
            Self::Ante | Self::BuyBonus => wins / (num_sims as f64 * cost),
        }
    }
}

/// Base-game reel-set weighting. Bonus spins draw from the reel sets
/// named in `BonusRules`, so no other game type is accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReelWeights {
    pub base: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub criteria: String,
    pub quota: u64,
    /// Exact final win an accepted simulation must show.
    #[serde(default)]
    pub win_criteria: Option<f64>,
    pub reel_weights: ReelWeights,
    #[serde(default)]
    pub force_freegame: bool,
    #[serde(default)]
    pub force_wincap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetMode {
    pub name: String,
    pub cost: f64,
    pub category: ModeCategory,
    pub win_cap: f64,
    pub distributions: Vec<Distribution>,
}

impl BetMode {
    pub fn distribution(&self, criteria: &str) -> SimResult<&Distribution> {
        self.distributions
            .iter()
            .find(|d| d.criteria == criteria)
            .ok_or_else(|| SimError::UnknownCriteria {
                mode: self.name.clone(),
                criteria: criteria.to_string(),
            })
    }

    pub fn rtp(&self, wins: f64, num_sims: u64) -> f64 {
        self.category.rtp(wins, num_sims, self.cost)
    }
}

// ── Game configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_id: String,
    pub symbols: SymbolTable,
    pub reel_sets: HashMap<String, ReelSet>,
    pub bonus: BonusRules,
    pub bet_modes: Vec<BetMode>,
}

impl ReelSource for GameConfig {
    fn reel_set(&self, id: &str) -> Option<&ReelSet> {
        self.reel_sets.get(id)
    }
}

impl GameConfig {
    /// Load from `{data_dir}/game_config.json`.
    /// In tests, use GameConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/game_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        let config: GameConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn bet_mode(&self, name: &str) -> SimResult<&BetMode> {
        self.bet_modes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| SimError::UnknownBetMode { name: name.to_string() })
    }

    /// Every reel set a mode or the bonus rules refer to must exist and
    /// have two non-empty reels.
    pub fn validate(&self) -> SimResult<()> {
        let sets = &self.bonus.reel_sets;
        let mut referenced: Vec<&str> = vec![
            sets.bonk.as_str(),
            sets.super_bonk.as_str(),
            sets.sticky_stick.as_str(),
            sets.sticky_run.as_str(),
        ];
        for mode in &self.bet_modes {
            if mode.distributions.is_empty() {
                return Err(SimError::InvalidConfig {
                    reason: format!("bet mode '{}' has no distributions", mode.name),
                });
            }
            if mode.cost <= 0.0 {
                return Err(SimError::InvalidConfig {
                    reason: format!("bet mode '{}' has non-positive cost", mode.name),
                });
            }
            for dist in &mode.distributions {
                if dist.quota == 0 {
                    return Err(SimError::InvalidConfig {
                        reason: format!(
                            "criteria '{}' in '{}' has zero quota",
                            dist.criteria, mode.name
                        ),
                    });
                }
                if dist.reel_weights.base.values().sum::<u64>() == 0 {
                    return Err(SimError::InvalidConfig {
                        reason: format!(
                            "criteria '{}' in '{}' has no base reel weight",
                            dist.criteria, mode.name
                        ),
                    });
                }
                referenced.extend(dist.reel_weights.base.keys().map(String::as_str));
            }
        }
        for id in referenced {
            let set = self
                .reel_sets
                .get(id)
                .ok_or_else(|| SimError::UnknownReelSet { id: id.to_string() })?;
            if let Some(reel) = set.reels.iter().position(Vec::is_empty) {
                return Err(SimError::EmptyReel { id: id.to_string(), reel });
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let numeric = [
            ("1", 30), ("2", 20), ("3", 14), ("5", 10), ("10", 6),
            ("25", 4), ("50", 2), ("100", 1),
        ];

        let mut br0 = numeric.to_vec();
        br0.extend([("Bat", 3), ("Golden Bat", 1)]);
        let mut hunt = numeric.to_vec();
        hunt.extend([("Bat", 9), ("Golden Bat", 3)]);
        let mut bon1 = numeric.to_vec();
        bon1.extend([("Bat", 8), ("Golden Bat", 2)]);
        let mut bon2 = numeric.to_vec();
        bon2.push(("Golden Bat", 3));
        let mut run = numeric.to_vec();
        run.push(("Golden Bat", 2));

        let mut reel_sets = HashMap::new();
        reel_sets.insert("BR0".into(), ReelSet::mirrored(strip(&br0)));
        reel_sets.insert("Bonus_Hunt".into(), ReelSet::mirrored(strip(&hunt)));
        reel_sets.insert("BON1".into(), ReelSet::mirrored(strip(&bon1)));
        reel_sets.insert("BON2".into(), ReelSet::mirrored(strip(&bon2)));
        reel_sets.insert("BON2_stick".into(), ReelSet::mirrored(strip(&numeric)));
        reel_sets.insert("BON2_run".into(), ReelSet::mirrored(strip(&run)));
        reel_sets.insert(
            "Horny_Jail".into(),
            ReelSet::new(vec![Symbol::new("1000")], strip(&numeric)),
        );

        let specials = SpecialSymbols {
            bonk: Symbol::new("Bat"),
            super_bonk: Symbol::new("Golden Bat"),
        };
        let symbols = SymbolTable {
            base: HashMap::from([(specials.bonk.clone(), 1), (specials.super_bonk.clone(), 1)]),
            bonk: HashMap::from([(specials.bonk.clone(), 50), (specials.super_bonk.clone(), 10)]),
            super_bonk: HashMap::from([
                (specials.bonk.clone(), 0),
                (specials.super_bonk.clone(), 10),
            ]),
            specials,
        };

        let bonus = BonusRules {
            bonk_spins: 10,
            super_bonk_spins: 15,
            double_trigger_spins: 20,
            bonk_multiplier: 1,
            super_bonk_multiplier: 2,
            bonk_extra_spins: 2,
            super_bonk_extra_spins: 5,
            max_win_ceiling: 10_000_000,
            reel_sets: BonusReelSets {
                bonk: "BON1".into(),
                super_bonk: "BON2".into(),
                sticky_stick: "BON2_stick".into(),
                sticky_run: "BON2_run".into(),
            },
        };

        let bet_modes = vec![
            single_mode("base", 1.0, ModeCategory::Base, "0", "BR0", false),
            single_mode("bonus_hunt", 3.0, ModeCategory::Ante, "0", "Bonus_Hunt", false),
            single_mode("Horny_Jail", 20_000.0, ModeCategory::Side, "0", "Horny_Jail", false),
            single_mode(
                "buy_bonk_spins",
                40.0,
                ModeCategory::BuyBonus,
                "buy_bonk_spins",
                "BON1",
                true,
            ),
            single_mode(
                "buy_super_bonk_spins",
                200.0,
                ModeCategory::BuyBonus,
                "buy_super_bonk_spins",
                "BON2",
                true,
            ),
        ];

        Self {
            game_id: "0_0_bonk".into(),
            symbols,
            reel_sets,
            bonus,
            bet_modes,
        }
    }
}

/// Expand (token, count) pairs into a reel strip.
fn strip(counts: &[(&str, usize)]) -> Vec<Symbol> {
    counts
        .iter()
        .flat_map(|&(token, n)| std::iter::repeat(Symbol::new(token)).take(n))
        .collect()
}

fn single_mode(
    name: &str,
    cost: f64,
    category: ModeCategory,
    criteria: &str,
    reel_set: &str,
    force_freegame: bool,
) -> BetMode {
    let weights = BTreeMap::from([(reel_set.to_string(), 1)]);
    BetMode {
        name: name.into(),
        cost,
        category,
        win_cap: 1_000_000.0,
        distributions: vec![Distribution {
            criteria: criteria.into(),
            quota: 1,
            win_criteria: None,
            reel_weights: ReelWeights { base: weights },
            force_freegame,
            force_wincap: false,
        }],
    }
}
