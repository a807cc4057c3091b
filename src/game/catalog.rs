//! Static game tables: resources, locations, tools, upgrades, bosses, recipes and
//! quest templates. The engine only ever reads these.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::types::{EffectKind, QuestPeriod};

pub const CLICK_POWER: &str = "click_power";
pub const CRIT_CHANCE: &str = "crit_chance";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDef {
    pub id: String,
    pub name: String,
    /// Gold paid per unit on the market
    pub base_price: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropEntry {
    pub resource_id: String,
    pub probability: f64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub min_level: u32,
    pub min_tool_level: u32,
    /// Ordered; cumulative probability decides the winner.
    pub drops: Vec<DropEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDef {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub required_level: u32,
    pub base_power: u32,
    /// Per-level resource cost; multiplied by the current level when upgrading.
    pub upgrade_cost: BTreeMap<String, u64>,
}

impl ToolDef {
    pub fn upgrade_cost_at(&self, level: u32) -> BTreeMap<String, u64> {
        if level == 0 {
            return BTreeMap::new();
        }
        self.upgrade_cost
            .iter()
            .map(|(res, amount)| (res.clone(), amount * level as u64))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    pub base_price: u64,
    pub price_mult: f64,
}

impl UpgradeDef {
    pub fn price_at(&self, level: u32) -> u64 {
        (self.base_price as f64 * self.price_mult.powi(level as i32)).floor() as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRange {
    pub resource_id: String,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub min_level: u32,
    pub min_tool_level: u32,
    pub health: u64,
    pub reward_gold: u64,
    pub reward_exp: u64,
    pub reward_resources: Vec<ResourceRange>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermanentModifier {
    ToolPower,
    CritChance,
}

impl PermanentModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermanentModifier::ToolPower => "tool_power_bonus",
            PermanentModifier::CritChance => "crit_bonus",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RecipeOutput {
    Resource {
        resource_id: String,
        amount: u64,
    },
    Consumable {
        effect_id: String,
        effect: EffectKind,
        duration_minutes: u32,
    },
    Key {
        item_id: String,
        boss_id: String,
        #[serde(default)]
        lifetime_hours: Option<u32>,
    },
    Permanent {
        modifier: PermanentModifier,
        amount: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDef {
    pub id: String,
    pub name: String,
    pub costs: BTreeMap<String, u64>,
    pub output: RecipeOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    /// Human readable; progress matching is a substring test against this.
    pub name: String,
    /// `{}` is replaced with the rolled goal.
    pub description: String,
    pub goal_min: u64,
    pub goal_max: u64,
    pub reward_gold: u64,
    pub reward_exp: u64,
}

impl QuestTemplate {
    pub fn describe(&self, goal: u64) -> String {
        self.description.replacen("{}", &goal.to_string(), 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub starting_location: String,
    pub starting_tool: String,
    pub resources: Vec<ResourceDef>,
    pub locations: Vec<LocationDef>,
    pub tools: Vec<ToolDef>,
    pub upgrades: Vec<UpgradeDef>,
    pub bosses: Vec<BossDef>,
    pub recipes: Vec<RecipeDef>,
    pub daily_quests: Vec<QuestTemplate>,
    pub weekly_quests: Vec<QuestTemplate>,
}

impl Catalog {
    pub fn resource(&self, id: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn location(&self, id: &str) -> Option<&LocationDef> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn tool(&self, id: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    pub fn boss(&self, id: &str) -> Option<&BossDef> {
        self.bosses.iter().find(|b| b.id == id)
    }

    pub fn recipe(&self, id: &str) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn quest_templates(&self, period: QuestPeriod) -> &[QuestTemplate] {
        match period {
            QuestPeriod::Daily => &self.daily_quests,
            QuestPeriod::Weekly => &self.weekly_quests,
        }
    }

    /// Ids of every timed effect some recipe can produce.
    pub fn effect_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.recipes
            .iter()
            .filter_map(|r| match &r.output {
                RecipeOutput::Consumable { effect_id, .. } => Some(effect_id.as_str()),
                _ => None,
            })
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Key item lookup: returns (item id, targeted boss id, lifetime).
    pub fn key_item(&self, item_id: &str) -> Option<(&str, &str, Option<u32>)> {
        self.recipes.iter().find_map(|r| match &r.output {
            RecipeOutput::Key {
                item_id: id,
                boss_id,
                lifetime_hours,
            } if id == item_id => Some((id.as_str(), boss_id.as_str(), *lifetime_hours)),
            _ => None,
        })
    }

    pub fn item_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.recipes
            .iter()
            .filter_map(|r| match &r.output {
                RecipeOutput::Key { item_id, .. } => Some(item_id.as_str()),
                _ => None,
            })
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Highest location level requirement; the "explorer" achievement target.
    pub fn max_location_level(&self) -> u32 {
        self.locations.iter().map(|l| l.min_level).max().unwrap_or(1)
    }

    /// Check cross references and numeric ranges.
    pub fn validate(&self) -> Result<(), GameError> {
        let known = |id: &str| self.resource(id).is_some();
        let bad = |msg: String| Err(GameError::Catalog(msg));

        if self.location(&self.starting_location).is_none() {
            return bad(format!("starting location {} missing", self.starting_location));
        }
        if self.tool(&self.starting_tool).is_none() {
            return bad(format!("starting tool {} missing", self.starting_tool));
        }
        for loc in &self.locations {
            let mut total = 0.0;
            for drop in &loc.drops {
                if !known(&drop.resource_id) {
                    return bad(format!("{} drops unknown {}", loc.id, drop.resource_id));
                }
                if drop.min > drop.max || drop.probability < 0.0 {
                    return bad(format!("{} has invalid drop {}", loc.id, drop.resource_id));
                }
                total += drop.probability;
            }
            // some shipped tables slightly overshoot 1.0
            if total > 1.5 {
                return bad(format!("{} drop mass {} too large", loc.id, total));
            }
        }
        for tool in &self.tools {
            if let Some(res) = tool.upgrade_cost.keys().find(|r| !known(r)) {
                return bad(format!("{} upgrade needs unknown {}", tool.id, res));
            }
        }
        for boss in &self.bosses {
            if boss.health == 0 {
                return bad(format!("{} has no health", boss.id));
            }
            for range in &boss.reward_resources {
                if !known(&range.resource_id) || range.min > range.max {
                    return bad(format!("{} has invalid reward {}", boss.id, range.resource_id));
                }
            }
        }
        for recipe in &self.recipes {
            if let Some(res) = recipe.costs.keys().find(|r| !known(r)) {
                return bad(format!("{} costs unknown {}", recipe.id, res));
            }
            match &recipe.output {
                RecipeOutput::Resource { resource_id, .. } if !known(resource_id) => {
                    return bad(format!("{} yields unknown {}", recipe.id, resource_id));
                }
                RecipeOutput::Key { boss_id, .. } if self.boss(boss_id).is_none() => {
                    return bad(format!("{} targets unknown boss {}", recipe.id, boss_id));
                }
                _ => {}
            }
        }
        for template in self.daily_quests.iter().chain(&self.weekly_quests) {
            if template.goal_min == 0 || template.goal_min > template.goal_max {
                return bad(format!("quest {} has invalid goal range", template.name));
            }
        }
        Ok(())
    }

    /// The shipped game tables.
    pub fn standard() -> Self {
        Self {
            starting_location: "coal_mine".to_string(),
            starting_tool: "wooden_pickaxe".to_string(),
            resources: vec![
                resource("coal", "Coal", 5),
                resource("iron", "Iron", 10),
                resource("gold", "Gold Ore", 30),
                resource("diamond", "Diamond", 100),
                resource("mithril", "Mithril", 300),
                resource("soul_shard", "Soul Shard", 500),
                resource("dragon_scale", "Dragon Scale", 1000),
                resource("magic_essence", "Magic Essence", 2000),
            ],
            locations: vec![
                location("coal_mine", "Coal Mine", "A shallow mine, plenty of coal.", 1, 0,
                    &[("coal", 0.8, 1, 3), ("iron", 0.2, 1, 1)]),
                location("iron_mine", "Iron Mine", "Veins of iron ore.", 3, 0,
                    &[("iron", 0.7, 1, 2), ("coal", 0.3, 1, 2), ("gold", 0.1, 1, 1)]),
                location("gold_mine", "Gold Vein", "A rich gold deposit.", 5, 2,
                    &[("gold", 0.6, 1, 2), ("iron", 0.3, 1, 2), ("diamond", 0.1, 1, 1)]),
                location("diamond_cave", "Diamond Cave", "Rare diamonds, dangerous footing.", 10, 3,
                    &[("diamond", 0.4, 1, 1), ("gold", 0.4, 1, 2), ("mithril", 0.2, 1, 1)]),
                location("mithril_mine", "Mithril Delvings", "Ancient delvings.", 20, 4,
                    &[("mithril", 0.5, 1, 2), ("diamond", 0.3, 1, 1), ("gold", 0.2, 1, 3)]),
            ],
            tools: vec![
                tool("wooden_pickaxe", "Wooden Pickaxe", 0, 1, 1, &[("coal", 5), ("iron", 2)]),
                tool("stone_pickaxe", "Stone Pickaxe", 100, 3, 2, &[("coal", 10), ("iron", 5), ("gold", 1)]),
                tool("iron_pickaxe", "Iron Pickaxe", 500, 5, 3, &[("coal", 20), ("iron", 10), ("gold", 3)]),
                tool("golden_pickaxe", "Golden Pickaxe", 1000, 8, 2,
                    &[("coal", 30), ("iron", 15), ("gold", 10), ("diamond", 1)]),
                tool("diamond_pickaxe", "Diamond Pickaxe", 5000, 15, 4,
                    &[("coal", 50), ("iron", 30), ("gold", 20), ("diamond", 5)]),
                tool("mithril_pickaxe", "Mithril Pickaxe", 20000, 25, 5,
                    &[("coal", 100), ("iron", 50), ("gold", 30), ("diamond", 10), ("mithril", 2)]),
            ],
            upgrades: vec![
                UpgradeDef { id: CLICK_POWER.into(), name: "Click Power".into(), base_price: 50, price_mult: 2.0 },
                UpgradeDef { id: CRIT_CHANCE.into(), name: "Crit Chance".into(), base_price: 100, price_mult: 1.5 },
            ],
            bosses: vec![
                boss("goblin_king", "Goblin King", "An old goblin king sitting on a hoard of gold.",
                    21, 4, 1000, 5000, 500, &[("soul_shard", 1, 3), ("gold", 10, 20)]),
                boss("dragon_lair", "Fire Dragon", "An ancient dragon guarding untold riches.",
                    25, 5, 5000, 20000, 2000, &[("dragon_scale", 1, 2), ("magic_essence", 2, 5)]),
                boss("lich_castle", "Archlich", "A lich gathering souls for a ritual.",
                    30, 6, 10000, 50000, 5000, &[("soul_shard", 5, 10), ("magic_essence", 3, 7)]),
            ],
            recipes: vec![
                RecipeDef {
                    id: "smelt_gold".into(),
                    name: "Smelt Gold Ore".into(),
                    costs: costs(&[("coal", 20), ("iron", 10)]),
                    output: RecipeOutput::Resource { resource_id: "gold".into(), amount: 1 },
                },
                RecipeDef {
                    id: "compress_diamond".into(),
                    name: "Compress Diamond".into(),
                    costs: costs(&[("coal", 200), ("gold", 5)]),
                    output: RecipeOutput::Resource { resource_id: "diamond".into(), amount: 1 },
                },
                RecipeDef {
                    id: "miners_brew".into(),
                    name: "Miner's Brew".into(),
                    costs: costs(&[("coal", 30), ("iron", 10)]),
                    output: RecipeOutput::Consumable {
                        effect_id: "miners_brew".into(),
                        effect: EffectKind::ExpBoost { multiplier: 1.5 },
                        duration_minutes: 30,
                    },
                },
                RecipeDef {
                    id: "sharpening_oil".into(),
                    name: "Sharpening Oil".into(),
                    costs: costs(&[("iron", 20), ("gold", 3)]),
                    output: RecipeOutput::Consumable {
                        effect_id: "sharpening_oil".into(),
                        effect: EffectKind::CritBoost { percent: 5.0 },
                        duration_minutes: 30,
                    },
                },
                RecipeDef {
                    id: "lucky_charm".into(),
                    name: "Lucky Charm".into(),
                    costs: costs(&[("gold", 5), ("diamond", 1)]),
                    output: RecipeOutput::Consumable {
                        effect_id: "lucky_charm".into(),
                        effect: EffectKind::Luck { percent: 10.0 },
                        duration_minutes: 60,
                    },
                },
                RecipeDef {
                    id: "goblin_sigil".into(),
                    name: "Goblin Sigil".into(),
                    costs: costs(&[("soul_shard", 1), ("gold", 10)]),
                    output: RecipeOutput::Key {
                        item_id: "goblin_sigil".into(),
                        boss_id: "goblin_king".into(),
                        lifetime_hours: Some(24),
                    },
                },
                RecipeDef {
                    id: "dragon_sigil".into(),
                    name: "Dragon Sigil".into(),
                    costs: costs(&[("dragon_scale", 1), ("magic_essence", 1)]),
                    output: RecipeOutput::Key {
                        item_id: "dragon_sigil".into(),
                        boss_id: "dragon_lair".into(),
                        lifetime_hours: Some(24),
                    },
                },
                RecipeDef {
                    id: "lich_sigil".into(),
                    name: "Lich Sigil".into(),
                    costs: costs(&[("soul_shard", 5), ("magic_essence", 2)]),
                    output: RecipeOutput::Key {
                        item_id: "lich_sigil".into(),
                        boss_id: "lich_castle".into(),
                        lifetime_hours: None,
                    },
                },
                RecipeDef {
                    id: "tempered_handle".into(),
                    name: "Tempered Handle".into(),
                    costs: costs(&[("mithril", 5), ("diamond", 5)]),
                    output: RecipeOutput::Permanent { modifier: PermanentModifier::ToolPower, amount: 1 },
                },
                RecipeDef {
                    id: "focus_crystal".into(),
                    name: "Focus Crystal".into(),
                    costs: costs(&[("diamond", 10), ("magic_essence", 1)]),
                    output: RecipeOutput::Permanent { modifier: PermanentModifier::CritChance, amount: 1 },
                },
            ],
            daily_quests: vec![
                quest("Clicks Worker", "Mine {} times", 50, 80, 70, 20),
                quest("Gold Seeker", "Earn {} gold", 100, 500, 100, 30),
                quest("Upgrade Shopper", "Spend {} gold on upgrades", 150, 300, 80, 25),
                quest("Crits Lucky Hand", "Land {} critical hits", 3, 8, 70, 40),
                quest("Ore Digger", "Dig up {} resources", 5, 15, 60, 35),
                quest("Market Seller", "Sell resources for {} gold", 200, 500, 90, 45),
                quest("Clicks Shock Worker", "Mine {} times", 80, 120, 90, 30),
                quest("Gold Vein", "Earn {} gold", 500, 1000, 150, 50),
                quest("Upgrade Spender", "Spend {} gold on upgrades", 300, 600, 120, 40),
                quest("Crits Fortune", "Land {} critical hits", 8, 15, 100, 60),
                quest("Ore Miner", "Dig up {} resources", 15, 30, 90, 45),
                quest("Market Magnate", "Sell resources for {} gold", 500, 1000, 150, 70),
            ],
            weekly_quests: vec![
                quest("Clicks Week", "Mine {} times", 400, 800, 500, 200),
                quest("Gold Fever", "Earn {} gold", 2000, 5000, 1000, 500),
                quest("Upgrade Tycoon", "Spend {} gold on upgrades", 1500, 3000, 800, 400),
                quest("Crits Storm", "Land {} critical hits", 20, 50, 600, 300),
                quest("Ore Collector", "Dig up {} resources", 50, 150, 700, 350),
                quest("Market Trader", "Sell resources for {} gold", 2000, 5000, 900, 450),
                quest("Clicks Marathon", "Mine {} times", 800, 1300, 1000, 400),
                quest("Gold Rain", "Earn {} gold", 5000, 10000, 2000, 1000),
                quest("Upgrade Oligarch", "Spend {} gold on upgrades", 3000, 6000, 1500, 800),
                quest("Crits Master", "Land {} critical hits", 50, 100, 1200, 600),
                quest("Ore Hoarder", "Dig up {} resources", 150, 300, 1400, 700),
                quest("Market Speculator", "Sell resources for {} gold", 5000, 10000, 1800, 900),
            ],
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn resource(id: &str, name: &str, base_price: u64) -> ResourceDef {
    ResourceDef { id: id.into(), name: name.into(), base_price }
}

fn location(
    id: &str,
    name: &str,
    description: &str,
    min_level: u32,
    min_tool_level: u32,
    drops: &[(&str, f64, u64, u64)],
) -> LocationDef {
    LocationDef {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        min_level,
        min_tool_level,
        drops: drops
            .iter()
            .map(|(res, p, min, max)| DropEntry {
                resource_id: res.to_string(),
                probability: *p,
                min: *min,
                max: *max,
            })
            .collect(),
    }
}

fn costs(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(r, a)| (r.to_string(), *a)).collect()
}

fn tool(id: &str, name: &str, price: u64, required_level: u32, base_power: u32, cost: &[(&str, u64)]) -> ToolDef {
    ToolDef {
        id: id.into(),
        name: name.into(),
        price,
        required_level,
        base_power,
        upgrade_cost: costs(cost),
    }
}

#[allow(clippy::too_many_arguments)]
fn boss(
    id: &str,
    name: &str,
    description: &str,
    min_level: u32,
    min_tool_level: u32,
    health: u64,
    reward_gold: u64,
    reward_exp: u64,
    rewards: &[(&str, u64, u64)],
) -> BossDef {
    BossDef {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        min_level,
        min_tool_level,
        health,
        reward_gold,
        reward_exp,
        reward_resources: rewards
            .iter()
            .map(|(res, min, max)| ResourceRange {
                resource_id: res.to_string(),
                min: *min,
                max: *max,
            })
            .collect(),
    }
}

fn quest(name: &str, description: &str, goal_min: u64, goal_max: u64, reward_gold: u64, reward_exp: u64) -> QuestTemplate {
    QuestTemplate {
        name: name.into(),
        description: description.into(),
        goal_min,
        goal_max,
        reward_gold,
        reward_exp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        Catalog::standard().validate().expect("standard tables validate");
    }

    #[test]
    fn upgrade_price_grows_geometrically() {
        let catalog = Catalog::standard();
        let click = catalog.upgrade(CLICK_POWER).unwrap();
        assert_eq!(click.price_at(0), 50);
        assert_eq!(click.price_at(3), 400);
        let crit = catalog.upgrade(CRIT_CHANCE).unwrap();
        assert_eq!(crit.price_at(2), 225);
    }

    #[test]
    fn tool_upgrade_cost_scales_with_level() {
        let catalog = Catalog::standard();
        let cost = catalog.tool("stone_pickaxe").unwrap().upgrade_cost_at(3);
        assert_eq!(cost.get("coal"), Some(&30));
        assert_eq!(cost.get("gold"), Some(&3));
    }

    #[test]
    fn key_items_resolve_to_their_boss() {
        let catalog = Catalog::standard();
        let (item, boss, lifetime) = catalog.key_item("goblin_sigil").unwrap();
        assert_eq!(item, "goblin_sigil");
        assert_eq!(boss, "goblin_king");
        assert_eq!(lifetime, Some(24));
        assert!(catalog.key_item("miners_brew").is_none());
    }

    #[test]
    fn validate_rejects_unknown_drop() {
        let mut catalog = Catalog::standard();
        catalog.locations[0].drops.push(DropEntry {
            resource_id: "unobtainium".into(),
            probability: 0.0,
            min: 1,
            max: 1,
        });
        assert!(matches!(catalog.validate(), Err(GameError::Catalog(_))));
    }
}
