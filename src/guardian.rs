use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bridge::Action;
use crate::snapshot::{ram, species_family, Snapshot};

// =============================================================================
// Rule Configuration
// =============================================================================

/// Rule-set selection plus the knobs the variants share. Loaded from JSON or
/// built from defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Variant name: "hardcore" (reference) or "casual". Unknown names
    /// deactivate arbitration with a logged warning; the run is not aborted.
    pub variant: String,
    /// Species barred from capture (legendary / story-locked), internal ids.
    pub banned_species: Vec<u8>,
    /// Inventory ids that count as objective key items.
    pub key_items: Vec<u8>,
    pub level_cap_start: u8,
    pub level_cap_per_badge: u8,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            variant: "hardcore".to_string(),
            // Articuno, Zapdos, Moltres, Mewtwo, Mew
            banned_species: vec![74, 75, 73, 131, 21],
            // Oak's Parcel
            key_items: vec![70],
            level_cap_start: 15,
            level_cap_per_badge: 10,
        }
    }
}

impl RuleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open rule config: {}", path.display()))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse rule config")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVariant {
    /// Full nuzlocke arbitration: trainer-item rule plus capture legality.
    Hardcore,
    /// Trainer-item rule only; captures are never second-guessed.
    Casual,
    /// Arbitration disabled: every action passes through unmodified. The
    /// state an unknown variant name selects.
    Inactive,
}

impl RuleVariant {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "hardcore" => Some(Self::Hardcore),
            "casual" => Some(Self::Casual),
            _ => None,
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruling {
    /// Action forwarded unmodified; nothing reward-relevant happened.
    Pass,
    /// A legitimate capture attempt was allowed through.
    CaptureAllowed,
    /// Item use against a trainer, substituted with cancel. Hard rule.
    TrainerItemBlocked,
    /// Capture attempt on a banned/duplicate/cleared target, silently
    /// substituted with cancel.
    IllegalCaptureBlocked,
}

#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    pub action: Action,
    pub ruling: Ruling,
    pub reason: Option<&'static str>,
}

impl Verdict {
    fn pass(action: Action) -> Self {
        Self {
            action,
            ruling: Ruling::Pass,
            reason: None,
        }
    }

    pub fn intervened(&self) -> bool {
        matches!(
            self.ruling,
            Ruling::TrainerItemBlocked | Ruling::IllegalCaptureBlocked
        )
    }
}

// =============================================================================
// Guardian
// =============================================================================

/// Reviews the agent's proposed action against the current snapshot and may
/// substitute a different one. Never mutates session state; capture
/// bookkeeping is passed in as read-only views and the decision is scored by
/// the reward engine.
pub struct Guardian {
    variant: RuleVariant,
    banned: HashSet<u8>,
    warning: Option<String>,
}

impl Guardian {
    pub fn new(config: &RuleConfig) -> Self {
        let (variant, warning) = match RuleVariant::from_name(&config.variant) {
            Some(v) => (v, None),
            None => (
                RuleVariant::Inactive,
                Some(format!(
                    "unknown rule variant '{}', arbitration disabled",
                    config.variant
                )),
            ),
        };
        Self {
            variant,
            banned: config.banned_species.iter().copied().collect(),
            warning,
        }
    }

    pub fn variant(&self) -> RuleVariant {
        self.variant
    }

    /// One-shot misconfiguration warning for the telemetry stream.
    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    pub fn resolve(
        &self,
        proposed: Action,
        snap: &Snapshot,
        caught_species: &HashSet<u8>,
        caught_locations: &HashSet<u8>,
    ) -> Verdict {
        if self.variant == RuleVariant::Inactive {
            return Verdict::pass(proposed);
        }

        // Only the confirm press on the battle menu's item slot is reviewed.
        if !snap.in_battle
            || proposed != Action::A
            || snap.battle_menu != ram::BATTLE_MENU_ITEM_SLOT
        {
            return Verdict::pass(proposed);
        }

        // Trainer rule dominates capture eligibility, always.
        if snap.is_trainer_battle {
            return Verdict {
                action: Action::B,
                ruling: Ruling::TrainerItemBlocked,
                reason: Some("items forbidden vs. trainer"),
            };
        }

        if self.variant == RuleVariant::Casual {
            return Verdict {
                action: proposed,
                ruling: Ruling::CaptureAllowed,
                reason: None,
            };
        }

        let family = species_family(snap.opponent_species);
        let illegal = caught_species.contains(&family)
            || caught_locations.contains(&snap.map_id)
            || self.banned.contains(&snap.opponent_species);
        if illegal {
            return Verdict {
                action: Action::B,
                ruling: Ruling::IllegalCaptureBlocked,
                reason: Some("illegal capture target"),
            };
        }

        Verdict {
            action: proposed,
            ruling: Ruling::CaptureAllowed,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battle_snapshot(trainer: bool) -> Snapshot {
        Snapshot {
            in_battle: true,
            is_trainer_battle: trainer,
            battle_menu: ram::BATTLE_MENU_ITEM_SLOT,
            opponent_species: 36,
            map_id: 12,
            ..Default::default()
        }
    }

    fn guardian() -> Guardian {
        Guardian::new(&RuleConfig::default())
    }

    #[test]
    fn non_item_actions_pass_through() {
        let g = guardian();
        let snap = battle_snapshot(false);
        let caught = HashSet::new();
        let cleared = HashSet::new();
        for action in [Action::Up, Action::B, Action::Start] {
            let v = g.resolve(action, &snap, &caught, &cleared);
            assert_eq!(v.ruling, Ruling::Pass);
            assert_eq!(v.action, action);
        }
    }

    #[test]
    fn item_confirm_outside_battle_passes() {
        let g = guardian();
        let mut snap = battle_snapshot(false);
        snap.in_battle = false;
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::Pass);
    }

    #[test]
    fn trainer_rule_dominates_capture_eligibility() {
        let g = guardian();
        let snap = battle_snapshot(true);
        // Even with a fully legal capture target the trainer rule wins.
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::TrainerItemBlocked);
        assert_eq!(v.action, Action::B);
        assert!(v.intervened());
    }

    #[test]
    fn legal_capture_allowed_through() {
        let g = guardian();
        let snap = battle_snapshot(false);
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::CaptureAllowed);
        assert_eq!(v.action, Action::A);
        assert!(!v.intervened());
    }

    #[test]
    fn caught_family_gates_capture() {
        let g = guardian();
        let mut snap = battle_snapshot(false);
        // Pidgeot's family collapses to Pidgey.
        snap.opponent_species = 151;
        let caught: HashSet<u8> = [36].into_iter().collect();
        let v = g.resolve(Action::A, &snap, &caught, &HashSet::new());
        assert_eq!(v.ruling, Ruling::IllegalCaptureBlocked);
        assert_eq!(v.action, Action::B);
    }

    #[test]
    fn cleared_route_gates_capture() {
        let g = guardian();
        let snap = battle_snapshot(false);
        let cleared: HashSet<u8> = [12].into_iter().collect();
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &cleared);
        assert_eq!(v.ruling, Ruling::IllegalCaptureBlocked);
    }

    #[test]
    fn banned_species_gates_capture() {
        let g = guardian();
        let mut snap = battle_snapshot(false);
        snap.opponent_species = 131; // Mewtwo
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::IllegalCaptureBlocked);
    }

    #[test]
    fn casual_variant_skips_capture_rules() {
        let mut cfg = RuleConfig::default();
        cfg.variant = "casual".to_string();
        let g = Guardian::new(&cfg);
        let mut snap = battle_snapshot(false);
        snap.opponent_species = 131;
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::CaptureAllowed);
        // Trainer rule still applies in casual.
        let snap = battle_snapshot(true);
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::TrainerItemBlocked);
    }

    #[test]
    fn unknown_variant_deactivates_with_warning() {
        let mut cfg = RuleConfig::default();
        cfg.variant = "speedrun".to_string();
        let mut g = Guardian::new(&cfg);
        assert_eq!(g.variant(), RuleVariant::Inactive);
        assert!(g.take_warning().is_some());
        assert!(g.take_warning().is_none());
    }

    #[test]
    fn inactive_variant_passes_everything_through() {
        let mut cfg = RuleConfig::default();
        cfg.variant = "speedrun".to_string();
        let g = Guardian::new(&cfg);
        // Item confirm against a banned species, normally a hard block.
        let mut snap = battle_snapshot(false);
        snap.opponent_species = 131;
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::Pass);
        assert_eq!(v.action, Action::A);
        // Trainer rule is off too.
        let snap = battle_snapshot(true);
        let v = g.resolve(Action::A, &snap, &HashSet::new(), &HashSet::new());
        assert_eq!(v.ruling, Ruling::Pass);
        assert_eq!(v.action, Action::A);
    }
}
