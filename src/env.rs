use std::path::PathBuf;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::bridge::{Action, Button, EmulatorBridge};
use crate::episode::{nickname_script, objective_for, Phase, CAPTURE_COOKIES};
use crate::events::{diff, Event, SessionState};
use crate::guardian::{Guardian, RuleConfig, Ruling, Verdict};
use crate::reward::{score, RewardBreakdown, RewardConfig};
use crate::savestate::milestone_path;
use crate::snapshot::{decode, ram, species_label, Snapshot};
use crate::telemetry::{LogBuffer, PartyStatus, StatusSnapshot, TelemetrySink, LOG_CAPACITY};
use crate::{Observation, OBS_DIM};

// =============================================================================
// Environment Constants
// =============================================================================

pub struct EnvConfig {
    /// Frames the resolved button is held each step.
    pub hold_frames: u32,
    /// Frames with input released after the hold.
    pub cooldown_frames: u32,
    pub states_dir: PathBuf,
    /// Start-of-run save state reloaded after a party wipe.
    pub canonical_state: PathBuf,
    /// Write a named save state when a key item is acquired.
    pub milestone_saves: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            hold_frames: 24,
            cooldown_frames: 5,
            states_dir: PathBuf::from("states"),
            canonical_state: PathBuf::from("states/outside.state"),
            milestone_saves: true,
        }
    }
}

// =============================================================================
// Step contract
// =============================================================================

#[derive(Debug, Clone)]
pub struct StepInfo {
    pub events: Vec<Event>,
    pub intervened: bool,
    pub reason: Option<&'static str>,
    /// Phase the step executed in. Nicknaming means the agent's action was
    /// swallowed by the scripted sequence.
    pub phase: Phase,
}

pub struct StepResult {
    pub obs: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

// =============================================================================
// Nuzlocke Environment
// =============================================================================

/// The step loop: guardian review, input hold and cooldown, snapshot decode,
/// event diff, reward fold, lifecycle, telemetry. Single-threaded and
/// step-driven; frame advances are the only blocking points.
pub struct NuzlockeEnv<B: EmulatorBridge> {
    bridge: B,
    session: SessionState,
    guardian: Guardian,
    rules: RuleConfig,
    rewards: RewardConfig,
    config: EnvConfig,
    phase: Phase,
    logs: LogBuffer,
    sink: Box<dyn TelemetrySink>,
    rng: SmallRng,
    pub total_reward: f64,
    debug_state: bool,
    reward_debug: bool,
    breakdown: RewardBreakdown,
}

impl<B: EmulatorBridge> NuzlockeEnv<B> {
    pub fn new(
        bridge: B,
        rules: RuleConfig,
        rewards: RewardConfig,
        config: EnvConfig,
        sink: Box<dyn TelemetrySink>,
    ) -> Self {
        let mut guardian = Guardian::new(&rules);
        let mut logs = LogBuffer::new(LOG_CAPACITY);
        if let Some(warning) = guardian.take_warning() {
            tracing::warn!("{warning}");
            logs.push(warning);
        }
        let session = SessionState::new(rules.level_cap_start);
        Self {
            bridge,
            session,
            guardian,
            rules,
            rewards,
            config,
            phase: Phase::Active,
            logs,
            sink,
            rng: SmallRng::from_os_rng(),
            total_reward: 0.0,
            debug_state: debug_env_enabled("NUZ_DEBUG_STATE"),
            reward_debug: debug_env_enabled("NUZ_DEBUG_REWARD"),
            breakdown: RewardBreakdown::default(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn reward_breakdown(&self) -> RewardBreakdown {
        self.breakdown
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.logs.iter()
    }

    /// Stamp a policy refresh into the status stream. Pure bookkeeping for
    /// the dashboard.
    pub fn note_policy_update(&mut self) {
        self.session.last_policy_update = self.session.total_steps;
        self.logs
            .push(format!("{}: POLICY REFRESHED", self.session.total_steps));
    }

    /// Start (or restart) from the canonical save state. A missing state file
    /// means a fresh start: logged, not fatal. Per-slot history is cleared;
    /// economy counters persist.
    pub fn reset(&mut self) -> Result<Observation> {
        self.bridge.release_all();
        let canonical = self.config.canonical_state.clone();
        if canonical.exists() {
            self.bridge.load_state(&canonical)?;
        } else {
            self.logs.push("no prior state, fresh start".to_string());
        }
        self.phase = Phase::Active;
        self.session.reset_slot_history();
        Ok(self.observe_and_seed())
    }

    /// Resume from the newest save state in the states directory, falling
    /// back to a fresh start when none exists.
    pub fn resume(&mut self) -> Result<Observation> {
        self.bridge.release_all();
        match crate::savestate::latest_state(&self.config.states_dir)? {
            Some(path) => {
                self.bridge.load_state(&path)?;
                self.logs.push(format!("resumed from {}", path.display()));
            }
            None => self.logs.push("no prior state, fresh start".to_string()),
        }
        self.phase = Phase::Active;
        self.session.reset_slot_history();
        Ok(self.observe_and_seed())
    }

    fn observe_and_seed(&mut self) -> Observation {
        let snap = decode(&self.bridge);
        diff(
            None,
            &snap,
            &mut self.session,
            &self.rules.key_items,
            self.rules.level_cap_per_badge,
        );
        let obs = observation(&snap);
        self.session.last_snapshot = Some(snap);
        obs
    }

    pub fn step(&mut self, action: Action) -> Result<StepResult> {
        self.session.total_steps += 1;
        let step_phase = self.phase;

        let verdict = if self.phase == Phase::Nicknaming {
            // The scripted sequence consumes this step; the agent's action is
            // dropped, not forwarded.
            self.run_nickname_script()?;
            self.session.cookies += CAPTURE_COOKIES;
            self.session.note_positive();
            self.phase = Phase::Active;
            Verdict {
                action,
                ruling: Ruling::Pass,
                reason: None,
            }
        } else {
            let verdict = match &self.session.last_snapshot {
                Some(snap) => self.guardian.resolve(
                    action,
                    snap,
                    &self.session.caught_species,
                    &self.session.caught_locations,
                ),
                // No prior observation to review against.
                None => Verdict {
                    action,
                    ruling: Ruling::Pass,
                    reason: None,
                },
            };
            self.press(verdict.action.button())?;
            verdict
        };

        let curr = decode(&self.bridge);
        if self.debug_state {
            self.log_state(&curr);
        }

        let prev = self.session.last_snapshot.take();
        let outcome = diff(
            prev.as_ref(),
            &curr,
            &mut self.session,
            &self.rules.key_items,
            self.rules.level_cap_per_badge,
        );

        // Debounce: reset the sampled effectiveness byte so the same value
        // cannot re-trigger next step.
        if outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::SuperEffective | Event::NotVeryEffective))
        {
            self.bridge
                .poke(ram::TYPE_EFFECTIVENESS, ram::EFFECTIVENESS_NEUTRAL);
        }

        let mut lines = Vec::new();
        if step_phase == Phase::Nicknaming {
            lines.push(format!("{}: NAMING DONE", self.session.total_steps));
        }
        for event in &outcome.events {
            lines.push(describe_event(event, &curr));
        }
        if verdict.intervened() {
            if let Some(reason) = verdict.reason {
                lines.push(format!("GUARDIAN: {reason}"));
            }
        }

        let reward = score(
            &outcome.events,
            &verdict,
            &mut self.session,
            &self.rewards,
            self.reward_debug.then_some(&mut self.breakdown),
        );
        self.total_reward += reward;
        if self.reward_debug {
            eprintln!(
                "[reward] step={} r={reward:+.2} total={:+.2} events={:?}",
                self.session.total_steps, self.total_reward, outcome.events
            );
        }

        let terminated = outcome.events.contains(&Event::PartyWiped);
        if terminated {
            self.phase = Phase::Reloading;
            self.reload_canonical()?;
            lines.push("PARTY WIPED - timeline restarted".to_string());
            self.phase = Phase::Active;
        } else {
            if outcome.roster_grew {
                self.phase = Phase::Nicknaming;
                lines.push(format!("{}: NAMING...", self.session.total_steps));
            }
            if outcome
                .events
                .iter()
                .any(|e| matches!(e, Event::KeyItemFound(_)))
            {
                self.save_milestone(&curr);
            }
            self.session.last_snapshot = Some(curr.clone());
        }

        let status = self.status(&curr);
        for line in &lines {
            self.logs.push(line.clone());
        }
        self.sink.emit(&status, lines.last().map(String::as_str));

        Ok(StepResult {
            obs: observation(&curr),
            reward,
            terminated,
            truncated: false,
            info: StepInfo {
                events: outcome.events,
                intervened: verdict.intervened(),
                reason: verdict.reason,
                phase: step_phase,
            },
        })
    }

    /// Derived dashboard view. Recomputed fresh, holds no authority.
    pub fn status(&self, snap: &Snapshot) -> StatusSnapshot {
        StatusSnapshot {
            steps: self.session.total_steps,
            total_reward: self.total_reward,
            cookies: self.session.cookies,
            bonks: self.session.bonks,
            objective: objective_for(snap.badge_count()),
            badge_count: snap.badge_count(),
            level_cap: self.session.level_cap,
            map_id: snap.map_id,
            x: snap.x,
            y: snap.y,
            phase: self.phase.as_str(),
            party: snap
                .party
                .iter()
                .map(|m| PartyStatus {
                    name: m.nickname.clone(),
                    type_label: species_label(m.species_id),
                    level: m.level,
                    hp: m.hp,
                    max_hp: m.max_hp,
                })
                .collect(),
            graveyard: self.session.graveyard.iter().cloned().collect(),
            last_policy_update: self.session.last_policy_update,
        }
    }

    fn press(&mut self, button: Button) -> Result<()> {
        self.press_for(button, self.config.hold_frames)
    }

    fn press_for(&mut self, button: Button, hold: u32) -> Result<()> {
        self.bridge.set_button(button, true);
        for _ in 0..hold {
            self.bridge.clock_frame()?;
        }
        self.bridge.set_button(button, false);
        for _ in 0..self.config.cooldown_frames {
            self.bridge.clock_frame()?;
        }
        Ok(())
    }

    fn run_nickname_script(&mut self) -> Result<()> {
        for (button, hold) in nickname_script(&mut self.rng) {
            self.press_for(button, hold)?;
        }
        Ok(())
    }

    fn reload_canonical(&mut self) -> Result<()> {
        self.bridge.release_all();
        let canonical = self.config.canonical_state.clone();
        if canonical.exists() {
            self.bridge.load_state(&canonical)?;
        } else {
            self.logs
                .push("no canonical state to reload, continuing in place".to_string());
        }
        // Stale comparisons must not fire against the reloaded roster.
        self.session.reset_slot_history();
        Ok(())
    }

    fn save_milestone(&mut self, snap: &Snapshot) {
        if !self.config.milestone_saves {
            return;
        }
        let path = milestone_path(&self.config.states_dir, objective_for(snap.badge_count()));
        match self.bridge.save_state(&path) {
            Ok(()) => self
                .logs
                .push(format!("💾 milestone saved: {}", path.display())),
            Err(err) => self.logs.push(format!("milestone save failed: {err}")),
        }
    }

    fn log_state(&self, snap: &Snapshot) {
        eprintln!(
            "[state] step={step} phase={phase:?} map={map} pos=({x},{y}) party={party} badges={badges:08b} battle={battle}",
            step = self.session.total_steps,
            phase = self.phase,
            map = snap.map_id,
            x = snap.x,
            y = snap.y,
            party = snap.party.len(),
            badges = snap.badge_mask,
            battle = snap.in_battle,
        );
    }
}

fn debug_env_enabled(var: &str) -> bool {
    match std::env::var(var) {
        Ok(val) => matches!(val.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
        Err(_) => false,
    }
}

fn describe_event(event: &Event, snap: &Snapshot) -> String {
    let name = |slot: usize| {
        snap.party
            .get(slot)
            .map(|m| m.nickname.as_str())
            .unwrap_or("?")
    };
    match event {
        Event::LeveledUp(slot) => {
            let lvl = snap.party.get(*slot).map(|m| m.level).unwrap_or(0);
            format!("🍪 {} -> L{lvl}!", name(*slot))
        }
        Event::Evolved(slot) => format!("{} evolved!", name(*slot)),
        Event::Fainted(slot) => format!("{} fainted", name(*slot)),
        Event::Caught(species) => format!("caught species {species}"),
        Event::RouteCleared(map) => format!("route {map} cleared"),
        Event::BadgeEarned => "🏆 BADGE EARNED".to_string(),
        Event::KeyItemFound(id) => format!("key item {id} found"),
        Event::HpRestoredInBattle => "illegal heal in battle".to_string(),
        Event::SuperEffective => "super effective!".to_string(),
        Event::NotVeryEffective => "not very effective...".to_string(),
        Event::HpLost => "took a hit".to_string(),
        Event::PartyWiped => "party wiped".to_string(),
    }
}

/// Fixed-length numeric observation: party count, per-slot HP fractions,
/// per-slot level fractions, badge count, battle flag, map id.
pub fn observation(snap: &Snapshot) -> Observation {
    let mut f = [0f32; OBS_DIM];
    f[0] = snap.party.len() as f32 / 6.0;
    for i in 0..6 {
        if let Some(m) = snap.party.get(i) {
            if m.max_hp > 0 {
                f[1 + i] = m.hp as f32 / m.max_hp as f32;
            }
            f[7 + i] = m.level as f32 / 100.0;
        }
    }
    f[13] = snap.badge_count() as f32 / 8.0;
    f[14] = if snap.in_battle { 1.0 } else { 0.0 };
    f[15] = snap.map_id as f32 / 255.0;
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PartyMember;

    #[test]
    fn observation_is_normalized() {
        let snap = Snapshot {
            party: vec![PartyMember {
                species_id: 176,
                nickname: "REX".to_string(),
                level: 50,
                hp: 10,
                max_hp: 20,
            }],
            badge_mask: 0b0000_1111,
            in_battle: true,
            map_id: 255,
            ..Default::default()
        };
        let f = observation(&snap);
        assert!((f[0] - 1.0 / 6.0).abs() < 1e-6);
        assert!((f[1] - 0.5).abs() < 1e-6);
        assert!((f[7] - 0.5).abs() < 1e-6);
        assert!((f[13] - 0.5).abs() < 1e-6);
        assert_eq!(f[14], 1.0);
        assert_eq!(f[15], 1.0);
    }

    #[test]
    fn observation_handles_empty_party() {
        let f = observation(&Snapshot::default());
        assert_eq!(f, [0f32; OBS_DIM]);
    }
}
