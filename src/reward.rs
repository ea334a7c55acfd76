use crate::events::{Event, SessionState};
use crate::guardian::{Ruling, Verdict};

// =============================================================================
// Reward Tuning Knobs
// =============================================================================

/// Additive reward table. Every weight is overridable; the defaults are the
/// reference magnitudes.
#[derive(Debug, Clone)]
pub struct RewardConfig {
    /// Existence tax, applied every step.
    pub step_cost: f64,
    pub trainer_item_penalty: f64,
    /// Silent correction: trying something unsporting costs nothing.
    pub illegal_capture_penalty: f64,
    pub capture_attempt_bonus: f64,
    pub illegal_heal_penalty: f64,
    pub super_effective_bonus: f64,
    pub not_very_effective_penalty: f64,
    pub badge_bonus: f64,
    pub key_item_bonus: f64,
    /// Economy-only by default; raise for direct level-up shaping.
    pub level_up_bonus: f64,
    pub evolution_bonus: f64,
    pub idle_penalty: f64,
    pub party_wipe_penalty: f64,
    /// Steps without a positive event before hunger kicks in.
    pub hunger_threshold: u64,
    /// Hunger is only checked on step counts that are multiples of this.
    pub idle_check_interval: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            step_cost: -0.1,
            trainer_item_penalty: -10.0,
            illegal_capture_penalty: 0.0,
            capture_attempt_bonus: 5.0,
            illegal_heal_penalty: -50.0,
            super_effective_bonus: 20.0,
            not_very_effective_penalty: -20.0,
            badge_bonus: 2000.0,
            key_item_bonus: 1000.0,
            level_up_bonus: 0.0,
            evolution_bonus: 500.0,
            idle_penalty: -5.0,
            party_wipe_penalty: -100.0,
            hunger_threshold: 1000,
            idle_check_interval: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewardBreakdown {
    pub base: f64,
    pub guardian: f64,
    pub capture: f64,
    pub heal: f64,
    pub effectiveness: f64,
    pub badge: f64,
    pub key_item: f64,
    pub level: f64,
    pub evolution: f64,
    pub idle: f64,
    pub wipe: f64,
}

// =============================================================================
// Scoring
// =============================================================================

/// Folds detected events and the guardian verdict into a scalar, maintaining
/// the session economy (cookies, bonks, hunger timer) along the way. Purely
/// additive; the components are independent.
pub fn score(
    events: &[Event],
    verdict: &Verdict,
    session: &mut SessionState,
    cfg: &RewardConfig,
    mut breakdown: Option<&mut RewardBreakdown>,
) -> f64 {
    let mut reward = cfg.step_cost;
    if let Some(b) = breakdown.as_deref_mut() {
        b.base += cfg.step_cost;
    }

    match verdict.ruling {
        Ruling::Pass => {}
        Ruling::TrainerItemBlocked => {
            reward += cfg.trainer_item_penalty;
            session.bonks += 1;
            if let Some(b) = breakdown.as_deref_mut() {
                b.guardian += cfg.trainer_item_penalty;
            }
        }
        Ruling::IllegalCaptureBlocked => {
            reward += cfg.illegal_capture_penalty;
            if let Some(b) = breakdown.as_deref_mut() {
                b.guardian += cfg.illegal_capture_penalty;
            }
        }
        Ruling::CaptureAllowed => {
            reward += cfg.capture_attempt_bonus;
            if let Some(b) = breakdown.as_deref_mut() {
                b.capture += cfg.capture_attempt_bonus;
            }
        }
    }

    for event in events {
        let mut add = |amount: f64, slot: fn(&mut RewardBreakdown) -> &mut f64| {
            reward += amount;
            if let Some(b) = breakdown.as_deref_mut() {
                *slot(b) += amount;
            }
        };
        match event {
            Event::LeveledUp(_) => {
                add(cfg.level_up_bonus, |b| &mut b.level);
                session.cookies += 1;
                session.note_positive();
            }
            Event::Evolved(_) => {
                add(cfg.evolution_bonus, |b| &mut b.evolution);
                session.cookies += 5;
                session.note_positive();
            }
            Event::BadgeEarned => {
                add(cfg.badge_bonus, |b| &mut b.badge);
                session.cookies += 1;
                session.note_positive();
            }
            Event::KeyItemFound(_) => {
                add(cfg.key_item_bonus, |b| &mut b.key_item);
                session.cookies += 1;
                session.note_positive();
            }
            Event::SuperEffective => {
                add(cfg.super_effective_bonus, |b| &mut b.effectiveness);
            }
            Event::NotVeryEffective => {
                add(cfg.not_very_effective_penalty, |b| &mut b.effectiveness);
            }
            Event::HpRestoredInBattle => {
                add(cfg.illegal_heal_penalty, |b| &mut b.heal);
            }
            Event::PartyWiped => {
                add(cfg.party_wipe_penalty, |b| &mut b.wipe);
            }
            Event::HpLost => {
                session.bonks += 1;
            }
            // Capture bookkeeping is rewarded at attempt time; completion
            // cookies come with the nicknaming sequence.
            Event::Fainted(_) | Event::Caught(_) | Event::RouteCleared(_) => {}
        }
    }

    // Hunger: only on the check cadence, and only once starving.
    let starving =
        session.total_steps.saturating_sub(session.last_positive_step) > cfg.hunger_threshold;
    if starving && session.total_steps % cfg.idle_check_interval == 0 {
        reward += cfg.idle_penalty;
        session.bonks += 1;
        if let Some(b) = breakdown.as_deref_mut() {
            b.idle += cfg.idle_penalty;
        }
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Action;

    fn pass_verdict() -> Verdict {
        Verdict {
            action: Action::Up,
            ruling: Ruling::Pass,
            reason: None,
        }
    }

    fn verdict(ruling: Ruling) -> Verdict {
        Verdict {
            action: Action::A,
            ruling,
            reason: None,
        }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    fn session() -> SessionState {
        let mut s = SessionState::new(15);
        s.total_steps = 1;
        s.last_positive_step = 1;
        s
    }

    #[test]
    fn empty_step_costs_exactly_base() {
        let mut s = session();
        let r = score(&[], &pass_verdict(), &mut s, &RewardConfig::default(), None);
        assert_eq!(r, -0.1);
        assert_eq!(s.cookies, 0);
        assert_eq!(s.bonks, 0);
    }

    #[test]
    fn trainer_block_penalized_and_bonked() {
        let mut s = session();
        let r = score(
            &[],
            &verdict(Ruling::TrainerItemBlocked),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        approx(r, -10.1);
        assert_eq!(s.bonks, 1);
    }

    #[test]
    fn illegal_capture_block_is_silent() {
        let mut s = session();
        let r = score(
            &[],
            &verdict(Ruling::IllegalCaptureBlocked),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        assert_eq!(r, -0.1);
        assert_eq!(s.bonks, 0);
    }

    #[test]
    fn legal_capture_attempt_pays() {
        let mut s = session();
        let r = score(
            &[],
            &verdict(Ruling::CaptureAllowed),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        approx(r, 4.9);
    }

    #[test]
    fn badge_pays_and_feeds_economy() {
        let mut s = session();
        s.total_steps = 50;
        let r = score(
            &[Event::BadgeEarned],
            &pass_verdict(),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        approx(r, 1999.9);
        assert_eq!(s.cookies, 1);
        assert_eq!(s.last_positive_step, 50);
    }

    #[test]
    fn level_up_is_economy_only_by_default() {
        let mut s = session();
        s.total_steps = 50;
        let r = score(
            &[Event::LeveledUp(0)],
            &pass_verdict(),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        assert_eq!(r, -0.1);
        assert_eq!(s.cookies, 1);
        assert_eq!(s.last_positive_step, 50);

        let mut cfg = RewardConfig::default();
        cfg.level_up_bonus = 3.0;
        let r = score(&[Event::LeveledUp(0)], &pass_verdict(), &mut s, &cfg, None);
        approx(r, 2.9);
    }

    #[test]
    fn evolution_pays_five_cookies() {
        let mut s = session();
        let r = score(
            &[Event::Evolved(0)],
            &pass_verdict(),
            &mut s,
            &RewardConfig::default(),
            None,
        );
        approx(r, 499.9);
        assert_eq!(s.cookies, 5);
    }

    #[test]
    fn idle_penalty_only_on_check_cadence() {
        let cfg = RewardConfig::default();

        // Starving but off the multiple: no penalty.
        let mut s = session();
        s.total_steps = 1550;
        s.last_positive_step = 100;
        let r = score(&[], &pass_verdict(), &mut s, &cfg, None);
        assert_eq!(r, -0.1);
        assert_eq!(s.bonks, 0);

        // Starving on the multiple: penalty and bonk.
        s.total_steps = 1600;
        let r = score(&[], &pass_verdict(), &mut s, &cfg, None);
        approx(r, -5.1);
        assert_eq!(s.bonks, 1);

        // On the multiple but fed: nothing.
        s.last_positive_step = 1550;
        s.total_steps = 1700;
        let r = score(&[], &pass_verdict(), &mut s, &cfg, None);
        assert_eq!(r, -0.1);
        assert_eq!(s.bonks, 1);
    }

    #[test]
    fn hunger_check_tolerates_positive_step_ahead_of_counter() {
        // Callers may stamp last_positive_step out of band; the check must
        // stay total rather than underflow.
        let mut s = session();
        s.total_steps = 100;
        s.last_positive_step = 500;
        let r = score(&[], &pass_verdict(), &mut s, &RewardConfig::default(), None);
        assert_eq!(r, -0.1);
        assert_eq!(s.bonks, 0);
    }

    #[test]
    fn wipe_and_heal_penalties_apply() {
        let mut s = session();
        let cfg = RewardConfig::default();
        let r = score(&[Event::PartyWiped], &pass_verdict(), &mut s, &cfg, None);
        approx(r, -100.1);
        let r = score(
            &[Event::HpRestoredInBattle],
            &pass_verdict(),
            &mut s,
            &cfg,
            None,
        );
        approx(r, -50.1);
    }

    #[test]
    fn breakdown_accumulates_components() {
        let mut s = session();
        let cfg = RewardConfig::default();
        let mut b = RewardBreakdown::default();
        score(
            &[Event::SuperEffective, Event::BadgeEarned],
            &pass_verdict(),
            &mut s,
            &cfg,
            Some(&mut b),
        );
        assert_eq!(b.effectiveness, 20.0);
        assert_eq!(b.badge, 2000.0);
        assert_eq!(b.base, -0.1);
    }
}
