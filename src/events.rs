use std::collections::{HashSet, VecDeque};

use crate::snapshot::{species_family, species_label, Snapshot, MAX_PARTY};

pub const GRAVEYARD_CAPACITY: usize = 15;

// =============================================================================
// Events
// =============================================================================

/// Discrete transitions detected by diffing consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    LeveledUp(usize),
    Evolved(usize),
    Fainted(usize),
    Caught(u8),
    RouteCleared(u8),
    BadgeEarned,
    KeyItemFound(u8),
    HpRestoredInBattle,
    SuperEffective,
    NotVeryEffective,
    /// Total party HP dropped with no explicit explanation.
    HpLost,
    PartyWiped,
}

#[derive(Debug, Default)]
pub struct DiffOutcome {
    pub events: Vec<Event>,
    /// Roster grew versus the previous step: a capture just completed. Enters
    /// the nicknaming sub-state instead of emitting an event.
    pub roster_grew: bool,
}

// =============================================================================
// Session State
// =============================================================================

/// Last-known per-slot values for edge-triggered detection. Zero means
/// "never observed" and suppresses spurious first-frame events.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotHistory {
    pub species: u8,
    pub level: u8,
    pub hp: u16,
}

/// Mutable adapter-owned state, lifetime = one training process. Economy
/// counters persist across episode reloads; only the per-slot history is
/// cleared on reload.
#[derive(Debug)]
pub struct SessionState {
    pub last_snapshot: Option<Snapshot>,
    pub slots: [SlotHistory; MAX_PARTY],
    pub last_party_count: usize,
    pub last_total_hp: u32,
    pub last_badge_mask: u8,
    /// Species families with a confirmed capture. Monotonic within a session.
    pub caught_species: HashSet<u8>,
    /// Maps where the one-capture-per-route slot is used up. Monotonic.
    pub caught_locations: HashSet<u8>,
    pub seen_key_items: HashSet<u8>,
    pub cookies: u64,
    pub bonks: u64,
    pub last_positive_step: u64,
    pub total_steps: u64,
    pub level_cap: u8,
    pub graveyard: VecDeque<String>,
    pub last_policy_update: u64,
}

impl SessionState {
    pub fn new(level_cap: u8) -> Self {
        Self {
            last_snapshot: None,
            slots: [SlotHistory::default(); MAX_PARTY],
            last_party_count: 0,
            last_total_hp: 0,
            last_badge_mask: 0,
            caught_species: HashSet::new(),
            caught_locations: HashSet::new(),
            seen_key_items: HashSet::new(),
            cookies: 0,
            bonks: 0,
            last_positive_step: 0,
            total_steps: 0,
            level_cap,
            graveyard: VecDeque::with_capacity(GRAVEYARD_CAPACITY),
            last_policy_update: 0,
        }
    }

    /// Partial reset on episode reload: stale species/level comparisons must
    /// not fire against the freshly loaded roster. Economy counters persist.
    pub fn reset_slot_history(&mut self) {
        self.last_snapshot = None;
        self.slots = [SlotHistory::default(); MAX_PARTY];
        self.last_party_count = 0;
        self.last_total_hp = 0;
    }

    pub fn note_positive(&mut self) {
        self.last_positive_step = self.total_steps;
    }

    /// Append to the bounded graveyard, deduplicating adjacent repeats only.
    pub fn push_grave(&mut self, descriptor: String) {
        if self.graveyard.back() == Some(&descriptor) {
            return;
        }
        if self.graveyard.len() >= GRAVEYARD_CAPACITY {
            self.graveyard.pop_front();
        }
        self.graveyard.push_back(descriptor);
    }

    /// Members alive and under the level cap.
    pub fn valid_count(&self, snap: &Snapshot) -> usize {
        snap.party
            .iter()
            .filter(|m| m.hp > 0 && m.level <= self.level_cap)
            .count()
    }
}

// =============================================================================
// Diff
// =============================================================================

/// Compares the current snapshot to the previous one and to accumulated
/// session state, emitting discrete events and updating the history. Every
/// edge-triggered rule requires the previous value to be known and nonzero.
pub fn diff(
    prev: Option<&Snapshot>,
    curr: &Snapshot,
    session: &mut SessionState,
    key_items: &[u8],
    cap_increment: u8,
) -> DiffOutcome {
    let mut out = DiffOutcome::default();

    if prev.is_none() {
        // First observation: seed history, never fire.
        seed(curr, session);
        return out;
    }

    for (i, member) in curr.party.iter().enumerate().take(MAX_PARTY) {
        let hist = session.slots[i];

        if hist.level != 0 && member.level > hist.level {
            out.events.push(Event::LeveledUp(i));
        }

        if hist.species != 0 && member.species_id != 0 && member.species_id != hist.species {
            out.events.push(Event::Evolved(i));
        }

        if member.hp == 0 && member.max_hp > 0 && hist.hp != 0 {
            session.push_grave(grave_descriptor(member.species_id, &member.nickname));
            out.events.push(Event::Fainted(i));
        }

        // Level-cap rule: a member crossing above the cap is lost to the run.
        if member.level > session.level_cap && hist.level <= session.level_cap {
            session.push_grave(grave_descriptor(member.species_id, &member.nickname));
        }

        session.slots[i] = SlotHistory {
            species: member.species_id,
            level: member.level,
            hp: member.hp,
        };
    }

    let total_hp = curr.total_hp();
    if session.last_total_hp > 0 {
        if total_hp < session.last_total_hp {
            out.events.push(Event::HpLost);
        } else if total_hp > session.last_total_hp && curr.in_battle {
            out.events.push(Event::HpRestoredInBattle);
        }
    }
    session.last_total_hp = total_hp;

    let gained_badges = curr.badge_mask & !session.last_badge_mask;
    for _ in 0..gained_badges.count_ones() {
        out.events.push(Event::BadgeEarned);
        session.level_cap = session.level_cap.saturating_add(cap_increment);
    }
    session.last_badge_mask |= curr.badge_mask;

    for &(item, _) in &curr.inventory {
        if key_items.contains(&item) && session.seen_key_items.insert(item) {
            out.events.push(Event::KeyItemFound(item));
        }
    }

    if curr.in_battle
        && curr.effectiveness != 0
        && curr.effectiveness != crate::snapshot::ram::EFFECTIVENESS_NEUTRAL
    {
        if curr.effectiveness > crate::snapshot::ram::EFFECTIVENESS_NEUTRAL {
            out.events.push(Event::SuperEffective);
        } else {
            out.events.push(Event::NotVeryEffective);
        }
    }

    if session.last_party_count != 0 && curr.party.len() > session.last_party_count {
        out.roster_grew = true;
        if let Some(newest) = curr.party.last() {
            let family = species_family(newest.species_id);
            if session.caught_species.insert(family) {
                out.events.push(Event::Caught(newest.species_id));
            }
            if session.caught_locations.insert(curr.map_id) {
                out.events.push(Event::RouteCleared(curr.map_id));
            }
        }
    }
    session.last_party_count = curr.party.len();

    if !curr.party.is_empty() && session.valid_count(curr) == 0 {
        out.events.push(Event::PartyWiped);
    }

    out
}

fn seed(curr: &Snapshot, session: &mut SessionState) {
    for (i, member) in curr.party.iter().enumerate().take(MAX_PARTY) {
        session.slots[i] = SlotHistory {
            species: member.species_id,
            level: member.level,
            hp: member.hp,
        };
        let family = species_family(member.species_id);
        session.caught_species.insert(family);
    }
    for &(item, _) in &curr.inventory {
        session.seen_key_items.insert(item);
    }
    session.last_party_count = curr.party.len();
    session.last_total_hp = curr.total_hp();
    session.last_badge_mask = curr.badge_mask;
}

fn grave_descriptor(species: u8, nickname: &str) -> String {
    format!("{nickname} [{}]", species_label(species))
}
