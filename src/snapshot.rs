use crate::bridge::EmulatorBridge;

// =============================================================================
// RAM Addresses (Pokémon Red WRAM)
// =============================================================================

pub mod ram {
    pub const PARTY_COUNT: u16 = 0xD163;
    /// Party member records, 44-byte stride. Species at +0, current HP at
    /// +1/+2 (big-endian), max HP at +3/+4 (big-endian), level at +0x21.
    pub const PARTY_DATA: u16 = 0xD16B;
    pub const PARTY_STRIDE: u16 = 44;
    pub const PARTY_LEVEL_OFFSET: u16 = 0x21;

    /// Nickname records, 11-byte stride, terminated by 0x50.
    pub const NICKNAMES: u16 = 0xD2B5;
    pub const NICKNAME_STRIDE: u16 = 11;
    pub const NICKNAME_LEN: u16 = 11;
    pub const TEXT_TERMINATOR: u8 = 0x50;

    pub const BADGES: u16 = 0xD356;
    pub const MAP_ID: u16 = 0xD35E;
    pub const Y_COORD: u16 = 0xD361;
    pub const X_COORD: u16 = 0xD362;

    pub const ITEM_COUNT: u16 = 0xD31D;
    /// (id, count) pairs, 2-byte stride.
    pub const ITEMS: u16 = 0xD31E;

    // 0x00 = no battle, 0x01 = wild encounter, 0x02 = trainer battle
    pub const BATTLE_KIND: u16 = 0xD057;
    pub const BATTLE_KIND_TRAINER: u8 = 0x02;
    /// Cursor index in the top-level FIGHT / PKMN / ITEM / RUN menu.
    pub const BATTLE_MENU_CURSOR: u16 = 0xCC26;
    pub const BATTLE_MENU_ITEM_SLOT: u8 = 2;
    pub const ENEMY_SPECIES: u16 = 0xCFE5;

    /// Last move effectiveness: 10 neutral, above = super, below = resisted.
    pub const TYPE_EFFECTIVENESS: u16 = 0xD05B;
    pub const EFFECTIVENESS_NEUTRAL: u8 = 10;
}

pub const MAX_PARTY: usize = 6;

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyMember {
    pub species_id: u8,
    pub nickname: String,
    pub level: u8,
    pub hp: u16,
    pub max_hp: u16,
}

/// One decoded read of game memory. Produced fresh every step, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub party: Vec<PartyMember>,
    pub map_id: u8,
    pub x: u8,
    pub y: u8,
    pub badge_mask: u8,
    pub in_battle: bool,
    pub is_trainer_battle: bool,
    pub battle_menu: u8,
    pub opponent_species: u8,
    pub effectiveness: u8,
    pub inventory: Vec<(u8, u8)>,
}

impl Snapshot {
    pub fn badge_count(&self) -> u32 {
        self.badge_mask.count_ones()
    }

    pub fn total_hp(&self) -> u32 {
        self.party.iter().map(|m| m.hp as u32).sum()
    }

    pub fn has_item(&self, id: u8) -> bool {
        self.inventory.iter().any(|&(item, _)| item == id)
    }
}

/// Pure function of the current memory contents. Corrupt reads are clamped or
/// defaulted, never propagated as faults.
pub fn decode<B: EmulatorBridge>(bus: &B) -> Snapshot {
    let raw_count = bus.peek(ram::PARTY_COUNT) as usize;
    // Corrupt-read guard: anything outside 0..=6 means the byte is garbage.
    let count = if raw_count > MAX_PARTY { 0 } else { raw_count };

    let mut party = Vec::with_capacity(count);
    for slot in 0..count {
        let base = ram::PARTY_DATA + slot as u16 * ram::PARTY_STRIDE;
        let hp = read_be16(bus, base + 1);
        let max_hp = read_be16(bus, base + 3);
        party.push(PartyMember {
            species_id: bus.peek(base),
            nickname: decode_nickname(bus, slot),
            level: bus.peek(base + ram::PARTY_LEVEL_OFFSET),
            hp,
            max_hp,
        });
    }

    let item_count = bus.peek(ram::ITEM_COUNT) as usize;
    // Bag holds at most 20 slots; larger counts are corrupt reads.
    let item_count = item_count.min(20);
    let mut inventory = Vec::with_capacity(item_count);
    for i in 0..item_count {
        let addr = ram::ITEMS + i as u16 * 2;
        inventory.push((bus.peek(addr), bus.peek(addr + 1)));
    }

    let battle_kind = bus.peek(ram::BATTLE_KIND);

    Snapshot {
        party,
        map_id: bus.peek(ram::MAP_ID),
        x: bus.peek(ram::X_COORD),
        y: bus.peek(ram::Y_COORD),
        badge_mask: bus.peek(ram::BADGES),
        in_battle: battle_kind != 0,
        is_trainer_battle: battle_kind == ram::BATTLE_KIND_TRAINER,
        battle_menu: bus.peek(ram::BATTLE_MENU_CURSOR),
        opponent_species: bus.peek(ram::ENEMY_SPECIES),
        effectiveness: bus.peek(ram::TYPE_EFFECTIVENESS),
        inventory,
    }
}

fn read_be16<B: EmulatorBridge>(bus: &B, addr: u16) -> u16 {
    ((bus.peek(addr) as u16) << 8) + bus.peek(addr + 1) as u16
}

/// Reads a nickname from RAM. Character codes 0x80..=0x99 map to A..=Z; the
/// run stops at the 0x50 terminator. No valid character yields `"NEW"`.
fn decode_nickname<B: EmulatorBridge>(bus: &B, slot: usize) -> String {
    let base = ram::NICKNAMES + slot as u16 * ram::NICKNAME_STRIDE;
    let mut name = String::new();
    for i in 0..ram::NICKNAME_LEN {
        let val = bus.peek(base + i);
        if val == ram::TEXT_TERMINATOR {
            break;
        }
        if (0x80..=0x99).contains(&val) {
            name.push((val - 0x80 + b'A') as char);
        }
    }
    if name.is_empty() {
        "NEW".to_string()
    } else {
        name
    }
}

// =============================================================================
// Species tables (generation-1 internal ids)
// =============================================================================

/// Type label for a species' internal id, `"UNK"` when the id is not in the
/// table (glitch reads included).
pub fn species_label(id: u8) -> &'static str {
    match id {
        153 | 9 | 154 => "GRS/PSN",
        185..=190 => "GRS/PSN",
        12 | 10 => "GRS/PSY",
        176 | 178 | 180 | 82 | 83 | 33 | 20 | 163 | 164 | 51 | 103 => "FIRE",
        177 | 179 | 28 | 47 | 128 | 58 | 133 | 157 | 158 | 27 | 105 | 92 | 93 | 78 | 138 => "WTR",
        36 | 150 | 151 | 5 | 35 | 70 | 116 | 64 => "NORM/FLY",
        165 | 166 | 100 | 101 | 102 | 144 | 77 | 60 | 132 | 76 => "NORM",
        123 | 124 => "BUG",
        125 => "BUG/FLY",
        112 | 113 | 114 | 65 | 119 => "BUG/PSN",
        109 | 46 => "BUG/GRS",
        84 | 85 | 173 | 54 | 6 | 141 | 104 => "ELEC",
        3 | 167 | 15 | 168 | 108 | 45 | 13 | 136 | 55 | 143 => "PSN",
        7 | 16 => "PSN/GND",
        107 | 130 => "PSN/FLY",
        96 | 97 | 59 | 118 | 17 | 145 => "GND",
        169 | 39 | 49 | 18 | 1 | 34 => "RCK/GND",
        98 | 99 | 90 | 91 => "RCK/WTR",
        106 | 41 | 126 | 57 | 117 | 43 | 44 => "FGT",
        148 | 38 | 149 | 48 | 129 | 42 | 131 | 21 => "PSY",
        152 | 37 | 8 => "WTR/PSY",
        25 | 147 | 14 => "GHOST",
        23 | 139 | 120 | 19 => "WTR/ICE",
        72 => "ICE/PSY",
        24 | 155 | 74 => "WTR/PSN",
        22 => "WTR/FLY",
        88 | 89 => "DRGN",
        66 => "DRGN/FLY",
        73 => "FIRE/FLY",
        75 => "ELEC/FLY",
        71 | 110 | 111 => "WTR",
        4 | 142 => "NORM",
        _ => "UNK",
    }
}

/// Collapses an evolutionary line to its base form's internal id, so capture
/// legality treats evolved forms as already-caught family members. Unknown
/// ids map to themselves.
pub fn species_family(id: u8) -> u8 {
    match id {
        9 | 154 => 153,          // Bulbasaur line
        178 | 180 => 176,        // Charmander line
        179 | 28 => 177,         // Squirtle line
        124 | 125 => 123,        // Caterpie line
        113 | 114 => 112,        // Weedle line
        150 | 151 => 36,         // Pidgey line
        166 => 165,              // Rattata line
        35 => 5,                 // Spearow line
        45 => 108,               // Ekans line
        85 => 84,                // Pikachu line
        97 => 96,                // Sandshrew line
        168 | 16 => 15,          // Nidoran-F line
        167 | 7 => 3,            // Nidoran-M line
        142 => 4,                // Clefairy line
        83 => 82,                // Vulpix line
        101 => 100,              // Jigglypuff line
        130 => 107,              // Zubat line
        186 | 187 => 185,        // Oddish line
        46 => 109,               // Paras line
        119 => 65,               // Venonat line
        118 => 59,               // Diglett line
        144 => 77,               // Meowth line
        128 => 47,               // Psyduck line
        117 => 57,               // Mankey line
        20 => 33,                // Growlithe line
        110 | 111 => 71,         // Poliwag line
        38 | 149 => 148,         // Abra line
        41 | 126 => 106,         // Machop line
        189 | 190 => 188,        // Bellsprout line
        155 => 24,               // Tentacool line
        39 | 49 => 169,          // Geodude line
        164 => 163,              // Ponyta line
        8 => 37,                 // Slowpoke line
        54 => 173,               // Magnemite line
        116 => 70,               // Doduo line
        120 => 58,               // Seel line
        136 => 13,               // Grimer line
        139 => 23,               // Shellder line
        147 | 14 => 25,          // Gastly line
        1 => 18,                 // Rhyhorn line
        129 => 48,               // Drowzee line
        138 => 78,               // Krabby line
        141 => 6,                // Voltorb line
        10 => 12,                // Exeggcute line
        145 => 17,               // Cubone line
        143 => 55,               // Koffing line
        93 => 92,                // Horsea line
        158 => 157,              // Goldeen line
        152 => 27,               // Staryu line
        22 => 133,               // Magikarp line
        103 | 104 | 105 => 102,  // Eevee line
        99 => 98,                // Omanyte line
        91 => 90,                // Kabuto line
        89 | 66 => 88,           // Dratini line
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RamBuffer;

    fn bus_with_party(count: u8) -> RamBuffer {
        let mut bus = RamBuffer::new();
        bus.poke(ram::PARTY_COUNT, count);
        bus
    }

    #[test]
    fn party_count_clamps_corrupt_reads() {
        for raw in [7u8, 12, 0xFF] {
            let bus = bus_with_party(raw);
            assert_eq!(decode(&bus).party.len(), 0, "raw count {raw}");
        }
        let bus = bus_with_party(6);
        assert_eq!(decode(&bus).party.len(), 6);
    }

    #[test]
    fn hp_fields_are_big_endian() {
        let mut bus = bus_with_party(1);
        bus.write_bytes(ram::PARTY_DATA, &[176, 0x01, 0x2C, 0x01, 0x2C]);
        let snap = decode(&bus);
        assert_eq!(snap.party[0].hp, 300);
        assert_eq!(snap.party[0].max_hp, 300);
        assert_eq!(snap.party[0].species_id, 176);
    }

    #[test]
    fn nickname_decodes_till_terminator() {
        let mut bus = bus_with_party(1);
        // "REX" then terminator, then junk that must be ignored
        bus.write_bytes(ram::NICKNAMES, &[0x91, 0x84, 0x97, 0x50, 0x85, 0x85]);
        assert_eq!(decode(&bus).party[0].nickname, "REX");
    }

    #[test]
    fn empty_nickname_falls_back_to_placeholder() {
        let mut bus = bus_with_party(1);
        bus.write_bytes(ram::NICKNAMES, &[0x50; 11]);
        assert_eq!(decode(&bus).party[0].nickname, "NEW");
    }

    #[test]
    fn battle_flags_decode() {
        let mut bus = RamBuffer::new();
        bus.poke(ram::BATTLE_KIND, 2);
        let snap = decode(&bus);
        assert!(snap.in_battle);
        assert!(snap.is_trainer_battle);

        bus.poke(ram::BATTLE_KIND, 1);
        let snap = decode(&bus);
        assert!(snap.in_battle);
        assert!(!snap.is_trainer_battle);
    }

    #[test]
    fn unknown_species_labels_as_unk() {
        assert_eq!(species_label(0), "UNK");
        assert_eq!(species_label(200), "UNK");
        assert_eq!(species_label(176), "FIRE");
    }

    #[test]
    fn family_collapses_evolved_forms() {
        assert_eq!(species_family(180), 176);
        assert_eq!(species_family(176), 176);
        // unmapped ids stay themselves
        assert_eq!(species_family(250), 250);
    }

    #[test]
    fn family_base_forms_all_carry_labels() {
        // Every id the family table can produce must render as something
        // better than UNK, Exeggcute (internal 12) included.
        assert_eq!(species_family(10), 12);
        for id in 0..=u8::MAX {
            let base = species_family(id);
            if base != id {
                assert_ne!(species_label(base), "UNK", "base id {base}");
            }
        }
    }
}
