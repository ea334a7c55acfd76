pub const OBS_DIM: usize = 16;
pub type Observation = [f32; OBS_DIM];

pub mod bridge;
pub mod env;
pub mod episode;
pub mod events;
pub mod guardian;
pub mod reward;
pub mod savestate;
pub mod snapshot;
pub mod telemetry;

pub use bridge::{Action, Button, EmulatorBridge, RamBuffer};
pub use env::{observation, EnvConfig, NuzlockeEnv, StepInfo, StepResult};
pub use episode::Phase;
pub use events::{diff, DiffOutcome, Event, SessionState};
pub use guardian::{Guardian, RuleConfig, RuleVariant, Ruling, Verdict};
pub use reward::{score, RewardBreakdown, RewardConfig};
pub use snapshot::{decode, ram, PartyMember, Snapshot};
pub use telemetry::{LogBuffer, NoopSink, StatusSnapshot, TelemetrySink, WriterSink};
