pub mod mixer;

pub use mixer::{drain_track, AudioMixer, MixerConfig};
