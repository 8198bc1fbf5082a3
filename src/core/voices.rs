//! Built-in Bark voice presets

/// Voice used when a request does not name one
pub const DEFAULT_VOICE: &str = "v2/en_speaker_6";

/// English speaker presets shipped with Bark v2
pub const VOICE_PRESETS: [&str; 10] = [
    "v2/en_speaker_0",
    "v2/en_speaker_1",
    "v2/en_speaker_2",
    "v2/en_speaker_3",
    "v2/en_speaker_4",
    "v2/en_speaker_5",
    "v2/en_speaker_6",
    "v2/en_speaker_7",
    "v2/en_speaker_8",
    "v2/en_speaker_9",
];
