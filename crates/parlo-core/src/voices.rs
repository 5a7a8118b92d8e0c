//! Per-language voice catalog and voice resolution.
//!
//! Voice ids are neural-voice identifiers understood by the synthesis
//! backend. Each language carries a default so a track only needs an
//! explicit voice when the learner wants a specific one.

/// One selectable voice: a short display key and the backend voice id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceEntry {
    pub display: &'static str,
    pub id: &'static str,
}

/// Language codes a track may select. `"none"` suppresses the slot.
pub const LANGUAGES: &[&str] = &[
    "english",
    "korean",
    "chinese",
    "vietnamese",
    "japanese",
    "thai",
    "filipino",
    "russian",
    "uzbek",
    "mongolian",
    "nepali",
    "myanmar",
    "indonesian",
    "cambodian",
    "none",
];

const ENGLISH: &[VoiceEntry] = &[
    VoiceEntry { display: "Steffan (US)", id: "en-US-SteffanNeural" },
    VoiceEntry { display: "Jenny (US)", id: "en-US-JennyNeural" },
    VoiceEntry { display: "Roger (US)", id: "en-US-RogerNeural" },
    VoiceEntry { display: "Sonia (UK)", id: "en-GB-SoniaNeural" },
    VoiceEntry { display: "Brian (US)", id: "en-US-BrianNeural" },
    VoiceEntry { display: "Emma (US)", id: "en-US-EmmaNeural" },
    VoiceEntry { display: "Guy (US)", id: "en-US-GuyNeural" },
    VoiceEntry { display: "Aria (US)", id: "en-US-AriaNeural" },
    VoiceEntry { display: "Ryan (UK)", id: "en-GB-RyanNeural" },
];

const KOREAN: &[VoiceEntry] = &[
    VoiceEntry { display: "SunHi", id: "ko-KR-SunHiNeural" },
    VoiceEntry { display: "InJoon", id: "ko-KR-InJoonNeural" },
];

const CHINESE: &[VoiceEntry] = &[
    VoiceEntry { display: "Xiaoxiao", id: "zh-CN-XiaoxiaoNeural" },
    VoiceEntry { display: "Yunjian", id: "zh-CN-YunjianNeural" },
];

const VIETNAMESE: &[VoiceEntry] = &[
    VoiceEntry { display: "HoaiMy", id: "vi-VN-HoaiMyNeural" },
    VoiceEntry { display: "NamMinh", id: "vi-VN-NamMinhNeural" },
];

const JAPANESE: &[VoiceEntry] = &[
    VoiceEntry { display: "Nanami", id: "ja-JP-NanamiNeural" },
    VoiceEntry { display: "Keita", id: "ja-JP-KeitaNeural" },
];

const THAI: &[VoiceEntry] = &[
    VoiceEntry { display: "Premwadee", id: "th-TH-PremwadeeNeural" },
    VoiceEntry { display: "Niwat", id: "th-TH-NiwatNeural" },
];

const FILIPINO: &[VoiceEntry] = &[
    VoiceEntry { display: "Blessica", id: "fil-PH-BlessicaNeural" },
    VoiceEntry { display: "Angelo", id: "fil-PH-AngeloNeural" },
];

const RUSSIAN: &[VoiceEntry] = &[
    VoiceEntry { display: "Svetlana", id: "ru-RU-SvetlanaNeural" },
    VoiceEntry { display: "Dmitry", id: "ru-RU-DmitryNeural" },
];

// No native neural voice; Russian Dmitry is the conventional stand-in.
const UZBEK: &[VoiceEntry] = &[VoiceEntry { display: "Dmitry", id: "ru-RU-DmitryNeural" }];

const INDONESIAN: &[VoiceEntry] = &[
    VoiceEntry { display: "Gadis", id: "id-ID-GadisNeural" },
    VoiceEntry { display: "Ardi", id: "id-ID-ArdiNeural" },
];

/// All voices for a language; empty for `"none"` and unsupported languages.
pub fn voices_for(language: &str) -> &'static [VoiceEntry] {
    match language {
        "english" => ENGLISH,
        "korean" => KOREAN,
        "chinese" => CHINESE,
        "vietnamese" => VIETNAMESE,
        "japanese" => JAPANESE,
        "thai" => THAI,
        "filipino" => FILIPINO,
        "russian" => RUSSIAN,
        "uzbek" => UZBEK,
        "indonesian" => INDONESIAN,
        _ => &[],
    }
}

/// The first catalog entry is the language default.
pub fn default_voice(language: &str) -> Option<&'static VoiceEntry> {
    voices_for(language).first()
}

/// Resolve a track's configured voice to a backend voice id.
///
/// Precedence: the track's configured voice (matched by display key or raw
/// id) wins over the language default. Returns `None` when the language has
/// no voices at all — such a slot stays subtitle-only.
pub fn resolve_voice(language: &str, configured: &str) -> Option<&'static str> {
    let catalog = voices_for(language);
    if let Some(v) = catalog
        .iter()
        .find(|v| v.display == configured || v.id == configured)
    {
        return Some(v.id);
    }
    default_voice(language).map(|v| v.id)
}
