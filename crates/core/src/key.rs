//! Logical key identities produced by the report decoders.

/// Highest macro key index any supported model reports (SideWinder X6: S1..S30).
pub const MAX_MACRO_KEYS: u8 = 30;

/// Linux `KEY_MACRO1`; `KEY_MACRO1..=KEY_MACRO30` are contiguous.
pub const KEY_MACRO1: u16 = 0x290;

/// Linux `KEY_ESC`, first regular keyboard key code.
pub const KEY_ESC: u16 = 1;
/// Linux `KEY_MICMUTE`, last regular keyboard key code the sink advertises.
pub const KEY_MICMUTE: u16 = 248;

/// A special key decoded from a vendor report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyIdentity {
    /// Programmable macro key, 1-based (S1..S30 on SideWinder, G1..G6 on G105).
    Macro(u8),
    /// SideWinder game center button.
    GameCenter,
    /// SideWinder X6 keypad mode toggle.
    MacroPad,
    /// Macro record button (SideWinder record, G105 MR).
    Record,
    /// Bank button that cycles to the next profile.
    ProfileCycle,
    /// Button that selects a profile directly, 0-based (G105 M1..M3).
    ProfileSelect(u8),
}

impl KeyIdentity {
    /// Key code injected for this identity, if it maps to one.
    ///
    /// Only macro keys have an input code; extra keys are controller actions.
    pub fn key_code(&self) -> Option<u16> {
        match *self {
            Self::Macro(n) if (1..=MAX_MACRO_KEYS).contains(&n) => {
                Some(KEY_MACRO1 + u16::from(n) - 1)
            }
            _ => None,
        }
    }

    /// Short label used in logs and macro file names.
    pub fn label(&self) -> String {
        match self {
            Self::Macro(n) => format!("S{n}"),
            Self::GameCenter => "game-center".to_string(),
            Self::MacroPad => "macro-pad".to_string(),
            Self::Record => "record".to_string(),
            Self::ProfileCycle => "profile".to_string(),
            Self::ProfileSelect(p) => format!("M{}", p + 1),
        }
    }
}

impl std::fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One decoded key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyData {
    pub key: KeyIdentity,
    pub pressed: bool,
}

impl KeyData {
    pub fn pressed(key: KeyIdentity) -> Self {
        Self { key, pressed: true }
    }
}

/// Every key code the synthetic keyboard may emit.
pub fn emitted_key_codes() -> impl Iterator<Item = u16> {
    (KEY_ESC..=KEY_MICMUTE).chain(KEY_MACRO1..KEY_MACRO1 + u16::from(MAX_MACRO_KEYS))
}
