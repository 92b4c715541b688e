use serde::{Deserialize, Serialize};
use std::fmt;

/// A full script: scenes are rendered strictly in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub scenes: Vec<ScriptScene>,
}

/// One scene of the script, shot at a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptScene {
    pub location: Location,
    /// Background music track to start with this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, alias = "scene")]
    pub actions: Vec<ScriptAction>,
}

impl ScriptScene {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            audio: None,
            actions: Vec::new(),
        }
    }

    pub fn with_audio(mut self, track: impl Into<String>) -> Self {
        self.audio = Some(track.into());
        self
    }

    pub fn push(mut self, action: ScriptAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// One step within a scene.
///
/// A `character` entry sets the speaker for the rest of the scene; `emotion`
/// names a pose of the current speaker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Overrides the speaker's display name in the name box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Action::is_idle")]
    pub action: Action,
    /// Explicit hold length in frames for idle actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "color")]
    pub colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<bool>,
}

impl ScriptAction {
    pub fn idle() -> Self {
        Self::default()
    }

    /// A speaker entry for `character`.
    pub fn enter(character: Character) -> Self {
        Self {
            character: Some(character),
            ..Self::default()
        }
    }

    pub fn objection(character: Character) -> Self {
        Self {
            character: Some(character),
            action: Action::Objection,
            ..Self::default()
        }
    }

    pub fn with_emotion(mut self, pose: impl Into<String>) -> Self {
        self.emotion = Some(pose.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.action = Action::Text;
        self
    }

    pub fn say_shaking(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.action = Action::TextWithShake;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn lasting(mut self, frames: usize) -> Self {
        self.length = Some(frames);
        self
    }

    pub fn with_colour(mut self, hex: impl Into<String>) -> Self {
        self.colour = Some(hex.into());
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = Some(repeat);
        self
    }
}

/// What a script action does on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Hold the current pose.
    #[default]
    Idle,
    Text,
    #[serde(alias = "text_shake_effect")]
    TextWithShake,
    #[serde(alias = "shake_effect")]
    Shake,
    Objection,
}

impl Action {
    pub fn is_idle(&self) -> bool {
        matches!(self, Action::Idle)
    }

    pub fn is_dialogue(&self) -> bool {
        matches!(self, Action::Text | Action::TextWithShake)
    }
}

/// Backdrops of the courtroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    CourtroomLeft,
    WitnessStand,
    CourtroomRight,
    CoCouncil,
    JudgeStand,
    CourtHouse,
}

impl Location {
    pub const ALL: [Location; 6] = [
        Location::CourtroomLeft,
        Location::WitnessStand,
        Location::CourtroomRight,
        Location::CoCouncil,
        Location::JudgeStand,
        Location::CourtHouse,
    ];

    /// Background image, relative to the asset root.
    pub fn background_asset(&self) -> &'static str {
        match self {
            Location::CourtroomLeft => "defenseempty.png",
            Location::WitnessStand => "witnessempty.png",
            Location::CourtroomRight => "prosecutorempty.png",
            Location::CoCouncil => "helperstand.png",
            Location::JudgeStand => "judgestand.png",
            Location::CourtHouse => "courtroomoverview.png",
        }
    }

    /// Foreground decoration drawn in front of the speaker, if any.
    pub fn bench(&self) -> Option<Bench> {
        match self {
            Location::CourtroomLeft => Some(Bench::Defense),
            Location::CourtroomRight => Some(Bench::Prosecution),
            Location::WitnessStand => Some(Bench::Witness),
            _ => None,
        }
    }
}

/// Bench and stand decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bench {
    Defense,
    Prosecution,
    Witness,
}

impl Bench {
    pub fn asset(&self) -> &'static str {
        match self {
            Bench::Defense => "logo-left.png",
            Bench::Prosecution => "logo-right.png",
            Bench::Witness => "witness_stand.png",
        }
    }

    /// The witness stand spans the full background width and sits on its bottom edge.
    pub fn anchored_to_bottom(&self) -> bool {
        matches!(self, Bench::Witness)
    }
}

/// The canonical emotion classes produced by upstream classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionClass {
    Sadness,
    Joy,
    Love,
    Anger,
    Fear,
    Surprise,
}

impl EmotionClass {
    pub const ALL: [EmotionClass; 6] = [
        EmotionClass::Sadness,
        EmotionClass::Joy,
        EmotionClass::Love,
        EmotionClass::Anger,
        EmotionClass::Fear,
        EmotionClass::Surprise,
    ];

    /// Whether a turn in this mood opens with an objection.
    pub fn triggers_objection(&self) -> bool {
        matches!(
            self,
            EmotionClass::Anger | EmotionClass::Surprise | EmotionClass::Fear
        )
    }

    pub fn music_track(&self) -> &'static str {
        match self {
            EmotionClass::Sadness | EmotionClass::Fear => music::SUSPENSE,
            EmotionClass::Joy => music::NORMAL,
            EmotionClass::Love | EmotionClass::Surprise => music::LOGIC_AND_TRICK,
            EmotionClass::Anger => music::CORNERED_VARIATION,
        }
    }
}

/// Background music track ids (file stems under the asset root).
pub mod music {
    pub const NORMAL: &str = "03 - Turnabout Courtroom - Trial";
    pub const OBJECTION: &str = "08 - Pressing Pursuit _ Cornered";
    pub const SUSPENSE: &str = "10 - Suspense";
    pub const LOGIC_AND_TRICK: &str = "05 - Logic and Trick";
    pub const CORNERED_VARIATION: &str = "11 - Pressing Pursuit _ Cornered , Variation";
}

/// The cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Phoenix,
    Edgeworth,
    Godot,
    Franziska,
    Judge,
    Larry,
    Maya,
    Karma,
    Payne,
    Maggey,
    Pearl,
    Lotta,
    Gumshoe,
    Grossberg,
}

impl Character {
    pub const ALL: [Character; 14] = [
        Character::Phoenix,
        Character::Edgeworth,
        Character::Godot,
        Character::Franziska,
        Character::Judge,
        Character::Larry,
        Character::Maya,
        Character::Karma,
        Character::Payne,
        Character::Maggey,
        Character::Pearl,
        Character::Lotta,
        Character::Gumshoe,
        Character::Grossberg,
    ];

    /// Sprite directory, relative to the asset root.
    pub fn sprite_directory(&self) -> &'static str {
        match self {
            Character::Phoenix => "Sprites-phoenix",
            Character::Edgeworth => "Sprites-edgeworth",
            Character::Godot => "Sprites-Godot",
            Character::Franziska => "Sprites-franziska",
            Character::Judge => "Sprites-judge",
            Character::Larry => "Sprites-larry",
            Character::Maya => "Sprites-maya",
            Character::Karma => "Sprites-karma",
            Character::Payne => "Sprites-payne",
            Character::Maggey => "Sprites-Maggey",
            Character::Pearl => "Sprites-Pearl",
            Character::Lotta => "Sprites-lotta",
            Character::Gumshoe => "Sprites-gumshoe",
            Character::Grossberg => "Sprites-grossberg",
        }
    }

    /// Lower-case name used as the prefix of pose files.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Character::Phoenix => "phoenix",
            Character::Edgeworth => "edgeworth",
            Character::Godot => "godot",
            Character::Franziska => "franziska",
            Character::Judge => "judge",
            Character::Larry => "larry",
            Character::Maya => "maya",
            Character::Karma => "karma",
            Character::Payne => "payne",
            Character::Maggey => "maggey",
            Character::Pearl => "pearl",
            Character::Lotta => "lotta",
            Character::Gumshoe => "gumshoe",
            Character::Grossberg => "grossberg",
        }
    }

    /// Name shown in the name box when the script gives no override.
    pub fn display_name(&self) -> String {
        let stem = self.file_stem();
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn home_location(&self) -> Location {
        match self {
            Character::Phoenix => Location::CourtroomLeft,
            Character::Edgeworth
            | Character::Godot
            | Character::Franziska
            | Character::Karma
            | Character::Payne => Location::CourtroomRight,
            Character::Judge => Location::JudgeStand,
            Character::Maya => Location::CoCouncil,
            Character::Larry
            | Character::Maggey
            | Character::Pearl
            | Character::Lotta
            | Character::Gumshoe
            | Character::Grossberg => Location::WitnessStand,
        }
    }

    /// Pose names suitable for an emotion class. Never empty.
    pub fn poses_for(&self, emotion: EmotionClass) -> &'static [&'static str] {
        use Character::*;
        use EmotionClass::*;
        match (self, emotion) {
            (Edgeworth, Sadness) => &["emo"],
            (Edgeworth, Joy) => &["confident", "pointing", "document", "normal", "thinking"],
            (Edgeworth, Love) => &["smirk"],
            (Edgeworth, Anger | Surprise) => &["handondesk"],
            (Edgeworth, Fear) => &["emo"],

            (Phoenix, Sadness) => &["emo"],
            (Phoenix, Joy) => &["confident", "pointing", "document", "normal", "thinking", "coffee"],
            (Phoenix, Love) => &["confident", "pointing"],
            (Phoenix, Anger | Surprise) => &["handsondesk"],
            (Phoenix, Fear) => &["emo", "sweating", "sheepish"],

            (Maya, Sadness) => &["bench-strict", "bench-ugh"],
            (Maya, Joy) => &["bench-hum", "bench-profile"],
            (Maya, Love) => &["bench"],
            (Maya, Anger) => &["bench-strict"],
            (Maya, Fear) => &["bench-ugh"],
            (Maya, Surprise) => &["bench-hum"],

            (Larry, Sadness) => &["extra"],
            (Larry, Joy) => &["normal"],
            (Larry, Love) => &["hello"],
            (Larry, Anger) => &["mad"],
            (Larry, Fear | Surprise) => &["nervous"],

            (Godot, Joy | Love) => &["normal"],
            (Godot, Anger) => &["pointing"],
            (Godot, Sadness | Fear | Surprise) => &["steams"],

            (Franziska, Sadness | Fear) => &["sweating"],
            (Franziska, Joy) => &["ready"],
            (Franziska, Love) => &["ha"],
            (Franziska, Anger) => &["mad"],
            (Franziska, Surprise) => &["withwhip"],

            (Judge, Sadness) => &["headshake"],
            (Judge, Joy) => &["normal"],
            (Judge, Love) => &["nodding"],
            (Judge, Anger | Fear | Surprise) => &["warning"],

            (Karma, Sadness) => &["badmood"],
            (Karma, Joy) => &["normal"],
            (Karma, Love) => &["smirk", "snap"],
            (Karma, Anger | Surprise) => &["break"],
            (Karma, Fear) => &["sweat"],

            (Payne, Joy) => &["normal"],
            (Payne, Love) => &["confident"],
            (Payne, Sadness | Anger | Fear | Surprise) => &["sweating"],

            (Maggey, Joy) => &["normal"],
            (Maggey, Love) => &["pumped", "shining"],
            (Maggey, Sadness | Anger | Fear | Surprise) => &["sad"],

            (Pearl, Sadness | Fear) => &["cries"],
            (Pearl, Joy) => &["normal", "thinking", "shy"],
            (Pearl, Love) => &["sparkle"],
            (Pearl, Anger) => &["fight", "disappointed"],
            (Pearl, Surprise) => &["surprised"],

            (Lotta, Sadness | Fear) => &["badmood"],
            (Lotta, Joy) => &["normal", "shy", "thinking"],
            (Lotta, Love) => &["confident", "smiling"],
            (Lotta, Anger) => &["mad", "disappointed"],
            (Lotta, Surprise) => &["mad"],

            (Gumshoe, Joy) => &["normal", "side", "thinking"],
            (Gumshoe, Love) => &["laughing", "confident", "pumped"],
            (Gumshoe, Anger) => &["mad"],
            (Gumshoe, Sadness | Fear | Surprise) => &["disheartened"],

            (Grossberg, Joy | Love) => &["normal"],
            (Grossberg, Sadness | Anger | Fear | Surprise) => &["sweating"],
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "default_alpha")]
    pub a: u8,
}

fn default_alpha() -> u8 {
    255
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if digits.len() == 8 { channel(6)? } else { 255 },
        })
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_deserialization() {
        let json = r#"
        {
            "scenes": [
                {
                    "location": "courtroom_left",
                    "audio": "03 - Turnabout Courtroom - Trial",
                    "scene": [
                        {"character": "phoenix", "emotion": "confident"},
                        {"action": "text", "text": "Hold it!"},
                        {"action": "shake_effect"},
                        {"length": 10, "repeat": false}
                    ]
                }
            ]
        }
        "#;

        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.scenes.len(), 1);
        let scene = &script.scenes[0];
        assert_eq!(scene.location, Location::CourtroomLeft);
        assert_eq!(scene.actions.len(), 4);
        assert_eq!(scene.actions[0].character, Some(Character::Phoenix));
        assert_eq!(scene.actions[0].action, Action::Idle);
        assert_eq!(scene.actions[1].action, Action::Text);
        assert_eq!(scene.actions[2].action, Action::Shake);
        assert_eq!(scene.actions[3].length, Some(10));
        assert_eq!(scene.actions[3].repeat, Some(false));
    }

    #[test]
    fn test_unknown_character_is_rejected() {
        let json = r#"{"character": "apollo"}"#;
        let action: Result<ScriptAction, _> = serde_json::from_str(json);
        assert!(action.is_err());
    }

    #[test]
    fn test_idle_action_is_not_serialized() {
        let action = ScriptAction::enter(Character::Maya);
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"character":"maya"}"#);
    }

    #[test]
    fn test_every_character_has_poses_for_every_emotion() {
        for character in Character::ALL {
            for emotion in EmotionClass::ALL {
                assert!(
                    !character.poses_for(emotion).is_empty(),
                    "{:?} has no pose for {:?}",
                    character,
                    emotion
                );
            }
        }
    }

    #[test]
    fn test_display_name_is_capitalised() {
        assert_eq!(Character::Phoenix.display_name(), "Phoenix");
        assert_eq!(Character::Godot.to_string(), "Godot");
        assert_eq!(Character::Godot.sprite_directory(), "Sprites-Godot");
    }

    #[test]
    fn test_benches() {
        assert_eq!(Location::CourtroomLeft.bench(), Some(Bench::Defense));
        assert_eq!(Location::CourtroomRight.bench(), Some(Bench::Prosecution));
        assert!(Location::WitnessStand
            .bench()
            .is_some_and(|b| b.anchored_to_bottom()));
        assert_eq!(Location::JudgeStand.bench(), None);
        assert_eq!(Location::CourtHouse.bench(), None);
    }

    #[test]
    fn test_home_locations() {
        assert_eq!(Character::Phoenix.home_location(), Location::CourtroomLeft);
        assert_eq!(Character::Edgeworth.home_location(), Location::CourtroomRight);
        assert_eq!(Character::Judge.home_location(), Location::JudgeStand);
        assert_eq!(Character::Maya.home_location(), Location::CoCouncil);
        assert_eq!(Character::Gumshoe.home_location(), Location::WitnessStand);
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#ffffff"), Some(Color::WHITE));
        assert_eq!(
            Color::from_hex("#ff000080"),
            Some(Color {
                r: 255,
                g: 0,
                b: 0,
                a: 128
            })
        );
        assert_eq!(Color::from_hex("ffffff"), None);
        assert_eq!(Color::from_hex("#fff"), None);
        assert_eq!(Color::from_hex("#gggggg"), None);
    }

    #[test]
    fn test_objection_emotions() {
        assert!(EmotionClass::Anger.triggers_objection());
        assert!(EmotionClass::Fear.triggers_objection());
        assert!(EmotionClass::Surprise.triggers_objection());
        assert!(!EmotionClass::Joy.triggers_objection());
        assert_eq!(EmotionClass::Joy.music_track(), music::NORMAL);
    }
}
