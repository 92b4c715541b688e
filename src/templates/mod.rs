use crate::script::{music, Action, Character, Location, Script, ScriptAction, ScriptScene};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateType {
    /// Defense and prosecution trade blows, ending in an objection.
    Objection,
    /// A witness testifies and gets cross-examined.
    Testimony,
    /// The judge hands down the verdict.
    Verdict,
}

pub struct ScriptTemplate;

impl ScriptTemplate {
    pub fn generate(template_type: TemplateType) -> Script {
        match template_type {
            TemplateType::Objection => Self::generate_objection(),
            TemplateType::Testimony => Self::generate_testimony(),
            TemplateType::Verdict => Self::generate_verdict(),
        }
    }

    fn generate_objection() -> Script {
        Script {
            scenes: vec![
                ScriptScene::new(Location::CourtroomLeft)
                    .with_audio(music::NORMAL)
                    .push(Self::line(Character::Phoenix, "normal", "The defense is ready, Your Honor."))
                    .push(ScriptAction::idle().lasting(10)),
                ScriptScene::new(Location::CourtroomRight)
                    .push(Self::line(
                        Character::Edgeworth,
                        "confident",
                        "The evidence speaks for itself. The defendant was at the scene.",
                    )),
                ScriptScene::new(Location::CourtroomLeft)
                    .with_audio(music::OBJECTION)
                    .push(ScriptAction::objection(Character::Phoenix).with_emotion("handsondesk"))
                    .push(
                        ScriptAction::enter(Character::Phoenix)
                            .with_emotion("handsondesk")
                            .say_shaking("That contradicts the autopsy report!"),
                    )
                    .push(ScriptAction::idle().with_action(Action::Shake)),
            ],
        }
    }

    fn generate_testimony() -> Script {
        Script {
            scenes: vec![
                ScriptScene::new(Location::JudgeStand)
                    .with_audio(music::NORMAL)
                    .push(Self::line(Character::Judge, "normal", "The witness may begin the testimony.")),
                ScriptScene::new(Location::WitnessStand)
                    .push(Self::line(Character::Larry, "normal", "I saw everything from the window!"))
                    .push(
                        ScriptAction::enter(Character::Larry)
                            .with_emotion("normal")
                            .say("It was (exactly) midnight.")
                            .with_colour("#6bc7f6"),
                    ),
                ScriptScene::new(Location::CourtroomLeft)
                    .with_audio(music::LOGIC_AND_TRICK)
                    .push(Self::line(Character::Phoenix, "thinking", "Hold on. How could you see the clock?")),
            ],
        }
    }

    fn generate_verdict() -> Script {
        Script {
            scenes: vec![
                ScriptScene::new(Location::JudgeStand)
                    .with_audio(music::SUSPENSE)
                    .push(Self::line(Character::Judge, "normal", "This court finds the defendant..."))
                    .push(ScriptAction::idle().lasting(18))
                    .push(
                        ScriptAction::enter(Character::Judge)
                            .with_emotion("normal")
                            .say_shaking("Not guilty!"),
                    ),
                ScriptScene::new(Location::CourtroomLeft)
                    .push(Self::line(Character::Phoenix, "normal", "We did it.")),
            ],
        }
    }

    fn line(character: Character, pose: &str, text: &str) -> ScriptAction {
        ScriptAction::enter(character)
            .with_emotion(pose)
            .say(text)
    }
}
