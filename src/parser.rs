use crate::error::{EngineError, EngineResult};
use crate::script::{Action, Color, Script, ScriptScene};
use anyhow::Context;
use std::path::Path;

/// Script parser that handles JSON courtroom scripts
pub struct ScriptParser;

impl ScriptParser {
    /// Parse a JSON script file
    pub fn parse_json(path: &Path) -> EngineResult<Script> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file: {}", path.display()))?;

        Self::parse_str(&content)
    }

    /// Parse a script from JSON text. Accepts `{"scenes": [...]}` or a bare scene list.
    pub fn parse_str(content: &str) -> EngineResult<Script> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| EngineError::invalid_script(format!("malformed JSON: {}", e)))?;

        let script = if value.is_array() {
            serde_json::from_value::<Vec<ScriptScene>>(value).map(|scenes| Script { scenes })
        } else {
            serde_json::from_value::<Script>(value)
        }
        .map_err(|e| EngineError::invalid_script(e.to_string()))?;

        Self::validate_script(&script)?;

        Ok(script)
    }

    /// Validate the script structure.
    ///
    /// Runs before any asset is resolved so a bad script never produces partial output.
    pub fn validate_script(script: &Script) -> EngineResult<()> {
        if script.scenes.is_empty() {
            return Err(EngineError::invalid_script(
                "script must contain at least one scene",
            ));
        }

        if script.scenes.iter().all(|s| s.actions.is_empty()) {
            return Err(EngineError::invalid_script(
                "script has no actions to render",
            ));
        }

        for (scene_idx, scene) in script.scenes.iter().enumerate() {
            let mut has_speaker = false;

            for (action_idx, action) in scene.actions.iter().enumerate() {
                let at = |msg: &str| {
                    EngineError::invalid_script(format!(
                        "scene {}, action {}: {}",
                        scene_idx + 1,
                        action_idx + 1,
                        msg
                    ))
                };

                if action.character.is_some() {
                    has_speaker = true;
                }

                if action.emotion.is_some() && !has_speaker {
                    return Err(at("emotion given before any character entered the scene"));
                }

                if !has_speaker && (action.action.is_dialogue() || action.action == Action::Objection)
                {
                    return Err(at(&format!(
                        "{:?} needs a speaker but no character entered the scene",
                        action.action
                    )));
                }

                if action.action.is_dialogue() && action.text.is_none() {
                    return Err(at("dialogue action has no text"));
                }

                if action.length == Some(0) {
                    return Err(at("length must be at least one frame"));
                }

                if let Some(colour) = &action.colour {
                    if Color::from_hex(colour).is_none() {
                        return Err(at(&format!("'{}' is not a #rrggbb colour", colour)));
                    }
                }
            }
        }

        Ok(())
    }

    /// Get a summary of the script structure
    pub fn summarize(script: &Script) -> String {
        let mut summary = String::new();
        let lines: usize = script
            .scenes
            .iter()
            .flat_map(|s| &s.actions)
            .filter(|a| a.action.is_dialogue())
            .count();
        summary.push_str(&format!("Scenes: {}\n", script.scenes.len()));
        summary.push_str(&format!("Dialogue lines: {}\n", lines));

        for (idx, scene) in script.scenes.iter().enumerate() {
            let mut speakers: Vec<String> = Vec::new();
            for character in scene.actions.iter().filter_map(|a| a.character) {
                let name = character.display_name();
                if !speakers.contains(&name) {
                    speakers.push(name);
                }
            }
            summary.push_str(&format!(
                "  Scene {}: {:?} ({} actions{}{})\n",
                idx + 1,
                scene.location,
                scene.actions.len(),
                if speakers.is_empty() {
                    String::new()
                } else {
                    format!(", speakers: {}", speakers.join(", "))
                },
                scene
                    .audio
                    .as_ref()
                    .map(|a| format!(", music: {}", a))
                    .unwrap_or_default()
            ));
        }

        summary
    }
}
