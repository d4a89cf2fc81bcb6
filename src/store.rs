use std::fmt;

use thiserror::Error;

use crate::pose_template::PoseTemplate;

/// Prefijo que marca un comando modificador
pub const MODIFIER_SIGIL: char = '$';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,

    #[error("modifier '{0}' has no name after the sigil")]
    EmptyModifier(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("index {index} out of range (store has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no entry named '{0}'")]
    NameNotFound(String),
}

/// Comando asociado a una plantilla, clasificado una sola vez al insertarlo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fragmento encadenable (`$media` → prefijo `media_`)
    Modifier(String),
    /// Comando que se ejecuta realmente
    Terminal(String),
}

impl Command {
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CommandError::Empty);
        }
        match raw.strip_prefix(MODIFIER_SIGIL) {
            Some("") => Err(CommandError::EmptyModifier(raw.to_string())),
            Some(name) => Ok(Self::Modifier(name.to_string())),
            None => Ok(Self::Terminal(raw.to_string())),
        }
    }

    /// Texto sin el prefijo
    pub fn body(&self) -> &str {
        match self {
            Self::Modifier(s) | Self::Terminal(s) => s,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modifier(s) => write!(f, "{}{}", MODIFIER_SIGIL, s),
            Self::Terminal(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    pub template: PoseTemplate,
    pub name: String,
    pub command: Command,
}

/// Colección ordenada de plantillas. El orden de inserción es la prioridad de match.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    entries: Vec<StoreEntry>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade al final y devuelve el índice de la nueva entrada
    pub fn add(&mut self, template: PoseTemplate, name: impl Into<String>, command: Command) -> usize {
        self.entries.push(StoreEntry {
            template,
            name: name.into(),
            command,
        });
        self.entries.len() - 1
    }

    pub fn remove_at(&mut self, index: usize) -> Result<StoreEntry, StoreError> {
        if index >= self.entries.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Elimina la primera entrada con ese nombre exacto
    pub fn remove_named(&mut self, name: &str) -> Result<StoreEntry, StoreError> {
        let index = self
            .position(name)
            .ok_or_else(|| StoreError::NameNotFound(name.to_string()))?;
        self.remove_at(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&StoreEntry> {
        self.entries.get(index)
    }

    pub fn get_name(&self, index: usize) -> Option<&str> {
        self.get(index).map(|e| e.name.as_str())
    }

    pub fn get_command(&self, index: usize) -> Option<&Command> {
        self.get(index).map(|e| &e.command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for TemplateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "(no gestures trained)");
        }
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "[{}] {} -> {}", i, entry.name, entry.command)?;
            write!(f, "{}", entry.template)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fist, open_hand, pointing};
    use crate::pose_template::ToleranceConfig;

    fn template() -> PoseTemplate {
        PoseTemplate::build(&open_hand(), ToleranceConfig::default())
    }

    fn store_with(names: &[&str]) -> TemplateStore {
        let mut store = TemplateStore::new();
        for name in names {
            store.add(template(), *name, Command::Terminal(format!("run_{}", name)));
        }
        store
    }

    fn names(store: &TemplateStore) -> Vec<&str> {
        store.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("$media"), Ok(Command::Modifier("media".into())));
        assert_eq!(Command::parse("play"), Ok(Command::Terminal("play".into())));
        assert_eq!(Command::parse("  play \n"), Ok(Command::Terminal("play".into())));
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
        assert_eq!(Command::parse("$"), Err(CommandError::EmptyModifier("$".into())));
    }

    #[test]
    fn test_command_display_roundtrips_sigil() {
        assert_eq!(Command::Modifier("media".into()).to_string(), "$media");
        assert_eq!(Command::Terminal("play".into()).to_string(), "play");
        assert_eq!(Command::Modifier("media".into()).body(), "media");
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut store = TemplateStore::new();
        assert!(store.is_empty());
        assert_eq!(store.add(template(), "a", Command::Terminal("x".into())), 0);
        assert_eq!(store.add(template(), "b", Command::Modifier("y".into())), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_name(1), Some("b"));
        assert_eq!(store.get_command(1), Some(&Command::Modifier("y".into())));
        assert_eq!(store.get_name(2), None);
        assert_eq!(store.get_command(5), None);
    }

    #[test]
    fn test_remove_at_shifts_following_entries() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        let removed = store.remove_at(1).unwrap();
        assert_eq!(removed.name, "b");
        assert_eq!(names(&store), vec!["a", "c", "d"]);
        assert_eq!(store.get_name(1), Some("c"));
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let mut store = store_with(&["a"]);
        assert_eq!(
            store.remove_at(1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_named_removes_first_exact_match_only() {
        let mut store = store_with(&["a", "dup", "b", "dup", "c"]);
        store.remove_named("dup").unwrap();
        assert_eq!(names(&store), vec!["a", "b", "dup", "c"]);
        assert_eq!(store.position("dup"), Some(2));
    }

    #[test]
    fn test_remove_named_missing_leaves_store_unchanged() {
        let mut store = store_with(&["a", "b"]);
        assert_eq!(
            store.remove_named("Dup"),
            Err(StoreError::NameNotFound("Dup".into()))
        );
        assert_eq!(names(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_display_lists_entries() {
        let mut store = TemplateStore::new();
        assert_eq!(store.to_string().trim(), "(no gestures trained)");
        store.add(
            PoseTemplate::build(&pointing(), ToleranceConfig::default()),
            "point",
            Command::Modifier("media".into()),
        );
        store.add(
            PoseTemplate::build(&fist(), ToleranceConfig::default()),
            "fist",
            Command::Terminal("play".into()),
        );
        let text = store.to_string();
        assert!(text.contains("[0] point -> $media"));
        assert!(text.contains("[1] fist -> play"));
        assert!(text.contains("Pinky finger (retracted)"));
    }
}
