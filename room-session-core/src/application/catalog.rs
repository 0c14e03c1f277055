use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::application::lifecycle::Game;
use crate::domain::{normalize, GameOptions};

/// A format id plus the options requested for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub format: String,
    #[serde(default)]
    pub options: GameOptions,
}

impl FormatSpec {
    pub fn new(format: &str) -> Self {
        Self {
            format: normalize(format),
            options: GameOptions::new(),
        }
    }

    pub fn with_options(mut self, options: GameOptions) -> Self {
        self.options = options;
        self
    }
}

type GameFactory = Box<dyn Fn(&FormatSpec) -> Option<Box<dyn Game>> + Send + Sync>;

struct CatalogEntry {
    name: String,
    factory: GameFactory,
}

/// Registry of the game formats a channel can host
#[derive(Default)]
pub struct GameCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl fmt::Debug for GameCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameCatalog")
            .field("formats", &self.formats())
            .finish()
    }
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in formats
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        crate::games::register_all(&mut catalog);
        catalog
    }

    /// Register a format; a factory may refuse a spec by returning `None`
    pub fn register<F>(&mut self, format: &str, name: &str, factory: F)
    where
        F: Fn(&FormatSpec) -> Option<Box<dyn Game>> + Send + Sync + 'static,
    {
        self.entries.insert(
            normalize(format),
            CatalogEntry {
                name: name.to_string(),
                factory: Box::new(factory),
            },
        );
    }

    pub fn create(&self, spec: &FormatSpec) -> Option<Box<dyn Game>> {
        let entry = self.entries.get(&normalize(&spec.format))?;
        (entry.factory)(spec)
    }

    pub fn contains(&self, format: &str) -> bool {
        self.entries.contains_key(&normalize(format))
    }

    pub fn display_name(&self, format: &str) -> Option<&str> {
        self.entries
            .get(&normalize(format))
            .map(|entry| entry.name.as_str())
    }

    pub fn formats(&self) -> Vec<&str> {
        self.entries.keys().map(|format| format.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::ActivityCtx;
    use crate::application::lifecycle::HookResult;

    struct Idle;

    impl Game for Idle {
        fn name(&self) -> &str {
            "Idle"
        }

        fn on_start(&mut self, _ctx: &mut ActivityCtx<'_>) -> HookResult {
            Ok(())
        }

        fn on_next_round(&mut self, _ctx: &mut ActivityCtx<'_>) -> HookResult {
            Ok(())
        }
    }

    #[test]
    fn test_create_registered_format() {
        let mut catalog = GameCatalog::new();
        catalog.register("Idle Game", "Idle", |_| Some(Box::new(Idle) as Box<dyn Game>));

        assert!(catalog.contains("idlegame"));
        let game = catalog.create(&FormatSpec::new("idlegame")).unwrap();
        assert_eq!(game.name(), "Idle");
        assert_eq!(catalog.display_name("IdleGame"), Some("Idle"));
    }

    #[test]
    fn test_unknown_format() {
        let catalog = GameCatalog::new();
        assert!(catalog.create(&FormatSpec::new("nope")).is_none());
    }

    #[test]
    fn test_factory_can_refuse() {
        let mut catalog = GameCatalog::new();
        catalog.register("idle", "Idle", |spec| {
            if spec.options.get_or("laps", 1) > 0 {
                Some(Box::new(Idle) as Box<dyn Game>)
            } else {
                None
            }
        });

        let refused = FormatSpec::new("idle").with_options(GameOptions::new().with("laps", 0));
        assert!(catalog.create(&refused).is_none());
        assert!(catalog.create(&FormatSpec::new("idle")).is_some());
    }

    #[test]
    fn test_standard_formats() {
        let catalog = GameCatalog::standard();
        assert!(catalog.contains("pointrace"));
        assert!(catalog.contains("laprace"));
        // challenges are created by their own command
        assert!(!catalog.contains("onevsone"));
    }
}
