//! Bot demo configuration registry.
//!
//! Every bot page has a declarative [`BotDemoConfig`]: its intake questions,
//! accepted document categories, prompts, and output flags. The built-in bots
//! ship as TOML files embedded in the binary; deployments can add or override
//! bots by pointing `defaults.bots_dir` at a directory of further `*.toml`
//! files. A file whose slug matches a built-in replaces it.

use std::path::Path;
use std::sync::Arc;

use botdemo_shared::{AppConfig, BotDemoConfig, DemoError, Result};
use tracing::{debug, info, instrument};

/// Built-in bot definitions, in display order.
const BUILTIN_BOTS: &[(&str, &str)] = &[
    ("legal-expert.toml", include_str!("../bots/legal-expert.toml")),
    ("medical-expert.toml", include_str!("../bots/medical-expert.toml")),
    (
        "swiss-german-teacher.toml",
        include_str!("../bots/swiss-german-teacher.toml"),
    ),
    (
        "research-assistant.toml",
        include_str!("../bots/research-assistant.toml"),
    ),
    ("product-manager.toml", include_str!("../bots/product-manager.toml")),
    ("artistic-advisor.toml", include_str!("../bots/artistic-advisor.toml")),
];

/// Parse and validate a single bot definition. `origin` names the source in errors.
pub fn parse_bot(content: &str, origin: &str) -> Result<BotDemoConfig> {
    let config: BotDemoConfig = toml::from_str(content)
        .map_err(|e| DemoError::config(format!("failed to parse bot {origin}: {e}")))?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Bot configurations keyed by slug, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct BotRegistry {
    bots: Vec<Arc<BotDemoConfig>>,
}

impl BotRegistry {
    /// A registry with no bots.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in bots.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::empty();
        for (name, content) in BUILTIN_BOTS {
            registry.insert(parse_bot(content, name)?);
        }
        Ok(registry)
    }

    /// Built-in bots plus any found in the configured `bots_dir`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut registry = Self::builtin()?;
        if let Some(dir) = &config.defaults.bots_dir {
            registry.load_dir(Path::new(dir))?;
        }
        Ok(registry)
    }

    /// Add a bot, replacing any existing bot with the same slug in place.
    pub fn insert(&mut self, config: BotDemoConfig) {
        let config = Arc::new(config);
        match self.bots.iter_mut().find(|b| b.slug == config.slug) {
            Some(existing) => {
                debug!(slug = %config.slug, "replacing bot definition");
                *existing = config;
            }
            None => self.bots.push(config),
        }
    }

    /// Load every `*.toml` file in `dir` (sorted by file name).
    /// Returns the number of bots loaded.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| DemoError::io(dir, e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in &paths {
            let content = std::fs::read_to_string(path).map_err(|e| DemoError::io(path, e))?;
            let bot = parse_bot(&content, &path.display().to_string())?;
            self.insert(bot);
        }

        info!(count = paths.len(), "loaded bot definitions");
        Ok(paths.len())
    }

    /// Look up a bot by slug.
    pub fn get(&self, slug: &str) -> Option<Arc<BotDemoConfig>> {
        self.bots.iter().find(|b| b.slug == slug).cloned()
    }

    /// Look up a bot by slug, failing with [`DemoError::UnknownBot`].
    pub fn resolve(&self, slug: &str) -> Result<Arc<BotDemoConfig>> {
        self.get(slug)
            .ok_or_else(|| DemoError::UnknownBot(slug.to_string()))
    }

    /// All registered slugs in registration order.
    pub fn slugs(&self) -> Vec<&str> {
        self.bots.iter().map(|b| b.slug.as_str()).collect()
    }

    /// Iterate over registered bots.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BotDemoConfig>> {
        self.bots.iter()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdemo_shared::{AccentColor, IntakePhase, QuestionKind};

    #[test]
    fn builtin_bots_parse_and_validate() {
        let registry = BotRegistry::builtin().expect("builtin bots");
        assert_eq!(
            registry.slugs(),
            vec![
                "legal-expert",
                "medical-expert",
                "swiss-german-teacher",
                "research-assistant",
                "product-manager",
                "artistic-advisor",
            ]
        );
    }

    #[test]
    fn legal_expert_matches_its_page() {
        let registry = BotRegistry::builtin().unwrap();
        let lex = registry.resolve("legal-expert").unwrap();

        assert_eq!(lex.accent_color, AccentColor::Blue);
        assert_eq!(lex.intake_questions.len(), 6);
        assert!(lex.system_prompt.starts_with("You are Lex"));
        assert!(lex.welcome_message.starts_with("Hello! I'm Lex"));

        let required: Vec<&str> = lex
            .intake_questions
            .iter()
            .filter(|q| q.required)
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(required, vec!["case_type", "legal_area", "description"]);

        let urgency = lex.question("urgency").unwrap();
        assert_eq!(urgency.kind, QuestionKind::Select);
        assert_eq!(urgency.phase, IntakePhase::Advanced);
        assert!(lex.output_config.show_disclaimer);
        assert_eq!(lex.category_for("lease.docx").unwrap().id, "contracts");
    }

    #[test]
    fn every_builtin_has_starters_and_categories() {
        let registry = BotRegistry::builtin().unwrap();
        for bot in registry.iter() {
            assert_eq!(bot.starter_questions.len(), 3, "{}", bot.slug);
            assert!(!bot.file_categories.is_empty(), "{}", bot.slug);
            assert!(
                bot.intake_questions.iter().any(|q| q.required),
                "{} has no required question",
                bot.slug
            );
        }
    }

    #[test]
    fn unknown_slug_is_an_error() {
        let registry = BotRegistry::builtin().unwrap();
        let err = registry.resolve("tax-advisor").unwrap_err();
        assert!(matches!(err, DemoError::UnknownBot(ref s) if s == "tax-advisor"));
    }

    #[test]
    fn parse_bot_reports_origin() {
        let err = parse_bot("slug = 3", "broken.toml").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn load_dir_adds_and_overrides() {
        let dir = std::env::temp_dir().join(format!("botdemo-bots-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join("tutor.toml"),
            r#"
slug = "math-tutor"
system_prompt = "You teach maths."
welcome_message = "Hi, ready for some algebra?"

[[intake_questions]]
id = "level"
question = "What level are you at?"
type = "select"
options = ["School", "University"]
required = true
"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("lex.toml"),
            r#"
slug = "legal-expert"
system_prompt = "Custom Lex."
welcome_message = "Custom welcome."
"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.md"), "ignored").unwrap();

        let mut registry = BotRegistry::builtin().unwrap();
        let loaded = registry.load_dir(&dir).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(registry.len(), 7);

        // Overrides keep their original position.
        assert_eq!(registry.slugs()[0], "legal-expert");
        assert_eq!(registry.get("legal-expert").unwrap().welcome_message, "Custom welcome.");

        let tutor = registry.get("math-tutor").unwrap();
        assert_eq!(tutor.display_name(), "Math Tutor");
        assert_eq!(tutor.intake_questions[0].phase, IntakePhase::Essential);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
