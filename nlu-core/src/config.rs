//! Configuração do conversor.
//!
//! Lida de um arquivo TOML; todo campo tem valor padrão, então um arquivo vazio
//! (ou nenhum arquivo) é válido. Ordem de resolução:
//! 1. `--config <path>` (flag da CLI); o arquivo precisa existir
//! 2. `nlu-convert.toml` no diretório atual, se existir
//! 3. valores padrão
//!
//! ```toml
//! data_dir = "data"
//! output_dir = "generated"
//! seed = 42
//! strict = false
//! strip_brackets = false
//! tokenizer = "word_punct"
//! tasks = ["ner", "intent", "joint"]
//! splits = ["double", "triple"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotated::RenderOptions;
use crate::corpus::ReadOptions;
use crate::error::{NluError, Result};
use crate::formatter::Task;
use crate::split::{SplitKind, DEFAULT_SEED};
use crate::tokenizer::TokenizerMode;

/// Arquivo procurado no diretório atual quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "nlu-convert.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Pasta com os corpora originais (default: `data`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Pasta de saída (default: `generated`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Semente das divisões estratificadas (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Aborta no primeiro registro inválido.
    #[serde(default)]
    pub strict: bool,
    /// Remove colchetes e parênteses antes de gerar o TSV anotado.
    #[serde(default)]
    pub strip_brackets: bool,
    #[serde(default)]
    pub tokenizer: TokenizerMode,
    /// Tarefas do formato NER (default: todas).
    #[serde(default = "default_tasks")]
    pub tasks: Vec<Task>,
    /// Divisões gravadas (default: double e triple).
    #[serde(default = "default_splits")]
    pub splits: Vec<SplitKind>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            seed: default_seed(),
            strict: false,
            strip_brackets: false,
            tokenizer: TokenizerMode::default(),
            tasks: default_tasks(),
            splits: default_splits(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_tasks() -> Vec<Task> {
    Task::ALL.to_vec()
}

fn default_splits() -> Vec<SplitKind> {
    SplitKind::ALL.to_vec()
}

impl ConvertConfig {
    /// Carrega a configuração seguindo a ordem de resolução do módulo.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match explicit_path {
            Some(path) if !path.exists() => {
                Err(NluError::config(format!("config file not found: {path:?}")))
            }
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| NluError::config(format!("failed to read config file {path:?}: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| NluError::config(format!("failed to parse config file {path:?}: {e}")))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            data_dir: self.data_dir.clone(),
            strict: self.strict,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            strip_brackets: self.strip_brackets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ConvertConfig = toml::from_str("").unwrap();
        assert_eq!(config, ConvertConfig::default());
        assert_eq!(config.seed, 42);
        assert_eq!(config.tasks, vec![Task::Ner, Task::Intent, Task::Joint]);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            output_dir = "/tmp/out"
            strict = true
            tokenizer = "unicode_words"
            tasks = ["joint"]
            splits = ["triple"]
        "#;
        let config: ConvertConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.strict);
        assert_eq!(config.tokenizer, TokenizerMode::UnicodeWords);
        assert_eq!(config.tasks, vec![Task::Joint]);
        assert_eq!(config.splits, vec![SplitKind::Triple]);
        assert!(config.read_options().strict);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConvertConfig::load(Some(Path::new("/nonexistent/nlu-convert.toml"))).unwrap_err();
        assert!(matches!(err, NluError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "seed = 7\nstrip_brackets = true\n").unwrap();
        let config = ConvertConfig::load(Some(&path)).unwrap();
        assert_eq!(config.seed, 7);
        assert!(config.render_options().strip_brackets);

        fs::write(&path, "seed = \"seven\"").unwrap();
        assert!(ConvertConfig::from_file(&path).is_err());
    }
}
