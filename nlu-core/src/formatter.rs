//! # Formatos de Saída
//!
//! - **NER** ("token TAG"): uma linha por token, sentenças separadas por linha em
//!   branco, gravadas em `train.txt` e `test.txt`.
//! - **TSV**: `Annotated sentence<TAB>Intent[<TAB>Training]`, uma linha por mensagem.
//!
//! ## Tarefas
//!
//! | Tarefa | Tags              | Linha `INTENT` |
//! |--------|-------------------|----------------|
//! | ner    | entidades (BIO)   | não            |
//! | intent | todas `O`         | sim            |
//! | joint  | entidades (BIO)   | sim            |
//!
//! ```text
//! INTENT FindConnection
//! from O
//! garching B-StationStart
//! to O
//! studentenstadt B-StationDest
//! ```

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::annotated::{render_annotated, RenderOptions};
use crate::error::{NluError, Result};
use crate::message::{filtered_messages, Message};
use crate::tagger::{tag_message, Tag, TaggingReport};
use crate::tokenizer::TokenizerMode;

/// O que cada bloco do formato NER carrega.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Somente as tags de entidade.
    Ner,
    /// Somente a intenção: linha `INTENT` e todas as tags `O`.
    Intent,
    /// Intenção e entidades.
    Joint,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Ner, Task::Intent, Task::Joint];

    pub fn name(&self) -> &'static str {
        match self {
            Task::Ner => "ner",
            Task::Intent => "intent",
            Task::Joint => "joint",
        }
    }

    fn tags_entities(&self) -> bool {
        !matches!(self, Task::Intent)
    }

    fn has_intent_line(&self) -> bool {
        !matches!(self, Task::Ner)
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Task {
    type Err = NluError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ner" => Ok(Task::Ner),
            "intent" => Ok(Task::Intent),
            "joint" => Ok(Task::Joint),
            other => Err(NluError::UnknownTask(other.to_string())),
        }
    }
}

/// Estatísticas acumuladas ao formatar um conjunto de mensagens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatReport {
    pub messages: usize,
    pub tagging: TaggingReport,
    /// Mensagens em que o número de tags difere do número de tokens do texto.
    pub length_mismatches: usize,
}

impl FormatReport {
    pub fn merge(&mut self, other: &FormatReport) {
        self.messages += other.messages;
        self.tagging.merge(&other.tagging);
        self.length_mismatches += other.length_mismatches;
    }
}

fn render_block(task: Task, message: &Message, mode: TokenizerMode) -> (String, FormatReport) {
    let tagged = tag_message(message, mode);
    let mut report = FormatReport {
        messages: 1,
        tagging: tagged.report.clone(),
        length_mismatches: 0,
    };

    let tags: Vec<String> = if task.tags_entities() {
        tagged.tags.iter().map(Tag::label).collect()
    } else {
        vec![Tag::Outside.label(); tagged.tokens.len()]
    };

    // Valor re-tokenizado pode ter outro número de sub-tokens: as linhas param no menor
    if tags.len() != tagged.tokens.len() {
        report.length_mismatches = 1;
        warn!(
            text = %message.text,
            tokens = tagged.tokens.len(),
            tags = tags.len(),
            "token and tag counts differ, truncating block"
        );
    }

    let mut lines = Vec::with_capacity(tagged.tokens.len() + 1);
    if task.has_intent_line() {
        lines.push(format!("INTENT {}", message.compact_intent()));
    }
    lines.extend(
        tagged
            .tokens
            .iter()
            .zip(&tags)
            .map(|(token, tag)| format!("{} {}", token.text, tag)),
    );
    (lines.join("\n"), report)
}

/// Converte uma mensagem em linhas "token TAG".
pub fn message_lines(task: Task, message: &Message) -> String {
    render_block(task, message, TokenizerMode::default()).0
}

/// Converte várias mensagens em blocos separados por linha em branco.
pub fn messages_lines(task: Task, messages: &[&Message]) -> String {
    messages_lines_with_report(task, messages, TokenizerMode::default()).0
}

/// Como [`messages_lines`], devolvendo também as estatísticas. Blocos são gerados em
/// paralelo e mantêm a ordem das mensagens.
pub fn messages_lines_with_report(
    task: Task,
    messages: &[&Message],
    mode: TokenizerMode,
) -> (String, FormatReport) {
    let blocks: Vec<(String, FormatReport)> = messages
        .par_iter()
        .map(|m| render_block(task, m, mode))
        .collect();

    let mut report = FormatReport::default();
    for (_, r) in &blocks {
        report.merge(r);
    }
    let text = blocks
        .into_iter()
        .map(|(block, _)| block)
        .collect::<Vec<_>>()
        .join("\n\n");
    (text, report)
}

/// Grava as mensagens de treino (ou de teste) em `path`.
pub fn write_filtered_ner(
    task: Task,
    messages: &[Message],
    path: &Path,
    training: bool,
    mode: TokenizerMode,
) -> Result<FormatReport> {
    let filtered: Vec<&Message> = filtered_messages(messages, training).collect();
    let (text, report) = messages_lines_with_report(task, &filtered, mode);
    fs::write(path, text)?;
    Ok(report)
}

/// Grava `train.txt` e `test.txt` de uma tarefa em `dir`.
pub fn write_ner(task: Task, messages: &[Message], dir: &Path, mode: TokenizerMode) -> Result<FormatReport> {
    fs::create_dir_all(dir)?;
    let mut report = write_filtered_ner(task, messages, &dir.join("train.txt"), true, mode)?;
    report.merge(&write_filtered_ner(task, messages, &dir.join("test.txt"), false, mode)?);

    info!(
        task = %task,
        dir = %dir.display(),
        messages = report.messages,
        unaligned = report.tagging.unaligned_entities,
        mismatches = report.length_mismatches,
        "NER files written"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// TSV
// ---------------------------------------------------------------------------

/// Cabeçalho do TSV de sentenças anotadas.
pub fn tsv_header(with_training: bool) -> Vec<String> {
    let mut header = vec!["Annotated sentence".to_string(), "Intent".to_string()];
    if with_training {
        header.push("Training".to_string());
    }
    header
}

/// Aspas mínimas: campos com TAB, aspas ou quebra de linha vão entre aspas.
pub fn tsv_field(field: &str) -> Cow<'_, str> {
    if field.contains(['\t', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Linha do TSV para uma mensagem. A coluna de treino só existe se o flag existir.
pub fn message_row(message: &Message, options: &RenderOptions) -> Vec<String> {
    let mut row = vec![render_annotated(message, options), message.intent.clone()];
    if let Some(training) = message.training {
        row.push(if training { "True" } else { "False" }.to_string());
    }
    row
}

/// Grava o cabeçalho e as linhas. Retorna o número de linhas de dados.
pub fn write_tsv<I>(rows: I, with_training: bool, path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    let mut write_row = |row: &[String]| -> std::io::Result<()> {
        let fields: Vec<Cow<'_, str>> = row.iter().map(|f| tsv_field(f)).collect();
        writeln!(out, "{}", fields.join("\t"))
    };

    write_row(&tsv_header(with_training))?;
    let mut count = 0;
    for row in rows {
        write_row(&row)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Grava o corpus inteiro como TSV de sentenças anotadas.
pub fn to_tsv(messages: &[Message], options: &RenderOptions, path: &Path) -> Result<usize> {
    let with_training = messages.first().map_or(false, |m| m.training.is_some());
    let count = write_tsv(messages.iter().map(|m| message_row(m, options)), with_training, path)?;
    info!(path = %path.display(), rows = count, "TSV written");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::message::Entity;

    fn chatbot_message() -> Message {
        Message::new(
            "from garching to studentenstadt",
            "Find Connection",
            vec![
                Entity::new(5, 13, "StationStart", "garching"),
                Entity::new(17, 31, "StationDest", "studentenstadt"),
            ],
            Some(true),
            Corpus::Chatbot,
        )
    }

    #[test]
    fn test_ner_lines() {
        let lines = message_lines(Task::Ner, &chatbot_message());
        assert_eq!(
            lines,
            "from O\ngarching B-StationStart\nto O\nstudentenstadt B-StationDest"
        );
    }

    #[test]
    fn test_intent_lines() {
        let lines = message_lines(Task::Intent, &chatbot_message());
        assert_eq!(
            lines,
            "INTENT FindConnection\nfrom O\ngarching O\nto O\nstudentenstadt O"
        );
    }

    #[test]
    fn test_joint_lines() {
        let lines = message_lines(Task::Joint, &chatbot_message());
        assert!(lines.starts_with("INTENT FindConnection\nfrom O\ngarching B-StationStart"));
    }

    #[test]
    fn test_multi_word_entity_lines() {
        let message = Message::new(
            "Alternative to Facebook Messenger.",
            "Find Alternative",
            vec![Entity::new(15, 33, "WebService", "Facebook Messenger")],
            Some(false),
            Corpus::WebApplications,
        );
        assert_eq!(
            message_lines(Task::Ner, &message),
            "Alternative O\nto O\nFacebook B-WebService\nMessenger I-WebService\n. O"
        );
    }

    #[test]
    fn test_blocks_are_separated_by_blank_line() {
        let a = chatbot_message();
        let b = Message::new("hi there", "Greet", vec![], Some(true), Corpus::Mock);
        let (text, report) = messages_lines_with_report(Task::Ner, &[&a, &b], TokenizerMode::WordPunct);
        assert!(text.ends_with("B-StationDest\n\nhi O\nthere O"));
        assert_eq!(report.messages, 2);
        assert_eq!(report.length_mismatches, 0);
    }

    #[test]
    fn test_length_mismatch_is_reported() {
        let message = Message::new(
            "go to 8 am now",
            "Book",
            vec![Entity::new(6, 10, "Time", "8 a.m.")],
            Some(true),
            Corpus::Mock,
        );
        let (_, report) = messages_lines_with_report(Task::Ner, &[&message], TokenizerMode::WordPunct);
        assert_eq!(report.length_mismatches, 1);
    }

    #[test]
    fn test_tsv_field_quoting() {
        assert_eq!(tsv_field("plain text"), "plain text");
        assert_eq!(tsv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(tsv_field("a\tb"), "\"a\tb\"");
    }

    #[test]
    fn test_message_row() {
        let row = message_row(&chatbot_message(), &RenderOptions::default());
        assert_eq!(
            row,
            vec![
                "from [garching](StationStart) to [studentenstadt](StationDest)".to_string(),
                "Find Connection".to_string(),
                "True".to_string(),
            ]
        );
        let untagged = Message::new("x", "A", vec![], None, Corpus::Mock);
        assert_eq!(message_row(&untagged, &RenderOptions::default()).len(), 2);
    }

    #[test]
    fn test_task_from_str() {
        assert_eq!("Joint".parse::<Task>().unwrap(), Task::Joint);
        assert!("pos".parse::<Task>().is_err());
    }
}
