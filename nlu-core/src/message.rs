//! # Mensagem Canônica
//!
//! Representação única, independente de corpus, sobre a qual toda a formatação opera.
//! Cada normalizador cria uma [`Message`] por registro do corpus; depois disso ela é
//! apenas lida.
//!
//! Os offsets de [`Entity`] contam **caracteres** (code points), não bytes, o mesmo
//! sistema de coordenadas do tokenizador.

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;

/// Uma entidade anotada no texto de uma mensagem.
///
/// `value` é o texto literal da anotação e é a referência usada para re-tokenizar a
/// entidade; nada garante que `value == text[start..end]` em corpora malformados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Offset (em caracteres) do início da entidade (inclusivo).
    pub start: usize,
    /// Offset (em caracteres) do fim da entidade (exclusivo).
    pub end: usize,
    /// Tipo livre (ex: "StationDest", "WebService").
    #[serde(rename = "entity")]
    pub entity_type: String,
    pub value: String,
}

impl Entity {
    pub fn new(start: usize, end: usize, entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            start,
            end,
            entity_type: entity_type.into(),
            value: value.into(),
        }
    }
}

/// Mensagem canônica: texto, intenção, entidades e o flag de treino.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// `None` quando o registro de origem não informa se é de treino ou teste.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<bool>,
    pub corpus: Corpus,
}

impl Message {
    pub fn new(
        text: impl Into<String>,
        intent: impl Into<String>,
        entities: Vec<Entity>,
        training: Option<bool>,
        corpus: Corpus,
    ) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
            entities,
            training,
            corpus,
        }
    }

    /// Intenção sem espaços, como aparece na linha `INTENT` do formato NER.
    pub fn compact_intent(&self) -> String {
        self.intent.chars().filter(|c| *c != ' ').collect()
    }
}

/// Mensagens cujo flag de treino é igual a `training`. Mensagens sem flag ficam de fora.
pub fn filtered_messages(messages: &[Message], training: bool) -> impl Iterator<Item = &Message> {
    messages.iter().filter(move |m| m.training == Some(training))
}

/// Intenção de cada mensagem, na ordem do corpus (com repetições).
pub fn intents(messages: &[Message]) -> impl Iterator<Item = &str> {
    messages.iter().map(|m| m.intent.as_str())
}
