//! # Esquema de Tags BIO e Anotação de Entidades
//!
//! Converte as entidades de uma mensagem (offsets de caractere) em uma tag por token.
//!
//! ## Esquema BIO
//!
//! - `B-TIPO`: Begin, primeiro token de uma entidade
//! - `I-TIPO`: Inside, tokens seguintes da mesma entidade
//! - `O`: Outside, não faz parte de nenhuma entidade
//!
//! Os tipos vêm do corpus e são livres ("StationDest", "currency lorem ipsum"...),
//! copiados sem nenhuma transformação.
//!
//! ## Algoritmo
//!
//! 1. Os spans do tokenizador passam por [`merge_spans`]: cada entidade vira um span.
//! 2. Span que coincide com uma entidade: o **valor** da entidade é re-tokenizado e
//!    gera `B-` para o primeiro sub-token e `I-` para os demais.
//! 3. Qualquer outro span recebe um único `O`.
//!
//! Re-tokenizar o valor (e não o trecho do texto) desacopla a contagem interna de
//! offsets corrompidos no corpus.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::{Entity, Message};
use crate::span::{merge_spans, Span};
use crate::tokenizer::{span_tokenize_with_mode, tokenize_with_mode, Token, TokenizerMode};

/// Tag BIO aplicada a um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// **Begin**: início de uma entidade. Ex: **Facebook** (B-WebService) Messenger.
    Begin(String),
    /// **Inside**: continuação de uma entidade. Ex: Facebook **Messenger** (I-WebService).
    Inside(String),
    /// **Outside**: o token não faz parte de nenhuma entidade.
    Outside,
}

impl Tag {
    /// Representação textual da tag (ex: "B-StationDest", "I-date", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(t) => format!("B-{}", t),
            Tag::Inside(t) => format!("I-{}", t),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Verifica se a transição tag_prev → next é válida no esquema BIO
    ///
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `B-X` e `O` podem seguir qualquer tag
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(t) => match prev {
                Tag::Begin(p) | Tag::Inside(p) => p == t,
                Tag::Outside => false,
            },
            _ => true,
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-date" → Begin("date"))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, entity_type) = s.split_once('-')?;
        if entity_type.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(Tag::Begin(entity_type.to_string())),
            "I" => Some(Tag::Inside(entity_type.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tags de uma única entidade: `B-` no primeiro sub-token do valor, `I-` nos demais.
pub fn annotate_entity_tokens(entity: &Entity) -> Vec<Tag> {
    annotate_entity_tokens_with_mode(entity, TokenizerMode::default())
}

pub fn annotate_entity_tokens_with_mode(entity: &Entity, mode: TokenizerMode) -> Vec<Tag> {
    let n = span_tokenize_with_mode(&entity.value, mode).len();
    (0..n)
        .map(|i| {
            if i == 0 {
                Tag::Begin(entity.entity_type.clone())
            } else {
                Tag::Inside(entity.entity_type.clone())
            }
        })
        .collect()
}

/// Usa as entidades para anotar os spans do tokenizador.
///
/// O resultado não tem necessariamente o mesmo tamanho de `spans`: cada entidade
/// contribui com o número de sub-tokens do seu próprio valor.
pub fn annotate_tokens(spans: &[Span], entities: &[Entity]) -> Vec<Tag> {
    annotate_tokens_with_mode(spans, entities, TokenizerMode::default())
}

pub fn annotate_tokens_with_mode(spans: &[Span], entities: &[Entity], mode: TokenizerMode) -> Vec<Tag> {
    let merged = merge_spans(spans, entities);
    let mut tags = Vec::with_capacity(spans.len());

    for span in &merged {
        // Primeira entidade com o mesmo início; só vale se o fim também coincidir
        match entities.iter().find(|e| e.start == span.start) {
            Some(entity) if entity.end == span.end => {
                tags.extend(annotate_entity_tokens_with_mode(entity, mode));
            }
            _ => tags.push(Tag::Outside),
        }
    }
    tags
}

/// Diagnóstico de alinhamento entre entidades e tokens de uma mensagem.
///
/// Não altera a saída: entidades desalinhadas continuam sendo marcadas como `O`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingReport {
    /// Entidades cujo início ou fim não coincide com uma borda de token.
    pub unaligned_entities: usize,
}

impl TaggingReport {
    pub fn merge(&mut self, other: &TaggingReport) {
        self.unaligned_entities += other.unaligned_entities;
    }
}

/// Conta as entidades cujas bordas não caem em bordas de token.
pub fn alignment_report(spans: &[Span], entities: &[Entity]) -> TaggingReport {
    let starts: HashSet<usize> = spans.iter().map(|s| s.start).collect();
    let ends: HashSet<usize> = spans.iter().map(|s| s.end).collect();
    let unaligned_entities = entities
        .iter()
        .filter(|e| !starts.contains(&e.start) || !ends.contains(&e.end))
        .count();
    TaggingReport { unaligned_entities }
}

/// Mensagem tokenizada e anotada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedMessage {
    pub tokens: Vec<Token>,
    pub tags: Vec<Tag>,
    pub report: TaggingReport,
}

/// Tokeniza o texto de uma mensagem e anota suas entidades.
pub fn tag_message(message: &Message, mode: TokenizerMode) -> TaggedMessage {
    let tokens = tokenize_with_mode(&message.text, mode);
    let spans: Vec<Span> = tokens.iter().map(Token::span).collect();
    let tags = annotate_tokens_with_mode(&spans, &message.entities, mode);
    let report = alignment_report(&spans, &message.entities);

    if report.unaligned_entities > 0 {
        warn!(
            text = %message.text,
            entities = ?message.entities,
            unaligned = report.unaligned_entities,
            "entity boundaries do not match token boundaries, tagging them as O"
        );
    }

    TaggedMessage { tokens, tags, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::tokenizer::{char_slice, span_tokenize};

    fn labels(tags: &[Tag]) -> Vec<String> {
        tags.iter().map(Tag::label).collect()
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(Tag::Outside.label(), "O");
        assert_eq!(Tag::Begin("WebService".into()).label(), "B-WebService");
        assert_eq!(Tag::Inside("date".into()).to_string(), "I-date");
    }

    #[test]
    fn test_tag_from_label() {
        assert_eq!(Tag::from_label("O"), Some(Tag::Outside));
        assert_eq!(Tag::from_label("B-StationDest"), Some(Tag::Begin("StationDest".into())));
        assert_eq!(Tag::from_label("I-playlist-owner"), Some(Tag::Inside("playlist-owner".into())));
        assert_eq!(Tag::from_label("X-foo"), None);
        assert_eq!(Tag::from_label("B-"), None);
    }

    #[test]
    fn test_valid_transitions() {
        let b = Tag::Begin("X".into());
        let i = Tag::Inside("X".into());
        assert!(Tag::is_valid_transition(&b, &i));
        assert!(!Tag::is_valid_transition(&Tag::Outside, &i));
        assert!(!Tag::is_valid_transition(&Tag::Begin("Y".into()), &i));
    }

    #[test]
    fn test_multi_word_entity() {
        let text = "Alternative to Facebook Messenger.";
        let entities = vec![Entity::new(15, 33, "WebService", "Facebook Messenger")];
        let tags = annotate_tokens(&span_tokenize(text), &entities);
        assert_eq!(labels(&tags), vec!["O", "O", "B-WebService", "I-WebService", "O"]);
    }

    #[test]
    fn test_hyphenated_entity_value() {
        let entity = Entity::new(0, 16, "X", "karl-preis-platz");
        assert_eq!(
            labels(&annotate_entity_tokens(&entity)),
            vec!["B-X", "I-X", "I-X", "I-X", "I-X"]
        );
    }

    #[test]
    fn test_touching_entities() {
        let text = "from garching to studentenstadt";
        let entities = vec![
            Entity::new(5, 13, "StationStart", "garching"),
            Entity::new(17, 31, "StationDest", "studentenstadt"),
        ];
        let tags = annotate_tokens(&span_tokenize(text), &entities);
        assert_eq!(labels(&tags), vec!["O", "B-StationStart", "O", "B-StationDest"]);

        let spans: Vec<Span> = (0..7).map(|i| Span::new(i, i + 1)).collect();
        let adjacent = vec![Entity::new(1, 3, "A", "x y"), Entity::new(3, 6, "B", "z")];
        let tags = annotate_tokens(&spans, &adjacent);
        assert_eq!(labels(&tags), vec!["O", "B-A", "I-A", "B-B", "O"]);
    }

    #[test]
    fn test_length_counts_value_subtokens() {
        // O valor tem mais sub-tokens que o trecho do texto
        let text = "go to 8 am now";
        let entities = vec![Entity::new(6, 10, "Time", "8 a.m.")];
        let tags = annotate_tokens(&span_tokenize(text), &entities);
        // O, O, [8, a, ., m, .], O
        assert_eq!(tags.len(), 2 + 5 + 1);
        assert!(tags.windows(2).all(|w| Tag::is_valid_transition(&w[0], &w[1])));
    }

    #[test]
    fn test_unaligned_entity_degrades_to_outside() {
        // Início no meio de "Ubuntu": nenhuma borda coincide
        let text = "Problem upgrading Ubuntu 9.10";
        let entities = vec![Entity::new(20, 29, "UbuntuVersion", "Ubuntu 9.10")];
        let spans = span_tokenize(text);
        let tags = annotate_tokens(&spans, &entities);
        assert_eq!(tags.len(), spans.len());
        assert!(tags.iter().all(|t| *t == Tag::Outside));
        assert_eq!(alignment_report(&spans, &entities).unaligned_entities, 1);
    }

    #[test]
    fn test_unclosed_entity_keeps_every_token() {
        let text = "book a table at Luigi now";
        let entities = vec![Entity::new(16, 22, "Restaurant", "Luigi n")];
        let spans = span_tokenize(text);
        let tags = annotate_tokens(&spans, &entities);
        assert_eq!(tags.len(), spans.len());
        assert!(tags.iter().all(|t| *t == Tag::Outside));
    }

    #[test]
    fn test_foreign_entity_end_keeps_one_tag_per_token() {
        // [0,6) termina no meio de "defg" e [10,12) começa no meio de "hij"
        let text = "abc defg hij kl";
        let entities = vec![Entity::new(0, 6, "A", "abc de"), Entity::new(10, 12, "B", "ij")];
        let spans = span_tokenize(text);
        let tags = annotate_tokens(&spans, &entities);
        assert_eq!(tags.len(), spans.len());
        assert!(tags.iter().all(|t| *t == Tag::Outside));
        assert_eq!(alignment_report(&spans, &entities).unaligned_entities, 2);
    }

    /// Trechos fora de entidade e valores das entidades, na ordem dos spans fundidos.
    fn reconstruct(text: &str, entities: &[Entity]) -> String {
        merge_spans(&span_tokenize(text), entities)
            .iter()
            .map(|span| {
                match entities.iter().find(|e| e.start == span.start && e.end == span.end) {
                    Some(entity) => entity.value.clone(),
                    None => char_slice(text, span.start, span.end).to_string(),
                }
            })
            .collect()
    }

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_merged_spans_cover_the_whole_text() {
        let cases = [
            (
                "add Foo songs in my playlist música libre",
                vec![
                    Entity::new(4, 7, "artist", "Foo"),
                    Entity::new(29, 41, "playlist", "música libre"),
                ],
            ),
            (
                "pay 20€ now",
                vec![Entity::new(4, 6, "amount", "20"), Entity::new(6, 7, "currency", "€")],
            ),
            (
                "from garching to karl-preis-platz",
                vec![
                    Entity::new(5, 13, "StationStart", "garching"),
                    Entity::new(17, 33, "StationDest", "karl-preis-platz"),
                ],
            ),
        ];
        for (text, entities) in cases {
            assert_eq!(without_whitespace(&reconstruct(text, &entities)), without_whitespace(text));
            let tags = annotate_tokens(&span_tokenize(text), &entities);
            assert_eq!(tags.len(), span_tokenize(text).len());
        }
    }

    #[test]
    fn test_tag_message() {
        let message = Message::new(
            "i want to go marienplatz",
            "FindConnection",
            vec![Entity::new(13, 24, "StationDest", "marienplatz")],
            Some(true),
            Corpus::Chatbot,
        );
        let tagged = tag_message(&message, TokenizerMode::WordPunct);
        assert_eq!(tagged.tokens.len(), 5);
        assert_eq!(tagged.tags.last(), Some(&Tag::Begin("StationDest".into())));
        assert_eq!(tagged.report, TaggingReport::default());
    }
}
