//! # Normalizadores por Família de Corpus
//!
//! Cada família tem seu próprio JSON; aqui todos viram [`Message`]s com offsets de
//! caractere. Registros são desserializados um a um, para que um exemplo malformado
//! não derrube a leitura do corpus inteiro.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::corpus::{get_folders, Corpus, LoadedCorpus};
use crate::error::{NluError, Result};
use crate::message::{Entity, Message};
use crate::span::Span;
use crate::tokenizer::{char_slice, span_tokenize};

/// Qual borda do token um índice referencia.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

fn read_json(path: &Path) -> Result<Value> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_record<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| NluError::invalid_record(e.to_string()))
}

// ---------------------------------------------------------------------------
// TokenIndex: NLU Evaluation Corpora
// ---------------------------------------------------------------------------

/// Converte um índice de token (como usado pelos NLU Evaluation Corpora) em offset
/// de caractere.
pub fn convert_index(text: &str, token_index: usize, boundary: Boundary) -> Result<usize> {
    let spans = span_tokenize(text);
    let span = spans.get(token_index).ok_or_else(|| NluError::TokenIndexOutOfRange {
        index: token_index,
        len: spans.len(),
        text: text.to_string(),
    })?;
    Ok(match boundary {
        Boundary::Start => span.start,
        Boundary::End => span.end,
    })
}

/// Entidade de um NLU Evaluation Corpus: `start` e `stop` são índices de token
/// (ambos inclusivos).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenIndexEntity {
    pub text: String,
    pub entity: String,
    pub start: usize,
    pub stop: usize,
}

#[derive(Debug, Deserialize)]
struct TokenIndexSentence {
    text: Option<String>,
    intent: Option<String>,
    #[serde(default)]
    entities: Vec<TokenIndexEntity>,
    #[serde(default)]
    training: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TokenIndexFile {
    sentences: Vec<Value>,
}

/// Traduz uma entidade de índices de token para offsets de caractere.
pub fn convert_token_index_entity(text: &str, entity: &TokenIndexEntity) -> Result<Entity> {
    let start = convert_index(text, entity.start, Boundary::Start)?;
    let end = convert_index(text, entity.stop, Boundary::End)?;
    Ok(Entity::new(start, end, entity.entity.clone(), entity.text.clone()))
}

fn convert_token_index_sentence(corpus: Corpus, value: Value) -> Result<Message> {
    let sentence: TokenIndexSentence = parse_record(value)?;
    let text = sentence.text.ok_or_else(|| NluError::MissingField("text".into()))?;
    let intent = sentence.intent.ok_or_else(|| NluError::MissingField("intent".into()))?;
    let entities = sentence
        .entities
        .iter()
        .map(|e| convert_token_index_entity(&text, e))
        .collect::<Result<Vec<_>>>()?;
    Ok(Message::new(text, intent, entities, sentence.training, corpus))
}

/// Lê um arquivo `{"sentences": [...]}` dos NLU Evaluation Corpora.
pub fn read_token_index_corpus(corpus: Corpus, path: &Path, strict: bool) -> Result<LoadedCorpus> {
    let file: TokenIndexFile = serde_json::from_value(read_json(path)?)?;
    let mut loaded = LoadedCorpus::new(corpus);
    for (index, value) in file.sentences.into_iter().enumerate() {
        loaded.push_record(convert_token_index_sentence(corpus, value), path, index, strict)?;
    }
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// Segments: SNIPS 2017
// ---------------------------------------------------------------------------

/// Um segmento de um exemplo do SNIPS. Segmentos com `entity` são entidades.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default)]
    pub entity: Option<String>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), entity: None }
    }

    pub fn entity(text: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity: Some(entity.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SegmentQuery {
    data: Vec<Segment>,
}

/// Texto completo: concatenação dos segmentos na ordem.
pub fn segments_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// Span de cada segmento, acumulando o comprimento (em caracteres) dos anteriores.
pub fn segment_spans(segments: &[Segment]) -> Vec<Span> {
    let mut offset = 0;
    segments
        .iter()
        .map(|s| {
            let start = offset;
            offset += s.text.chars().count();
            Span::new(start, offset)
        })
        .collect()
}

/// Entidades dos segmentos marcados; os demais só avançam o offset.
pub fn segment_entities(segments: &[Segment]) -> Vec<Entity> {
    segment_spans(segments)
        .into_iter()
        .zip(segments)
        .filter_map(|(span, s)| {
            s.entity
                .as_ref()
                .map(|entity| Entity::new(span.start, span.end, entity.clone(), s.text.clone()))
        })
        .collect()
}

pub fn segments_message(corpus: Corpus, intent: &str, segments: &[Segment], training: bool) -> Message {
    Message::new(
        segments_text(segments),
        intent,
        segment_entities(segments),
        Some(training),
        corpus,
    )
}

/// Lê um arquivo `{Intent: [{"data": [...]}, ...]}` do SNIPS.
pub fn read_segments_file(
    loaded: &mut LoadedCorpus,
    path: &Path,
    intent: &str,
    training: bool,
    strict: bool,
) -> Result<()> {
    let mut file: HashMap<String, Vec<Value>> = serde_json::from_value(read_json(path)?)?;
    let queries = file
        .remove(intent)
        .ok_or_else(|| NluError::MissingField(intent.to_string()))?;
    debug!(path = %path.display(), queries = queries.len(), "reading segments file");

    let corpus = loaded.corpus;
    for (index, value) in queries.into_iter().enumerate() {
        let message = parse_record::<SegmentQuery>(value)
            .map(|q| segments_message(corpus, intent, &q.data, training));
        loaded.push_record(message, path, index, strict)?;
    }
    Ok(())
}

/// Lê o SNIPS 2017: uma pasta por intenção com `train_{Intent}.json` e
/// `validate_{Intent}.json`.
pub fn read_segments_corpus(corpus: Corpus, dir: &Path, strict: bool) -> Result<LoadedCorpus> {
    let mut loaded = LoadedCorpus::new(corpus);
    for folder in get_folders(dir)? {
        let intent = match folder.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        read_segments_file(&mut loaded, &folder.join(format!("train_{}.json", intent)), &intent, true, strict)?;
        read_segments_file(&mut loaded, &folder.join(format!("validate_{}.json", intent)), &intent, false, strict)?;
    }
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// DirectOffset: Rasa NLU JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RasaEntity {
    start: usize,
    end: usize,
    entity: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RasaExample {
    text: Option<String>,
    intent: Option<String>,
    #[serde(default)]
    entities: Vec<RasaEntity>,
}

#[derive(Debug, Deserialize)]
struct RasaData {
    #[serde(default)]
    common_examples: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RasaFile {
    rasa_nlu_data: RasaData,
}

fn convert_rasa_example(corpus: Corpus, value: Value, training: bool) -> Result<Message> {
    let example: RasaExample = parse_record(value)?;
    let text = example.text.ok_or_else(|| NluError::MissingField("text".into()))?;
    let intent = example.intent.ok_or_else(|| NluError::MissingField("intent".into()))?;
    let entities = example
        .entities
        .into_iter()
        .map(|e| {
            // Sem `value`, o trecho anotado do texto é o valor
            let value = e
                .value
                .unwrap_or_else(|| char_slice(&text, e.start, e.end).to_string());
            Entity::new(e.start, e.end, e.entity, value)
        })
        .collect();
    Ok(Message::new(text, intent, entities, Some(training), corpus))
}

/// Lê `train.json` (obrigatório) e `test.json` (opcional) no formato Rasa NLU JSON.
pub fn read_direct_offset_corpus(corpus: Corpus, dir: &Path, strict: bool) -> Result<LoadedCorpus> {
    let mut loaded = LoadedCorpus::new(corpus);
    for (file_name, training) in [("train.json", true), ("test.json", false)] {
        let path = dir.join(file_name);
        if !training && !path.exists() {
            continue;
        }
        let file: RasaFile = serde_json::from_value(read_json(&path)?)?;
        for (index, value) in file.rasa_nlu_data.common_examples.into_iter().enumerate() {
            loaded.push_record(convert_rasa_example(corpus, value, training), &path, index, strict)?;
        }
    }
    Ok(loaded)
}
