//! # nlu-core: Conversor de Corpora de NLU
//!
//! Este crate lê corpora de intenção/entidade em formatos heterogêneos e os converte
//! para formatos de treino: "token TAG" (BIO), TSV de sentenças anotadas e divisões
//! estratificadas de treino/validação/teste.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: arquivos JSON de cada corpus ([`corpus`]).
//! 2.  **Normalização** ([`normalizer`]): cada registro vira uma [`Message`] canônica,
//!     com entidades em offsets de caractere.
//! 3.  **Tokenização** ([`tokenizer`]): spans de palavra/pontuação sobre o texto.
//! 4.  **Fusão de Spans** ([`span`]): spans dentro de uma entidade viram um só.
//! 5.  **Tagging** ([`tagger`]): tags BIO a partir do valor de cada entidade.
//! 6.  **Saída** ([`formatter`], [`annotated`], [`split`]): arquivos por tarefa, TSV e
//!     divisões.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nlu_core::{message_lines, Corpus, Entity, Message, Task};
//!
//! let message = Message::new(
//!     "from garching to studentenstadt",
//!     "FindConnection",
//!     vec![
//!         Entity::new(5, 13, "StationStart", "garching"),
//!         Entity::new(17, 31, "StationDest", "studentenstadt"),
//!     ],
//!     Some(true),
//!     Corpus::Chatbot,
//! );
//!
//! let lines = message_lines(Task::Ner, &message);
//! assert_eq!(lines, "from O\ngarching B-StationStart\nto O\nstudentenstadt B-StationDest");
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador que conecta leitura, formatos e divisões.
//! - [`span`] e [`tagger`]: O núcleo do alinhamento entidade/token.
//! - [`config`]: Configuração TOML do conversor.

pub mod annotated;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod formatter;
pub mod message;
pub mod normalizer;
pub mod pipeline;
pub mod span;
pub mod split;
pub mod tagger;
pub mod tokenizer;

pub use annotated::{render_annotated, RenderOptions};
pub use cache::CorpusCache;
pub use config::ConvertConfig;
pub use corpus::{read_corpus, Corpus, CorpusFamily, LoadedCorpus, ReadOptions, RejectedRecord};
pub use error::{NluError, Result};
pub use formatter::{message_lines, messages_lines, FormatReport, Task};
pub use message::{Entity, Message};
pub use pipeline::{ConversionEvent, ConversionPlan, ConversionSummary, Converter};
pub use span::{merge_spans, Span};
pub use split::{double_split, stratified_split, triple_split, Split, SplitKind};
pub use tagger::{annotate_tokens, Tag};
pub use tokenizer::{span_tokenize, Token, TokenizerMode};
