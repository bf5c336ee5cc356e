//! # Erros do conversor
//!
//! Um único enum cobre leitura de corpora, tradução de offsets, configuração e divisão
//! estratificada. Erros de registro (um exemplo malformado) são isolados pelo leitor do
//! corpus; os demais sobem com `?` até o chamador.

use thiserror::Error;

/// Resultado padrão do crate.
pub type Result<T> = std::result::Result<T, NluError>;

#[derive(Error, Debug)]
pub enum NluError {
    /// O corpus existe apenas em memória (ex: `mock`) e não possui arquivo no disco.
    #[error("corpus `{0}` has no file on disk")]
    UnsupportedCorpus(String),

    #[error("unknown corpus `{0}`")]
    UnknownCorpus(String),

    #[error("unknown task `{0}`")]
    UnknownTask(String),

    /// Índice de token (NLU Evaluation Corpora) fora da lista de tokens do texto.
    #[error("token index {index} out of range ({len} tokens) in {text:?}")]
    TokenIndexOutOfRange {
        index: usize,
        len: usize,
        text: String,
    },

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NluError {
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        NluError::InvalidRecord(msg.into())
    }

    pub fn invalid_split(msg: impl Into<String>) -> Self {
        NluError::InvalidSplit(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        NluError::Config(msg.into())
    }
}
