//! # Corpora de NLU Suportados
//!
//! Registro fechado dos corpora conhecidos. Cada [`Corpus`] pertence a uma
//! [`CorpusFamily`], que decide qual normalizador lê os seus arquivos.
//!
//! ## Famílias
//! - **TokenIndex**: NLU Evaluation Corpora (AskUbuntu, Chatbot, WebApplications).
//!   As entidades apontam para índices de token, não de caractere.
//! - **Segments**: SNIPS 2017. Cada exemplo é uma lista de segmentos de texto,
//!   alguns marcados com o tipo da entidade.
//! - **DirectOffset**: Rasa NLU JSON. Offsets já estão em caracteres do texto.
//! - **Mock**: corpus em memória usado nos testes.
//!
//! ## Layout no disco (relativo a `data_dir`)
//!
//! | Corpus          | Caminho                                               |
//! |-----------------|-------------------------------------------------------|
//! | askubuntu       | `askubuntu/original/AskUbuntuCorpus.json`             |
//! | chatbot         | `chatbot/original/ChatbotCorpus.json`                 |
//! | webapplications | `webapplications/original/WebApplicationsCorpus.json` |
//! | snips2017       | `snips2017/original/` (uma pasta por intenção)        |
//! | rasa            | `rasa/original/` (`train.json` e `test.json`)         |

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NluError, Result};
use crate::message::{Entity, Message};
use crate::normalizer;

/// Corpora conhecidos pelo conversor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corpus {
    /// Corpus sintético em memória, sem arquivo no disco.
    Mock,
    AskUbuntu,
    Chatbot,
    WebApplications,
    Snips2017,
    Rasa,
}

/// Formato de origem dos registros de um corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFamily {
    Mock,
    TokenIndex,
    Segments,
    DirectOffset,
}

impl Corpus {
    /// Todos os corpora com arquivos no disco, na ordem de conversão.
    pub const ON_DISK: [Corpus; 5] = [
        Corpus::AskUbuntu,
        Corpus::Chatbot,
        Corpus::WebApplications,
        Corpus::Snips2017,
        Corpus::Rasa,
    ];

    /// Identificador em minúsculas (usado em caminhos e na CLI).
    pub fn name(&self) -> &'static str {
        match self {
            Corpus::Mock => "mock",
            Corpus::AskUbuntu => "askubuntu",
            Corpus::Chatbot => "chatbot",
            Corpus::WebApplications => "webapplications",
            Corpus::Snips2017 => "snips2017",
            Corpus::Rasa => "rasa",
        }
    }

    pub fn family(&self) -> CorpusFamily {
        match self {
            Corpus::Mock => CorpusFamily::Mock,
            Corpus::AskUbuntu | Corpus::Chatbot | Corpus::WebApplications => CorpusFamily::TokenIndex,
            Corpus::Snips2017 => CorpusFamily::Segments,
            Corpus::Rasa => CorpusFamily::DirectOffset,
        }
    }

    /// Caminho do arquivo (ou pasta) original do corpus.
    ///
    /// Chamar para [`Corpus::Mock`] é erro de programação e falha imediatamente.
    pub fn path(&self, data_dir: &Path) -> Result<PathBuf> {
        let relative = match self {
            Corpus::Mock => return Err(NluError::UnsupportedCorpus(self.name().to_string())),
            Corpus::AskUbuntu => Path::new("askubuntu").join("original").join("AskUbuntuCorpus.json"),
            Corpus::Chatbot => Path::new("chatbot").join("original").join("ChatbotCorpus.json"),
            Corpus::WebApplications => Path::new("webapplications")
                .join("original")
                .join("WebApplicationsCorpus.json"),
            Corpus::Snips2017 => Path::new("snips2017").join("original"),
            Corpus::Rasa => Path::new("rasa").join("original"),
        };
        Ok(data_dir.join(relative))
    }
}

impl std::fmt::Display for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Corpus {
    type Err = NluError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Corpus::Mock),
            "askubuntu" => Ok(Corpus::AskUbuntu),
            "chatbot" => Ok(Corpus::Chatbot),
            "webapplications" => Ok(Corpus::WebApplications),
            "snips2017" | "snips" => Ok(Corpus::Snips2017),
            "rasa" => Ok(Corpus::Rasa),
            other => Err(NluError::UnknownCorpus(other.to_string())),
        }
    }
}

/// Opções de leitura dos corpora.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Pasta raiz com um subdiretório por corpus.
    pub data_dir: PathBuf,
    /// Se verdadeiro, o primeiro registro inválido aborta a leitura.
    pub strict: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            strict: false,
        }
    }
}

/// Registro descartado durante a leitura.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub corpus: Corpus,
    /// Arquivo de origem.
    pub source: String,
    /// Posição do registro no arquivo.
    pub index: usize,
    pub reason: String,
}

/// Resultado da leitura de um corpus: mensagens válidas e registros descartados.
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub corpus: Corpus,
    pub messages: Vec<Message>,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadedCorpus {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            messages: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Acrescenta o resultado de um registro, isolando falhas por registro.
    pub(crate) fn push_record(
        &mut self,
        record: Result<Message>,
        source: &Path,
        index: usize,
        strict: bool,
    ) -> Result<()> {
        match record {
            Ok(message) => self.messages.push(message),
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(corpus = %self.corpus, source = %source.display(), index, error = %e, "skipping record");
                self.rejected.push(RejectedRecord {
                    corpus: self.corpus,
                    source: source.display().to_string(),
                    index,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Lê um corpus completo e o converte em mensagens canônicas.
pub fn read_corpus(corpus: Corpus, options: &ReadOptions) -> Result<LoadedCorpus> {
    let loaded = match corpus.family() {
        CorpusFamily::Mock => {
            let mut loaded = LoadedCorpus::new(corpus);
            loaded.messages = mock_messages();
            loaded
        }
        CorpusFamily::TokenIndex => {
            normalizer::read_token_index_corpus(corpus, &corpus.path(&options.data_dir)?, options.strict)?
        }
        CorpusFamily::Segments => {
            normalizer::read_segments_corpus(corpus, &corpus.path(&options.data_dir)?, options.strict)?
        }
        CorpusFamily::DirectOffset => {
            normalizer::read_direct_offset_corpus(corpus, &corpus.path(&options.data_dir)?, options.strict)?
        }
    };

    info!(
        corpus = %corpus,
        messages = loaded.messages.len(),
        rejected = loaded.rejected.len(),
        "corpus loaded"
    );
    Ok(loaded)
}

/// Subpastas de um diretório (uma por intenção no SNIPS), ordenadas por nome.
pub fn get_folders(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Corpus sintético: 20 mensagens "0".."19", intenção `A` abaixo de 10 e `B` no resto,
/// treino abaixo de 15.
pub fn mock_messages() -> Vec<Message> {
    (0..20)
        .map(|x: usize| {
            let intent = if x < 10 { "A" } else { "B" };
            Message::new(x.to_string(), intent, Vec::<Entity>::new(), Some(x < 15), Corpus::Mock)
        })
        .collect()
}
