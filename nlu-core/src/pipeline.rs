//! # Pipeline de Conversão: Orquestrador com Eventos Observáveis
//!
//! Coordena leitura (com cache), formato NER por tarefa, TSV anotado e divisões
//! estratificadas de um corpus, emitindo um evento por etapa via `mpsc`.
//!
//! ## Saída (relativa a `output_dir`)
//!
//! ```text
//! {corpus}/{task}/train.txt
//! {corpus}/{task}/test.txt
//! {corpus}/{corpus}.tsv
//! {corpus}/split/double/{train,test}.tsv
//! {corpus}/split/triple/{train,dev,test}.tsv
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::CorpusCache;
use crate::config::ConvertConfig;
use crate::corpus::{Corpus, LoadedCorpus, RejectedRecord};
use crate::error::Result;
use crate::formatter::{to_tsv, write_ner, FormatReport, Task};
use crate::split::{double_split, triple_split, write_splits, SplitKind};

/// Eventos emitidos durante a conversão de um corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversionEvent {
    /// Corpus lido (ou obtido do cache).
    CorpusLoaded {
        corpus: Corpus,
        messages: usize,
        rejected: usize,
    },
    /// Um registro descartado pelo normalizador.
    RecordRejected { record: RejectedRecord },
    /// `train.txt` e `test.txt` de uma tarefa gravados.
    TaskWritten {
        corpus: Corpus,
        task: Task,
        dir: PathBuf,
        report: FormatReport,
    },
    TsvWritten {
        corpus: Corpus,
        path: PathBuf,
        rows: usize,
    },
    SplitWritten {
        corpus: Corpus,
        kind: SplitKind,
        dir: PathBuf,
        train: usize,
        dev: usize,
        test: usize,
    },
    Done { corpus: Corpus, processing_ms: u64 },
    /// Falha irrecuperável; nenhum evento segue este.
    Error { corpus: Corpus, message: String },
}

/// Etapas executadas para um corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub tasks: Vec<Task>,
    pub tsv: bool,
    pub splits: Vec<SplitKind>,
}

impl ConversionPlan {
    /// Todas as etapas habilitadas na configuração.
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self {
            tasks: config.tasks.clone(),
            tsv: true,
            splits: config.splits.clone(),
        }
    }

    pub fn tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            tsv: false,
            splits: Vec::new(),
        }
    }

    pub fn tsv_only() -> Self {
        Self {
            tasks: Vec::new(),
            tsv: true,
            splits: Vec::new(),
        }
    }

    pub fn splits(splits: Vec<SplitKind>) -> Self {
        Self {
            tasks: Vec::new(),
            tsv: false,
            splits,
        }
    }
}

/// Resultado consolidado da conversão de um corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub corpus: Option<Corpus>,
    pub messages: usize,
    pub rejected: Vec<RejectedRecord>,
    pub tasks: Vec<(Task, FormatReport)>,
    pub tsv_rows: Option<usize>,
    pub splits: Vec<SplitKind>,
    pub processing_ms: u64,
}

impl ConversionSummary {
    fn record(&mut self, event: ConversionEvent) {
        match event {
            ConversionEvent::CorpusLoaded { corpus, messages, .. } => {
                self.corpus = Some(corpus);
                self.messages = messages;
            }
            ConversionEvent::RecordRejected { record } => self.rejected.push(record),
            ConversionEvent::TaskWritten { task, report, .. } => self.tasks.push((task, report)),
            ConversionEvent::TsvWritten { rows, .. } => self.tsv_rows = Some(rows),
            ConversionEvent::SplitWritten { kind, .. } => self.splits.push(kind),
            ConversionEvent::Done { processing_ms, .. } => self.processing_ms = processing_ms,
            ConversionEvent::Error { .. } => {}
        }
    }
}

/// O conversor de corpora.
///
/// # Modos de Uso
/// - **Sync**: [`Converter::convert`] devolve um [`ConversionSummary`].
/// - **Streaming**: [`Converter::convert_streaming`] empurra [`ConversionEvent`]s pelo
///   canal, terminando com `Done` ou `Error`.
pub struct Converter {
    config: ConvertConfig,
    cache: CorpusCache,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        let cache = CorpusCache::new(config.read_options());
        Self { config, cache }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Pasta de saída de um corpus.
    pub fn corpus_dir(&self, corpus: Corpus) -> PathBuf {
        self.config.output_dir.join(corpus.name())
    }

    /// Converte um corpus com todas as etapas da configuração.
    pub fn convert(&mut self, corpus: Corpus) -> Result<ConversionSummary> {
        let plan = ConversionPlan::from_config(&self.config);
        self.convert_with(corpus, &plan)
    }

    /// Converte todos os corpora do disco, na ordem de [`Corpus::ON_DISK`].
    pub fn convert_all(&mut self) -> Result<Vec<ConversionSummary>> {
        Corpus::ON_DISK.iter().map(|&c| self.convert(c)).collect()
    }

    /// Executa um plano de forma síncrona e consolida os eventos.
    pub fn convert_with(&mut self, corpus: Corpus, plan: &ConversionPlan) -> Result<ConversionSummary> {
        let (tx, rx) = mpsc::channel();
        self.run(corpus, plan, &tx)?;
        drop(tx);

        let mut summary = ConversionSummary::default();
        while let Ok(event) = rx.recv() {
            summary.record(event);
        }
        Ok(summary)
    }

    /// Executa um plano enviando eventos de progresso. Erros viram `Error`.
    pub fn convert_streaming(&mut self, corpus: Corpus, plan: &ConversionPlan, tx: mpsc::Sender<ConversionEvent>) {
        if let Err(e) = self.run(corpus, plan, &tx) {
            error!(corpus = %corpus, error = %e, "conversion failed");
            let _ = tx.send(ConversionEvent::Error {
                corpus,
                message: e.to_string(),
            });
        }
    }

    fn run(&mut self, corpus: Corpus, plan: &ConversionPlan, tx: &mpsc::Sender<ConversionEvent>) -> Result<()> {
        let start = Instant::now();
        let out_dir = self.corpus_dir(corpus);
        let config = &self.config;
        let loaded = self.cache.get_or_load(corpus)?;

        // === Passo 1: Leitura ===
        let _ = tx.send(ConversionEvent::CorpusLoaded {
            corpus,
            messages: loaded.messages.len(),
            rejected: loaded.rejected.len(),
        });
        for record in &loaded.rejected {
            let _ = tx.send(ConversionEvent::RecordRejected { record: record.clone() });
        }

        // === Passo 2: Formato NER ===
        for &task in &plan.tasks {
            let dir = out_dir.join(task.name());
            let report = write_ner(task, &loaded.messages, &dir, config.tokenizer)?;
            let _ = tx.send(ConversionEvent::TaskWritten { corpus, task, dir, report });
        }

        // === Passo 3: TSV anotado ===
        if plan.tsv {
            let path = out_dir.join(format!("{}.tsv", corpus.name()));
            let rows = to_tsv(&loaded.messages, &config.render_options(), &path)?;
            let _ = tx.send(ConversionEvent::TsvWritten { corpus, path, rows });
        }

        // === Passo 4: Divisões ===
        for &kind in &plan.splits {
            let dir = out_dir.join("split").join(kind.name());
            let event = write_split_kind(loaded, kind, &dir, config.seed)?;
            let _ = tx.send(event);
        }

        let processing_ms = start.elapsed().as_millis() as u64;
        info!(corpus = %corpus, processing_ms, "conversion done");
        let _ = tx.send(ConversionEvent::Done { corpus, processing_ms });
        Ok(())
    }
}

fn write_split_kind(loaded: &LoadedCorpus, kind: SplitKind, dir: &Path, seed: u64) -> Result<ConversionEvent> {
    let texts: Vec<String> = loaded.messages.iter().map(|m| m.text.clone()).collect();
    let intents: Vec<String> = loaded.messages.iter().map(|m| m.intent.clone()).collect();

    let (train, dev, test) = match kind {
        SplitKind::Double => {
            let (train, test) = double_split(&texts, &intents, seed)?;
            (train, None, test)
        }
        SplitKind::Triple => {
            let (train, dev, test) = triple_split(&texts, &intents, seed)?;
            (train, Some(dev), test)
        }
    };
    write_splits(dir, &train, dev.as_ref(), &test)?;

    Ok(ConversionEvent::SplitWritten {
        corpus: loaded.corpus,
        kind,
        dir: dir.to_path_buf(),
        train: train.len(),
        dev: dev.as_ref().map_or(0, |d| d.len()),
        test: test.len(),
    })
}
