//! # nlu-convert
//!
//! Linha de comando do conversor. Lê os corpora de `--data-dir` e grava os arquivos
//! de treino em `--output-dir`.
//!
//! ```text
//! nlu-convert convert all
//! nlu-convert convert chatbot --task joint
//! nlu-convert tsv snips2017 --strip-brackets
//! nlu-convert split askubuntu --triple
//! ```
//!
//! Logs vão para stderr (`RUST_LOG` controla o nível, padrão `info`). Com `--events`
//! cada evento da conversão é impresso como JSON em stdout.

use std::path::PathBuf;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use nlu_core::{ConversionEvent, ConversionPlan, ConvertConfig, Converter, Corpus, SplitKind, Task};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlu-convert", version, about = "Converte corpora de NLU em arquivos de treino")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Arquivo TOML de configuração (padrão: ./nlu-convert.toml, se existir)
    #[arg(long, global = true, env = "NLU_CONVERT_CONFIG")]
    config: Option<PathBuf>,

    /// Pasta com os corpora originais
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pasta de saída
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Aborta no primeiro registro inválido
    #[arg(long, global = true)]
    strict: bool,

    /// Remove ( ) [ ] do texto antes de anotar
    #[arg(long, global = true)]
    strip_brackets: bool,

    /// Imprime os eventos da conversão como JSON (um por linha)
    #[arg(long, global = true)]
    events: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Gera os arquivos "token TAG" (e, sem --task, também TSV e divisões)
    Convert {
        /// Nome do corpus ou `all`
        corpus: String,
        /// Apenas esta tarefa: ner, intent ou joint
        #[arg(long)]
        task: Option<String>,
    },
    /// Gera o TSV de sentenças anotadas
    Tsv { corpus: String },
    /// Gera a divisão estratificada (75/25, ou 60/20/20 com --triple)
    Split {
        corpus: String,
        #[arg(long)]
        triple: bool,
    },
}

impl Cli {
    fn load_config(&self) -> nlu_core::Result<ConvertConfig> {
        let mut config = ConvertConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.strict |= self.strict;
        config.strip_brackets |= self.strip_brackets;
        Ok(config)
    }
}

fn parse_corpora(name: &str) -> nlu_core::Result<Vec<Corpus>> {
    if name.eq_ignore_ascii_case("all") {
        Ok(Corpus::ON_DISK.to_vec())
    } else {
        Ok(vec![name.parse()?])
    }
}

fn run(converter: &mut Converter, corpus: Corpus, plan: &ConversionPlan, print_events: bool) -> Result<(), String> {
    let (tx, rx) = mpsc::channel();
    converter.convert_streaming(corpus, plan, tx);

    let mut failure = None;
    while let Ok(event) = rx.recv() {
        if print_events {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "failed to serialize event"),
            }
        }
        match event {
            ConversionEvent::Done { processing_ms, .. } => {
                info!(corpus = %corpus, processing_ms, "✅ corpus converted");
            }
            ConversionEvent::Error { message, .. } => failure = Some(message),
            _ => {}
        }
    }
    failure.map_or(Ok(()), |message| Err(format!("{corpus}: {message}")))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let (corpora, plan) = match &cli.command {
        Command::Convert { corpus, task } => {
            let plan = match task {
                Some(task) => ConversionPlan::tasks(vec![task.parse::<Task>()?]),
                None => ConversionPlan::from_config(&config),
            };
            (parse_corpora(corpus)?, plan)
        }
        Command::Tsv { corpus } => (parse_corpora(corpus)?, ConversionPlan::tsv_only()),
        Command::Split { corpus, triple } => {
            let kind = if *triple { SplitKind::Triple } else { SplitKind::Double };
            (parse_corpora(corpus)?, ConversionPlan::splits(vec![kind]))
        }
    };

    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        corpora = corpora.len(),
        "starting conversion"
    );
    let mut converter = Converter::new(config);

    let mut failures = Vec::new();
    for corpus in corpora {
        if let Err(message) = run(&mut converter, corpus, &plan, cli.events) {
            failures.push(message);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("\n").into())
    }
}
