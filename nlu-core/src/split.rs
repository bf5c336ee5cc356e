//! # Divisão Estratificada
//!
//! Divide as sentenças de um corpus em treino/teste (75/25) ou treino/validação/teste
//! (60/20/20), mantendo a proporção de cada intenção em todas as partes.
//!
//! ## Alocação
//!
//! `n_test = ceil(test_size · n)`. Cada rótulo recebe `n_test · freq / n` vagas no
//! teste (parte inteira); as vagas restantes vão para os rótulos com maior parte
//! fracionária, empates resolvidos pela ordem dos rótulos. Dentro de cada rótulo a
//! escolha é aleatória, com semente fixa, e as partes são embaralhadas no fim.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NluError, Result};
use crate::formatter::tsv_field;

/// Semente padrão das divisões.
pub const DEFAULT_SEED: u64 = 42;

/// Tipo de divisão gravada pelo conversor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    /// Treino/teste 75/25.
    Double,
    /// Treino/validação/teste 60/20/20.
    Triple,
}

impl SplitKind {
    pub const ALL: [SplitKind; 2] = [SplitKind::Double, SplitKind::Triple];

    pub fn name(&self) -> &'static str {
        match self {
            SplitKind::Double => "double",
            SplitKind::Triple => "triple",
        }
    }
}

impl std::fmt::Display for SplitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Uma parte da divisão: itens e seus rótulos, na mesma ordem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<T> {
    pub items: Vec<T>,
    pub labels: Vec<String>,
}

impl<T> Split<T> {
    fn with_capacity(n: usize) -> Self {
        Self {
            items: Vec::with_capacity(n),
            labels: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pares (item, rótulo).
    pub fn iter(&self) -> impl Iterator<Item = (&T, &str)> {
        self.items.iter().zip(self.labels.iter().map(String::as_str))
    }
}

/// Vagas de teste por rótulo (maiores restos, empates pela ordem do rótulo).
fn allocate(groups: &BTreeMap<&str, Vec<usize>>, n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = groups
        .values()
        .map(|idx| n_test as f64 * idx.len() as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();

    let assigned: usize = quotas.iter().sum();
    let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
    // sort estável: rótulos com o mesmo resto mantêm a ordem alfabética
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &i in by_remainder.iter().cycle().take(n_test.saturating_sub(assigned)) {
        quotas[i] += 1;
    }
    quotas
}

/// Divide `items` em (treino, teste) preservando a proporção de cada rótulo.
pub fn stratified_split<T: Clone>(
    items: &[T],
    labels: &[String],
    test_size: f64,
    seed: u64,
) -> Result<(Split<T>, Split<T>)> {
    if items.len() != labels.len() {
        return Err(NluError::invalid_split(format!(
            "{} items but {} labels",
            items.len(),
            labels.len()
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(NluError::invalid_split(format!("test_size must be in (0, 1), got {test_size}")));
    }

    let n = items.len();
    // Tolerância para produtos como 0.2 * 100 que passam do inteiro por arredondamento
    let n_test = (test_size * n as f64 - 1e-9).ceil().max(0.0) as usize;
    if n_test == 0 || n_test >= n {
        return Err(NluError::invalid_split(format!(
            "cannot split {n} items with test_size {test_size}"
        )));
    }

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(label.as_str()).or_default().push(i);
    }
    let quotas = allocate(&groups, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n - n_test);
    let mut test_idx = Vec::with_capacity(n_test);
    for ((label, indices), quota) in groups.iter().zip(quotas) {
        let mut indices = indices.clone();
        indices.shuffle(&mut rng);
        debug!(label, total = indices.len(), test = quota, "label allocation");
        test_idx.extend_from_slice(&indices[..quota]);
        train_idx.extend_from_slice(&indices[quota..]);
    }
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    let collect = |idx: &[usize]| {
        let mut split = Split::with_capacity(idx.len());
        for &i in idx {
            split.items.push(items[i].clone());
            split.labels.push(labels[i].clone());
        }
        split
    };
    Ok((collect(&train_idx), collect(&test_idx)))
}

/// Treino/teste 75/25.
pub fn double_split<T: Clone>(items: &[T], labels: &[String], seed: u64) -> Result<(Split<T>, Split<T>)> {
    stratified_split(items, labels, 0.25, seed)
}

/// Treino/validação/teste 60/20/20: 80/20 e depois 75/25 sobre os 80%.
pub fn triple_split<T: Clone>(
    items: &[T],
    labels: &[String],
    seed: u64,
) -> Result<(Split<T>, Split<T>, Split<T>)> {
    let (rest, test) = stratified_split(items, labels, 0.2, seed)?;
    let (train, dev) = stratified_split(&rest.items, &rest.labels, 0.25, seed)?;
    Ok((train, dev, test))
}

fn write_split_file(path: &Path, split: &Split<String>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (text, label) in split.iter() {
        writeln!(out, "{}\t{}", tsv_field(text), tsv_field(label))?;
    }
    out.flush()?;
    Ok(())
}

/// Grava `train.tsv`, `dev.tsv` (se houver) e `test.tsv` em `dir`, sem cabeçalho.
pub fn write_splits(
    dir: &Path,
    train: &Split<String>,
    dev: Option<&Split<String>>,
    test: &Split<String>,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_split_file(&dir.join("train.tsv"), train)?;
    if let Some(dev) = dev {
        write_split_file(&dir.join("dev.tsv"), dev)?;
    }
    write_split_file(&dir.join("test.tsv"), test)?;

    info!(
        dir = %dir.display(),
        train = train.len(),
        dev = dev.map_or(0, Split::len),
        test = test.len(),
        "splits written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dataset(a: usize, b: usize) -> (Vec<String>, Vec<String>) {
        let items = (0..a + b).map(|i| format!("sentence {i}")).collect();
        let labels = (0..a + b)
            .map(|i| if i < a { "A" } else { "B" }.to_string())
            .collect();
        (items, labels)
    }

    fn count(split: &Split<String>, label: &str) -> usize {
        split.labels.iter().filter(|l| *l == label).count()
    }

    #[test]
    fn test_double_split_is_stratified() {
        let (items, labels) = dataset(70, 30);
        let (train, test) = double_split(&items, &labels, DEFAULT_SEED).unwrap();

        assert_eq!(test.len(), 25);
        assert_eq!(train.len() + test.len(), 100);
        // 17.5 e 7.5: o empate no resto vai para o primeiro rótulo
        assert_eq!(count(&test, "A"), 18);
        assert_eq!(count(&test, "B"), 7);

        let train_set: HashSet<&String> = train.items.iter().collect();
        assert!(test.items.iter().all(|t| !train_set.contains(t)));
    }

    #[test]
    fn test_triple_split_proportions() {
        let (items, labels) = dataset(50, 50);
        let (train, dev, test) = triple_split(&items, &labels, DEFAULT_SEED).unwrap();
        assert_eq!((train.len(), dev.len(), test.len()), (60, 20, 20));
        assert_eq!(count(&dev, "A"), 10);
        assert_eq!(count(&test, "B"), 10);
    }

    #[test]
    fn test_split_is_deterministic() {
        let (items, labels) = dataset(30, 12);
        let first = double_split(&items, &labels, 7).unwrap();
        let second = double_split(&items, &labels, 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_labels_follow_items() {
        let (items, labels) = dataset(8, 4);
        let (train, test) = double_split(&items, &labels, DEFAULT_SEED).unwrap();
        for (item, label) in train.iter().chain(test.iter()) {
            let i: usize = item.trim_start_matches("sentence ").parse().unwrap();
            assert_eq!(label, if i < 8 { "A" } else { "B" });
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let (items, labels) = dataset(3, 3);
        assert!(matches!(
            stratified_split(&items, &labels[..5], 0.25, 1),
            Err(NluError::InvalidSplit(_))
        ));
        assert!(stratified_split(&items, &labels, 1.5, 1).is_err());
        assert!(stratified_split::<String>(&[], &[], 0.25, 1).is_err());
    }

    #[test]
    fn test_write_splits() {
        let dir = tempfile::tempdir().unwrap();
        let (items, labels) = dataset(6, 2);
        let (train, test) = double_split(&items, &labels, DEFAULT_SEED).unwrap();
        write_splits(dir.path(), &train, None, &test).unwrap();

        let content = std::fs::read_to_string(dir.path().join("test.tsv")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().all(|l| l.starts_with("sentence ") && l.contains('\t')));
        assert!(!dir.path().join("dev.tsv").exists());
    }
}
