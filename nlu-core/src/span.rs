//! # Fusão de Spans
//!
//! O tokenizador e a anotação do corpus segmentam o texto de formas independentes.
//! Uma entidade como "Facebook Messenger" cobre dois spans do tokenizador; aqui eles
//! viram um único span, para que o tagger trate a entidade como uma unidade.
//!
//! A fusão olha apenas para as **bordas** dos spans (início/fim das entidades), nunca
//! para o texto.
//!
//! ## Exemplo
//! Spans `(0,1) (1,2) (2,3) (3,4) (4,5) (5,6) (6,7)` com entidades `[1,3)` e `[3,6)`
//! resultam em `(0,1) (1,3) (3,6) (6,7)`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::message::Entity;

/// Intervalo semiaberto `[start, end)` de caracteres de um texto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Offset inicial em caracteres (inclusivo).
    pub start: usize,
    /// Offset final em caracteres (exclusivo).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<(usize, usize)> for Span {
    fn from((start, end): (usize, usize)) -> Self {
        Span { start, end }
    }
}

/// Une os spans cobertos por uma mesma entidade.
///
/// Máquina de estados com um início pendente (`merge_start`) e um flag "dentro de
/// entidade":
/// 1. Se o span começa onde alguma entidade começa, abre uma fusão.
/// 2. Se o span termina onde termina uma entidade que começa em `merge_start`, fecha a
///    fusão e emite `(merge_start, span.end)`. Avaliado mesmo quando (1) disparou no
///    mesmo passo, o que cobre entidades de um único span.
/// 3. Fora de entidade, o span sai inalterado; dentro, é absorvido.
///
/// Bordas desalinhadas não são erro. Um fim de outra entidade nunca fecha a fusão
/// aberta: os spans absorvidos e o span atual saem um a um. Um fim sem fusão aberta
/// emite o próprio span, e uma fusão que nunca fecha também devolve os spans
/// absorvidos, sem perder texto.
pub fn merge_spans(spans: &[Span], entities: &[Entity]) -> Vec<Span> {
    let mut ends_by_start: HashMap<usize, HashSet<usize>> = HashMap::new();
    for e in entities {
        ends_by_start.entry(e.start).or_default().insert(e.end);
    }
    let ends: HashSet<usize> = entities.iter().map(|e| e.end).collect();

    let mut merged = Vec::with_capacity(spans.len());
    let mut merge_start = 0;
    let mut inside = false;
    // Spans absorbidos da fusão aberta, devolvidos caso ela nunca feche
    let mut pending: Vec<Span> = Vec::new();

    for span in spans {
        let start_match = ends_by_start.contains_key(&span.start);
        let end_match = ends.contains(&span.end);

        if start_match {
            // Uma fusão anterior sem fim é abandonada
            merged.append(&mut pending);
            merge_start = span.start;
            inside = true;
        }

        if end_match {
            let closes = inside
                && ends_by_start
                    .get(&merge_start)
                    .map_or(false, |own| own.contains(&span.end));
            if closes {
                merged.push(Span::new(merge_start, span.end));
                pending.clear();
            } else {
                // Fim de outra entidade: a fusão aberta é abandonada
                merged.append(&mut pending);
                merged.push(*span);
            }
            inside = false;
        } else if inside {
            pending.push(*span);
        } else {
            merged.push(*span);
        }
    }

    merged.append(&mut pending);
    merged
}
