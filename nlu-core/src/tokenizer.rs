//! # Tokenizador Palavra/Pontuação
//!
//! Divide o texto em palavras e sequências de pontuação, preservando a posição de cada
//! token no texto original. As posições são contadas em **caracteres** (não bytes),
//! porque é nesse sistema que os corpora de NLU anotam suas entidades.
//!
//! ## Esquemas de Tokenização
//!
//! - **WordPunct** (padrão): `\w+|[^\w\s]+`, a regra do `WordPunctTokenizer` do NLTK,
//!   usado para gerar os índices de token dos NLU Evaluation Corpora. O `\w` segue a
//!   definição do Python (letras, números e `_`), e não a do crate `regex`, que também
//!   inclui marcas combinantes: "cafe\u{301}" vira "cafe" + "\u{301}" e "x²" fica inteiro.
//! - **UnicodeWords**: fronteiras de palavra do UAX #29, descartando espaços.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nlu_core::tokenizer::{tokenize, span_tokenize};
//!
//! let text = "Upgrading from 11.10 to 12.04";
//!
//! // "Upgrading", "from", "11", ".", "10", "to", "12", ".", "04"
//! let tokens = tokenize(text);
//! assert_eq!(tokens.len(), 9);
//!
//! let spans = span_tokenize(text);
//! assert_eq!((spans[6].start, spans[8].end), (24, 29));
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::span::Span;

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Facebook", ".", "12").
    pub text: String,
    /// Offset inicial em caracteres (inclusivo).
    pub start: usize,
    /// Offset final em caracteres (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Estratégias de tokenização disponíveis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// **Palavra/Pontuação**: sequências alfanuméricas e sequências de pontuação viram
    /// tokens separados (ex: "karl-preis-platz" -> "karl", "-", "preis", "-", "platz").
    #[default]
    WordPunct,
    /// **Palavras Unicode**: segmentação do UAX #29. Mantém "11.10" e "can't" inteiros.
    UnicodeWords,
}

fn word_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}_]+|[^\p{L}\p{N}_\s]+").expect("word/punct pattern is valid"))
}

/// Tokeniza um texto com o modo padrão.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_with_mode(text, TokenizerMode::WordPunct)
}

/// Tokeniza um texto com o modo especificado.
pub fn tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<Token> {
    let pieces: Vec<(usize, &str)> = match mode {
        TokenizerMode::WordPunct => word_punct_regex()
            .find_iter(text)
            .map(|m| (m.start(), m.as_str()))
            .collect(),
        TokenizerMode::UnicodeWords => text
            .split_word_bound_indices()
            .filter(|(_, w)| !w.chars().all(char::is_whitespace))
            .collect(),
    };

    // Converte offsets de byte em offsets de caractere numa única passada
    let mut tokens = Vec::with_capacity(pieces.len());
    let mut byte_cursor = 0;
    let mut char_cursor = 0;
    for (index, (byte_start, piece)) in pieces.into_iter().enumerate() {
        char_cursor += text[byte_cursor..byte_start].chars().count();
        let start = char_cursor;
        let end = start + piece.chars().count();
        tokens.push(Token {
            text: piece.to_string(),
            start,
            end,
            index,
        });
        byte_cursor = byte_start + piece.len();
        char_cursor = end;
    }
    tokens
}

/// Spans `[start, end)` dos tokens, na ordem do texto.
pub fn span_tokenize(text: &str) -> Vec<Span> {
    span_tokenize_with_mode(text, TokenizerMode::WordPunct)
}

pub fn span_tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<Span> {
    tokenize_with_mode(text, mode).iter().map(Token::span).collect()
}

/// Offset em bytes do caractere `char_index` (ou `text.len()` se estiver além do fim).
pub fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Trecho do texto coberto por offsets de caractere. Offsets além do fim são truncados.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = char_to_byte(text, start);
    let end_byte = char_to_byte(text, end.max(start));
    &text[start_byte..end_byte]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_tokenize_word_punct_basic() {
        let tokens = tokenize("Alternative to Facebook Messenger.");
        assert_eq!(texts(&tokens), vec!["Alternative", "to", "Facebook", "Messenger", "."]);
        assert_eq!(tokens[3].span(), Span::new(24, 33));
    }

    #[test]
    fn test_tokenize_hyphenated_compound() {
        let tokens = tokenize("karl-preis-platz");
        assert_eq!(texts(&tokens), vec!["karl", "-", "preis", "-", "platz"]);
    }

    #[test]
    fn test_punctuation_runs_are_one_token() {
        let tokens = tokenize("wait?! ok...");
        assert_eq!(texts(&tokens), vec!["wait", "?!", "ok", "..."]);
    }

    #[test]
    fn test_offsets_count_characters() {
        let text = "add my playlist música libre";
        let spans = span_tokenize(text);
        let last = spans.last().unwrap();
        assert_eq!(char_slice(text, last.start, last.end), "libre");
        assert_eq!(spans[3], Span::new(16, 22));
        assert_eq!(char_slice(text, 16, 22), "música");
    }

    #[test]
    fn test_word_class_matches_python() {
        assert_eq!(texts(&tokenize("cafe\u{301}")), vec!["cafe", "\u{301}"]);
        assert_eq!(texts(&tokenize("x² snake_case")), vec!["x²", "snake_case"]);
    }

    #[test]
    fn test_tokenize_unicode_words() {
        let tokens = tokenize_with_mode("Upgrading from 11.10", TokenizerMode::UnicodeWords);
        assert_eq!(texts(&tokens), vec!["Upgrading", "from", "11.10"]);
    }

    #[test]
    fn test_indices_are_sequential() {
        let tokens = tokenize("i want to go marienplatz");
        assert!(tokens.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn test_empty_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_char_slice_clamps() {
        assert_eq!(char_slice("abc", 1, 10), "bc");
        assert_eq!(char_slice("abc", 5, 10), "");
    }
}
