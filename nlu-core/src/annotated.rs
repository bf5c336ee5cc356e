//! # Sentença Anotada (formato Markdown do Rasa)
//!
//! Renderiza uma mensagem com as entidades inline:
//! `Alternative to [Facebook Messenger](WebService).`
//!
//! Quando o trecho do texto difere do valor anotado, o valor vai junto do tipo:
//! `Problem upgrading [Ubuntu 9.10](UbuntuVersion:Ubuntu 9.10)`.

use serde::{Deserialize, Serialize};

use crate::message::{Entity, Message};
use crate::tokenizer::char_slice;

const BRACKETS: [char; 4] = ['(', ')', '[', ']'];

/// Pré-processamento aplicado antes de renderizar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Remove `(`, `)`, `[` e `]` do texto e dos valores, para não colidir com a
    /// sintaxe de anotação. Os offsets das entidades são recalculados sobre o texto
    /// resultante; a mensagem original não é alterada.
    #[serde(default)]
    pub strip_brackets: bool,
}

/// Remove os colchetes/parênteses e reposiciona as entidades.
fn strip_brackets(message: &Message) -> (String, Vec<Entity>) {
    // new_offset[i] = caracteres mantidos antes da posição i do texto original
    let mut new_offset = Vec::with_capacity(message.text.len() + 1);
    let mut text = String::with_capacity(message.text.len());
    let mut kept = 0;
    for c in message.text.chars() {
        new_offset.push(kept);
        if !BRACKETS.contains(&c) {
            text.push(c);
            kept += 1;
        }
    }
    new_offset.push(kept);

    let remap = |i: usize| new_offset[i.min(new_offset.len() - 1)];
    let entities = message
        .entities
        .iter()
        .map(|e| {
            let value: String = e.value.chars().filter(|c| !BRACKETS.contains(c)).collect();
            Entity::new(remap(e.start), remap(e.end), e.entity_type.clone(), value)
        })
        .collect();
    (text, entities)
}

fn entity_markdown(text: &str, entity: &Entity) -> String {
    let slice = char_slice(text, entity.start, entity.end);
    if slice == entity.value {
        format!("[{}]({})", slice, entity.entity_type)
    } else {
        format!("[{}]({}:{})", slice, entity.entity_type, entity.value)
    }
}

/// Converte a mensagem em uma string com as entidades anotadas.
pub fn render_annotated(message: &Message, options: &RenderOptions) -> String {
    let (text, mut entities) = if options.strip_brackets {
        strip_brackets(message)
    } else {
        (message.text.clone(), message.entities.clone())
    };
    entities.sort_by_key(|e| e.start);

    let mut out = String::with_capacity(text.len() + entities.len() * 16);
    let mut pos = 0;
    for entity in &entities {
        out.push_str(char_slice(&text, pos, entity.start));
        out.push_str(&entity_markdown(&text, entity));
        pos = entity.end;
    }
    out.push_str(char_slice(&text, pos, usize::MAX));
    out
}
