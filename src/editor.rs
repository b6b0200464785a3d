use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

use crate::focus::{ActivePanel, FocusEvent, Panel, PanelHandle};

// A single block of the note document, as exchanged with the frontend editor.
// Fields the actions don't read (props, styled inline content, ...) ride
// along in `extra` so a round trip through an action keeps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_kind() -> String {
    "paragraph".to_string()
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Self {
            id: new_block_id(),
            kind: default_kind(),
            text: Some(text.to_string()),
            children: None,
            extra: Map::new(),
        }
    }

    /// Text of the block with inline styling dropped.
    pub fn plain_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        match self.extra.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(runs)) => runs
                .iter()
                .filter_map(|run| run.get("text").and_then(Value::as_str))
                .collect(),
            _ => String::new(),
        }
    }

    // Rewrites the text. Inline content collapses to a single run that
    // keeps the styles of the first run.
    fn set_plain_text(&mut self, text: &str) {
        if self.text.is_some() || !self.extra.contains_key("content") {
            self.text = Some(text.to_string());
            return;
        }
        let styles = match self.extra.get("content") {
            Some(Value::Array(runs)) => runs
                .first()
                .and_then(|run| run.get("styles"))
                .cloned()
                .unwrap_or_else(|| json!({})),
            _ => json!({}),
        };
        self.extra.insert(
            "content".to_string(),
            json!([{ "type": "text", "text": text, "styles": styles }]),
        );
    }

    // Deep copy with fresh ids all the way down
    fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.refresh_ids();
        copy
    }

    fn refresh_ids(&mut self) {
        self.id = new_block_id();
        for child in self.children.iter_mut().flatten() {
            child.refresh_ids();
        }
    }

    // Sibling produced by a split: same type and props, no children
    fn with_text(&self, text: &str) -> Self {
        let mut piece = Self {
            id: new_block_id(),
            kind: self.kind.clone(),
            text: self.text.clone(),
            children: self.children.as_ref().map(|_| Vec::new()),
            extra: self.extra.clone(),
        };
        piece.set_plain_text(text);
        piece
    }
}

pub fn new_block_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("block '{0}' not found")]
    BlockNotFound(String),
}

/// Mutation surface of the block editor's document model.
pub trait BlockDocument {
    fn blocks(&self) -> &[Block];
    fn get_block(&self, id: &str) -> Option<&Block>;
    fn insert_after(&mut self, id: &str, blocks: Vec<Block>) -> Result<(), EditorError>;
    fn remove(&mut self, id: &str) -> Result<Block, EditorError>;
    fn replace(&mut self, id: &str, blocks: Vec<Block>) -> Result<(), EditorError>;
    fn replace_all(&mut self, blocks: Vec<Block>);
}

/// Flat, ordered block list. The editor hands us a snapshot of its
/// top-level blocks and takes the mutated list back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockTree {
    blocks: Vec<Block>,
}

impl BlockTree {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    fn position(&self, id: &str) -> Result<usize, EditorError> {
        self.blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| EditorError::BlockNotFound(id.to_string()))
    }
}

impl BlockDocument for BlockTree {
    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn get_block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn insert_after(&mut self, id: &str, blocks: Vec<Block>) -> Result<(), EditorError> {
        let pos = self.position(id)?;
        self.blocks.splice(pos + 1..pos + 1, blocks);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<Block, EditorError> {
        let pos = self.position(id)?;
        Ok(self.blocks.remove(pos))
    }

    fn replace(&mut self, id: &str, blocks: Vec<Block>) -> Result<(), EditorError> {
        let pos = self.position(id)?;
        self.blocks.splice(pos..=pos, blocks);
        Ok(())
    }

    fn replace_all(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "blockId", rename_all = "camelCase")]
pub enum BlockAction {
    Duplicate(String),
    Remove(String),
    SplitSentences(String),
    MergeAll,
}

fn sentence_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence regex"))
}

/// Split text after `.`, `!` or `?` followed by whitespace. The
/// punctuation stays with its sentence; the whitespace is dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in sentence_break().find_iter(text) {
        // punctuation is a single ASCII byte
        let end = m.start() + 1;
        sentences.push(text[start..end].to_string());
        start = m.end();
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    sentences.retain(|s| !s.trim().is_empty());
    sentences
}

pub fn apply_action<D: BlockDocument>(doc: &mut D, action: &BlockAction) -> Result<(), EditorError> {
    match action {
        BlockAction::Duplicate(id) => {
            let copy = doc
                .get_block(id)
                .map(Block::duplicate)
                .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
            doc.insert_after(id, vec![copy])
        }
        BlockAction::Remove(id) => {
            doc.remove(id)?;
            // An editor document always has at least one block
            if doc.blocks().is_empty() {
                doc.replace_all(vec![Block::paragraph("")]);
            }
            Ok(())
        }
        BlockAction::SplitSentences(id) => {
            let block = doc
                .get_block(id)
                .cloned()
                .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
            let sentences = split_sentences(&block.plain_text());
            if sentences.len() < 2 {
                return Ok(());
            }
            let pieces = sentences
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if i == 0 {
                        let mut first = block.clone();
                        first.set_plain_text(s);
                        first
                    } else {
                        block.with_text(s)
                    }
                })
                .collect();
            doc.replace(id, pieces)
        }
        BlockAction::MergeAll => {
            let Some(mut merged) = doc.blocks().first().cloned() else {
                return Ok(());
            };
            let text = doc
                .blocks()
                .iter()
                .map(|b| b.plain_text().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            merged.set_plain_text(&text);

            // Nested blocks of every merged block end up under the survivor
            if doc.blocks().iter().any(|b| b.children.is_some()) {
                let children = doc
                    .blocks()
                    .iter()
                    .flat_map(|b| b.children.iter().flatten().cloned())
                    .collect();
                merged.children = Some(children);
            }
            doc.replace_all(vec![merged]);
            Ok(())
        }
    }
}

pub struct EditorPanel<H: PanelHandle> {
    handle: H,
}

impl<H: PanelHandle> EditorPanel<H> {
    pub fn new(handle: H) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn focus(&mut self) {
        self.handle.focus();
    }

    pub fn blur(&mut self) {
        self.handle.blur();
    }

    pub fn on_focus(&self) -> FocusEvent {
        FocusEvent::PanelFocused(Panel::Editor)
    }

    /// Applies `action` when the editor is the active panel. Returns
    /// whether the document was touched.
    pub fn run_action<D: BlockDocument>(
        &mut self,
        doc: &mut D,
        action: &BlockAction,
        active: ActivePanel,
    ) -> Result<bool, EditorError> {
        if active != ActivePanel::Editor {
            return Ok(false);
        }
        apply_action(doc, action)?;
        Ok(true)
    }
}
