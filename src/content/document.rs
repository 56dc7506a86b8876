//! Document Model
//!
//! 本文を見出し・段落・その他の行ブロックに分解する可逆モデル。
//! 変更していないブロックは元の行をそのまま再現する。

use super::text::{count_words, split_sentences, strip_tags};
use regex::Regex;
use std::sync::OnceLock;

/// ブロックの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// 見出し（レベル 1-6）
    Heading(u8),
    /// 段落
    Paragraph,
    /// その他の行（リスト、画像、任意のHTML）
    Raw,
    /// 空行
    Blank,
}

/// 本文の1行ブロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// マークアップ接頭辞（`## `、`<h2>`、`<p>` など）
    pub prefix: String,
    /// 編集対象のテキスト
    pub text: String,
    /// マークアップ接尾辞（`</h2>` など）
    pub suffix: String,
}

impl Block {
    /// 行を再構築
    pub fn render(&self) -> String {
        format!("{}{}{}", self.prefix, self.text, self.suffix)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading(_))
    }

    pub fn is_paragraph(&self) -> bool {
        self.kind == BlockKind::Paragraph
    }
}

fn html_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)^(\s*<h([1-6])[^>]*>)(.*?)(</h[1-6]>\s*)$").unwrap())
}

fn html_paragraph() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)^(\s*<p(?:\s[^>]*)?>)(.*?)(</p>\s*)$").unwrap())
}

fn markdown_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s{0,3}(#{1,6})\s+)(.*?)(\s*#*\s*)$").unwrap())
}

/// 行ブロックの列としての本文
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// 本文を解析
    pub fn parse(body: &str) -> Self {
        let blocks = body.split('\n').map(Self::parse_line).collect();
        Self { blocks }
    }

    fn parse_line(line: &str) -> Block {
        if line.trim().is_empty() {
            return Block {
                kind: BlockKind::Blank,
                prefix: String::new(),
                text: line.to_string(),
                suffix: String::new(),
            };
        }

        if let Some(caps) = markdown_heading().captures(line) {
            let level = caps[2].len() as u8;
            return Block {
                kind: BlockKind::Heading(level),
                prefix: caps[1].to_string(),
                text: caps[3].to_string(),
                suffix: caps[4].to_string(),
            };
        }

        if let Some(caps) = html_heading().captures(line) {
            let level = caps[2].parse::<u8>().unwrap_or(2);
            return Block {
                kind: BlockKind::Heading(level),
                prefix: caps[1].to_string(),
                text: caps[3].to_string(),
                suffix: caps[4].to_string(),
            };
        }

        if let Some(caps) = html_paragraph().captures(line) {
            return Block {
                kind: BlockKind::Paragraph,
                prefix: caps[1].to_string(),
                text: caps[2].to_string(),
                suffix: caps[3].to_string(),
            };
        }

        let trimmed = line.trim_start();
        let is_raw = trimmed.starts_with('<')
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
            || trimmed.starts_with("![")
            || trimmed.starts_with('>')
            || trimmed.starts_with("```")
            || trimmed.starts_with('|')
            || trimmed
                .split_once(". ")
                .map(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false);

        Block {
            kind: if is_raw {
                BlockKind::Raw
            } else {
                BlockKind::Paragraph
            },
            prefix: String::new(),
            text: line.to_string(),
            suffix: String::new(),
        }
    }

    /// 本文を再構築
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(Block::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 見出しブロック
    pub fn headings(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.is_heading())
    }

    /// 見出し数
    pub fn heading_count(&self) -> usize {
        self.headings().count()
    }

    /// 見出しを除いた本文テキスト
    pub fn body_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Paragraph | BlockKind::Raw))
            .map(|b| strip_tags(&b.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 見出しを除いた単語数
    pub fn body_word_count(&self) -> usize {
        count_words(&self.body_text())
    }

    /// 段落の文（ブロック番号付き）
    pub fn sentences(&self) -> Vec<(usize, String)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_paragraph())
            .flat_map(|(idx, b)| {
                split_sentences(&strip_tags(&b.text))
                    .into_iter()
                    .map(move |s| (idx, s))
            })
            .collect()
    }

    /// 段落インデックス
    pub fn paragraph_indices(&self) -> Vec<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_paragraph())
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Title\n\nIntro paragraph here. Second sentence.\n\n<h2 class=\"x\">Section</h2>\n<p>Wrapped text.</p>\n- list item\n<img src=\"a.png\" alt=\"A\">";

    #[test]
    fn test_parse_render_roundtrip_is_lossless() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_block_kinds() {
        let doc = Document::parse(SAMPLE);
        let kinds: Vec<BlockKind> = doc.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Blank,
                BlockKind::Paragraph,
                BlockKind::Blank,
                BlockKind::Heading(2),
                BlockKind::Paragraph,
                BlockKind::Raw,
                BlockKind::Raw,
            ]
        );
        assert_eq!(doc.blocks[4].text, "Section");
        assert_eq!(doc.blocks[5].text, "Wrapped text.");
    }

    #[test]
    fn test_sentences_and_word_count_exclude_headings() {
        let doc = Document::parse(SAMPLE);
        let sentences: Vec<String> = doc.sentences().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            sentences,
            vec!["Intro paragraph here.", "Second sentence.", "Wrapped text."]
        );
        // "list item" を含み、見出しは含まない
        assert_eq!(doc.body_word_count(), 9);
        assert_eq!(doc.heading_count(), 2);
    }
}
