//! Content Model
//!
//! 記事レコード、問題（Issue）、本文のブロックモデルとテキスト処理

pub mod document;
pub mod scaffold;
pub mod text;
pub mod types;

pub use document::{Block, BlockKind, Document};
pub use text::KeywordMatcher;
pub use types::{ContentRecord, ContentType, ImageAsset, Issue, IssueType, Severity};
