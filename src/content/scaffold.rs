//! Content Scaffold
//!
//! 本文が空の場合に使用する、キーワードを含む最小限の本文を生成

use super::text::{capitalize_first, normalize_whitespace};

const SCAFFOLD: &str = "## What to Know About {Kw}

{Kw} is a subject that many readers want to understand well. However, useful advice often sits across many different sources. This guide brings the essential ideas together in one place. First, we look at the core concepts behind {kw}. Then, we cover practical steps you can apply right away.

## Core Concepts

Every solid plan starts with clear goals. Therefore, write down what you want to achieve before you begin. Next, review the tools and resources you already have. In addition, note any limits on time or budget. As a result, you can choose a realistic path forward.

## Practical Steps

Start with one small task and finish it well. For example, set aside a short session each day for focused work. Furthermore, track your progress in a simple notebook or spreadsheet. Over time, these small habits add up to steady results. Finally, review what worked and adjust your approach.

## Final Thoughts

In short, {kw} rewards patience and consistent effort. Above all, keep learning and stay curious.";

/// キーワード入りの本文スキャフォールドを生成
///
/// 見出し4つのうちキーワードを含むのは1つ、キーワード密度は約2%。
pub fn scaffold_body(keyword: &str) -> String {
    let keyword = normalize_whitespace(keyword);
    let keyword = if keyword.is_empty() {
        "this topic".to_string()
    } else {
        keyword
    };
    SCAFFOLD
        .replace("{Kw}", &capitalize_first(&keyword))
        .replace("{kw}", &keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::document::Document;
    use crate::content::text::KeywordMatcher;

    #[test]
    fn test_scaffold_contains_keyword_with_moderate_density() {
        let body = scaffold_body("rust");
        let doc = Document::parse(&body);
        let matcher = KeywordMatcher::new("rust", &[]);
        let occurrences = matcher.count(&doc.body_text());
        let density = occurrences as f64 / doc.body_word_count() as f64 * 100.0;
        assert_eq!(occurrences, 3);
        assert!(density > 0.5 && density < 2.5, "density {}", density);
        assert_eq!(doc.heading_count(), 4);
    }

    #[test]
    fn test_scaffold_with_empty_keyword() {
        let body = scaffold_body("   ");
        assert!(body.contains("This topic is a subject"));
    }
}
