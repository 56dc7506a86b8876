//! Text Utilities
//!
//! 単語・文の分割、キーワード照合などのテキスト処理ヘルパー

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// HTMLタグを除去
pub fn strip_tags(text: &str) -> String {
    tag_pattern().replace_all(text, " ").into_owned()
}

/// 空白を正規化
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 文字数（Unicode スカラー値単位）
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// 単語を抽出（英数字を含むトークンのみ）
pub fn words(text: &str) -> Vec<String> {
    strip_tags(text)
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .map(|w| w.to_string())
        .collect()
}

/// 単語数をカウント
pub fn count_words(text: &str) -> usize {
    strip_tags(text)
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// 文に分割
///
/// `.` `!` `?` の連続の後に空白または末尾が続く位置で区切る。
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // 終端記号の連続と閉じ引用符を取り込む
            while i + 1 < chars.len() && matches!(chars[i + 1], '.' | '!' | '?' | '"' | '\'' | ')') {
                i += 1;
                current.push(chars[i]);
            }
            if i + 1 >= chars.len() || chars[i + 1].is_whitespace() {
                let sentence = current.trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                current.clear();
            }
        }
        i += 1;
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// 単語境界で切り詰める（結果は `max_chars` 以下）
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    let next_is_space = text
        .chars()
        .nth(max_chars)
        .map(|c| c.is_whitespace())
        .unwrap_or(true);
    if next_is_space {
        return prefix.trim_end().to_string();
    }
    match prefix.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => prefix[..idx].trim_end().to_string(),
        _ => prefix,
    }
}

/// 末尾の区切り記号と接続語を取り除く
pub fn trim_dangling(text: &str) -> String {
    const DANGLING: &[&str] = &[
        "and", "or", "but", "the", "a", "an", "to", "of", "with", "for", "in", "on", "at", "by",
        "your", "our", "its", "that", "which",
    ];
    let mut result = text
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
        .to_string();
    loop {
        let Some(idx) = result.rfind(' ') else { break };
        let last = result[idx + 1..].to_lowercase();
        if DANGLING.contains(&last.as_str()) {
            result.truncate(idx);
            result = result
                .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
                .to_string();
        } else {
            break;
        }
    }
    result
}

/// 先頭文字を大文字化
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// 各単語の先頭を大文字化
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 文頭でのみ大文字になる機能語（限定詞・代名詞・接続詞・前置詞など）
const FUNCTION_WORDS: &[&str] = &[
    "the", "a", "an", "this", "these", "that", "those", "our", "your", "my", "their", "its",
    "his", "her", "some", "many", "most", "all", "each", "every", "any", "it", "we", "you",
    "they", "he", "she", "there", "several", "few", "one", "if", "when", "while", "and", "but",
    "or", "nor", "so", "yet", "for", "in", "on", "at", "by", "with", "from", "to", "of", "after",
    "before", "during", "then", "now", "also", "both", "either", "neither", "such", "other",
];

/// 先頭の語が機能語か（大文字化が文頭であることだけに由来する語）
pub fn starts_with_function_word(text: &str) -> bool {
    let first_word = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    FUNCTION_WORDS.contains(&first_word.as_str())
}

/// 先頭の語が等位接続詞か
pub fn starts_with_conjunction(text: &str) -> bool {
    let first_word = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    matches!(first_word.as_str(), "and" | "but" | "or" | "nor" | "so" | "yet" | "for")
}

/// 文頭を小文字化（機能語で始まる場合のみ。固有名詞は残す）
pub fn lowercase_leading(sentence: &str) -> String {
    if starts_with_function_word(sentence) {
        let mut chars = sentence.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        sentence.to_string()
    }
}

/// キーワードと同義語の照合器
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    terms: Vec<String>,
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    /// 照合器を作成（空の語は無視）
    pub fn new(keyword: &str, synonyms: &[String]) -> Self {
        let mut terms: Vec<String> = Vec::new();
        for term in std::iter::once(keyword).chain(synonyms.iter().map(String::as_str)) {
            let term = normalize_whitespace(term);
            if !term.is_empty() && !terms.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
                terms.push(term);
            }
        }
        let patterns = terms.iter().filter_map(|t| Self::compile(t)).collect();
        Self { terms, patterns }
    }

    fn compile(term: &str) -> Option<Regex> {
        let starts_word = term.chars().next().map(is_word_char).unwrap_or(false);
        let ends_word = term.chars().last().map(is_word_char).unwrap_or(false);
        let escaped = regex::escape(term).replace(' ', r"\s+");
        let pattern = format!(
            "(?i){}{}{}",
            if starts_word { r"\b" } else { "" },
            escaped,
            if ends_word { r"\b" } else { "" }
        );
        Regex::new(&pattern).ok()
    }

    /// 主キーワード
    pub fn keyword(&self) -> &str {
        self.terms.first().map(String::as_str).unwrap_or("")
    }

    /// すべての照合語
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// 照合語が空か
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// 最も短い照合語
    pub fn shortest_term(&self) -> &str {
        self.terms
            .iter()
            .min_by_key(|t| char_len(t))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 出現回数（キーワード + 同義語、重なりは1回）
    pub fn count(&self, text: &str) -> usize {
        self.find_all(text).len()
    }

    /// いずれかの語を含むか
    pub fn contains(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// 主キーワードを含むか
    pub fn contains_keyword(&self, text: &str) -> bool {
        self.patterns.first().map(|p| p.is_match(text)).unwrap_or(false)
    }

    /// 主キーワードの開始位置（文字単位）
    pub fn keyword_char_position(&self, text: &str) -> Option<usize> {
        let found = self.patterns.first()?.find(text)?;
        Some(text[..found.start()].chars().count())
    }

    /// 重なりのない出現範囲（バイト位置、昇順。同じ位置では長い方を優先）
    pub fn find_all(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = self
            .patterns
            .iter()
            .flat_map(|p| p.find_iter(text).map(|m| (m.start(), m.end())))
            .collect();
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut result: Vec<(usize, usize)> = Vec::new();
        for span in spans {
            match result.last() {
                Some(last) if span.0 < last.1 => {}
                _ => result.push(span),
            }
        }
        result
    }

    /// 照合語を除去した文字列
    pub fn remove_all(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            result = pattern.replace_all(&result, "").into_owned();
        }
        normalize_whitespace(&result)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words_ignores_markup_and_punctuation() {
        assert_eq!(count_words("<p>Hello, world!</p> - done"), 3);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second one! Third? Trailing text");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third?", "Trailing text"]
        );
        assert_eq!(split_sentences("Version 1.5 is out."), vec!["Version 1.5 is out."]);
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "alpha beta gamma delta";
        assert_eq!(truncate_at_word_boundary(text, 13), "alpha beta");
        assert_eq!(truncate_at_word_boundary(text, 100), text);
        assert_eq!(truncate_at_word_boundary(text, 10), "alpha beta");
    }

    #[test]
    fn test_trim_dangling() {
        assert_eq!(trim_dangling("tips and tricks for,"), "tips and tricks");
        assert_eq!(trim_dangling("learn the basics of the"), "learn the basics");
    }

    #[test]
    fn test_keyword_matcher_counts_synonyms_case_insensitively() {
        let matcher = KeywordMatcher::new("Rust", &["ferris".to_string()]);
        let text = "rust is fast. RUST is safe. Ferris loves rustaceans.";
        assert_eq!(matcher.count(text), 3);
        assert!(matcher.contains("I like FERRIS"));
        assert!(!matcher.contains_keyword("rustacean"));
    }

    #[test]
    fn test_keyword_matcher_multi_word_and_symbols() {
        let matcher = KeywordMatcher::new("c++ templates", &[]);
        assert_eq!(matcher.count("Using C++   templates well"), 1);
        assert_eq!(matcher.keyword_char_position("Why c++ templates"), Some(4));
    }

    #[test]
    fn test_find_all_merges_overlaps() {
        let matcher = KeywordMatcher::new("seo", &["seo tools".to_string()]);
        let spans = matcher.find_all("best seo tools");
        assert_eq!(spans, vec![(5, 14)]);
        assert_eq!(matcher.count("best seo tools"), 1);
    }

    #[test]
    fn test_lowercase_leading() {
        assert_eq!(lowercase_leading("The cat sat."), "the cat sat.");
        assert_eq!(lowercase_leading("Rust is great."), "Rust is great.");
        assert_eq!(lowercase_leading("And the rest followed."), "and the rest followed.");
        assert_eq!(lowercase_leading("Łódź is old."), "Łódź is old.");
        assert!(starts_with_conjunction("But then it rained."));
        assert!(!starts_with_conjunction("Butter melts."));
    }
}
