//! Readability
//!
//! 受動態・文長・つなぎ言葉のアナライザーと、それらを組み合わせた修正器

pub mod corrector;
pub mod passive_voice;
pub mod sentence_length;
pub mod transition_words;

pub use corrector::{
    ReadabilityAnalysis, ReadabilityCorrection, ReadabilityCorrector, ReadabilityOptions,
};
pub use passive_voice::{PassiveMatch, PassiveVoiceAnalysis, PassiveVoiceAnalyzer};
pub use sentence_length::{SentenceLengthAnalysis, SentenceLengthAnalyzer};
pub use transition_words::{TransitionWordAnalysis, TransitionWordAnalyzer, TRANSITION_WORDS};
