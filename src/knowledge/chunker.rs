//! Text Chunking Module
//!
//! 문장 / 고정 크기 / 문단 단위 텍스트 분할을 제공합니다.
//! 모든 길이는 바이트가 아니라 문자(char) 수 기준입니다.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub target_characters: usize,
    /// 다음 청크로 이어지는 오버랩 크기 (문자 수)
    pub overlap_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_characters: 150,
            overlap_characters: 30,
        }
    }
}

impl ChunkConfig {
    /// 청크 크기만 지정 (오버랩은 크기의 1/5)
    pub fn with_target(target_characters: usize) -> Self {
        Self {
            target_characters,
            overlap_characters: target_characters / 5,
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.target_characters == 0 {
            return Err(RagError::invalid("chunk size must be positive"));
        }
        if self.overlap_characters >= self.target_characters {
            return Err(RagError::invalid(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                self.overlap_characters, self.target_characters
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunk Strategy
// ============================================================================

/// 청킹 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// 문장 경계 + 오버랩
    Sentence,
    /// 고정 크기 윈도우 + 오버랩
    Size,
    /// 빈 줄 경계 (오버랩 없음)
    #[default]
    Paragraph,
}

impl ChunkStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ChunkStrategy::Sentence => "sentence",
            ChunkStrategy::Size => "size",
            ChunkStrategy::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChunkStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sentence" => Ok(ChunkStrategy::Sentence),
            "size" => Ok(ChunkStrategy::Size),
            "paragraph" => Ok(ChunkStrategy::Paragraph),
            other => Err(RagError::invalid(format!("unknown chunk strategy: {}", other))),
        }
    }
}

// ============================================================================
// Chunker
// ============================================================================

/// 텍스트 청커
///
/// 입력에 대한 순수 함수입니다. 같은 입력은 항상 같은 청크 목록을 만듭니다.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
    sentence_end: Regex,
    paragraph_break: Regex,
}

impl Chunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;

        let sentence_end = Regex::new(r"[.!?]\s+")
            .map_err(|e| RagError::invalid(format!("sentence pattern: {}", e)))?;
        let paragraph_break = Regex::new(r"\r?\n(?:[ \t]*\r?\n)+")
            .map_err(|e| RagError::invalid(format!("paragraph pattern: {}", e)))?;

        Ok(Self {
            config,
            sentence_end,
            paragraph_break,
        })
    }

    /// 크기와 오버랩으로 생성
    pub fn with_sizes(target_characters: usize, overlap_characters: usize) -> Result<Self> {
        Self::new(ChunkConfig {
            target_characters,
            overlap_characters,
        })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 전략에 따라 분할
    pub fn chunk(&self, text: &str, strategy: ChunkStrategy) -> Vec<String> {
        match strategy {
            ChunkStrategy::Sentence => self.chunk_by_sentence(text),
            ChunkStrategy::Size => self.chunk_by_size(text),
            ChunkStrategy::Paragraph => self.chunk_by_paragraph(text),
        }
    }

    /// 문장 단위 청킹
    ///
    /// 문장을 버퍼에 누적하다가 크기를 넘기면 내보내고,
    /// 직전 버퍼의 끝부분(단어 경계 기준)을 새 버퍼의 시작으로 사용합니다.
    pub fn chunk_by_sentence(&self, text: &str) -> Vec<String> {
        if let Some(chunks) = self.trivial_chunks(text) {
            return chunks;
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in self.split_sentences(text) {
            if !current.is_empty()
                && char_len(&current) + char_len(sentence) > self.config.target_characters
            {
                push_trimmed(&mut chunks, &current);
                current = self.overlap_tail(&current);
            }

            current.push_str(sentence);
            current.push(' ');
        }

        push_trimmed(&mut chunks, &current);
        chunks
    }

    /// 고정 크기 청킹
    ///
    /// 단어 중간에서 끊기면 한도 이전의 마지막 공백에서 자릅니다.
    /// 다음 윈도우는 `end - overlap`에서 시작하되, 전진하지 못하면 `end`에서 시작합니다.
    pub fn chunk_by_size(&self, text: &str) -> Vec<String> {
        if let Some(chunks) = self.trivial_chunks(text) {
            return chunks;
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let target = self.config.target_characters;
        let overlap = self.config.overlap_characters;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + target).min(len);

            // 단어 경계에서 자르기
            if end < len {
                if let Some(space) = (start + 1..=end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = space;
                }
            }

            let window: String = chars[start..end].iter().collect();
            push_trimmed(&mut chunks, &window);

            if end >= len {
                break;
            }

            // 진행 보장
            start = match end.checked_sub(overlap) {
                Some(next) if next > start => next,
                _ => end,
            };
        }

        chunks
    }

    /// 문단 단위 청킹
    ///
    /// 빈 줄로 나눈 문단을 누적합니다. 문단은 자체 완결로 보고 오버랩하지 않습니다.
    pub fn chunk_by_paragraph(&self, text: &str) -> Vec<String> {
        if let Some(chunks) = self.trivial_chunks(text) {
            return chunks;
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for para in self.paragraph_break.split(text) {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }

            if !current.is_empty()
                && char_len(&current) + char_len(para) > self.config.target_characters
            {
                push_trimmed(&mut chunks, &current);
                current.clear();
            }

            current.push_str(para);
            current.push_str("\n\n");
        }

        push_trimmed(&mut chunks, &current);
        chunks
    }

    /// 빈 입력은 청크 없음, 한도 이하 입력은 트림된 원문 하나
    fn trivial_chunks(&self, text: &str) -> Option<Vec<String>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(vec![]);
        }
        if char_len(trimmed) <= self.config.target_characters {
            return Some(vec![trimmed.to_string()]);
        }
        None
    }

    /// 종결 부호 + 공백 기준 문장 분리 (부호는 앞 문장에 남김)
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut last = 0;

        for m in self.sentence_end.find_iter(text) {
            // 종결 부호는 1바이트 ASCII
            let end = m.start() + 1;
            sentences.push(text[last..end].trim());
            last = m.end();
        }
        if last < text.len() {
            sentences.push(text[last..].trim());
        }

        sentences.retain(|s| !s.is_empty());
        sentences
    }

    /// 버퍼 끝의 오버랩 텍스트 (잘린 앞 단어는 버림)
    fn overlap_tail(&self, text: &str) -> String {
        let overlap = self.config.overlap_characters;
        if overlap == 0 {
            return String::new();
        }

        let total = char_len(text);
        if total <= overlap {
            return text.to_string();
        }

        let tail = &text[byte_offset(text, total - overlap)..];
        match tail.find(char::is_whitespace) {
            Some(pos) if pos > 0 => tail[pos..].trim_start().to_string(),
            _ => tail.trim_start().to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 문자 인덱스 -> 바이트 오프셋
#[inline]
fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================
