// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use jpkr_api::Resource;
use jpkr_grid::{Clipboard, ClipboardError, Column, Row};
use std::path::PathBuf;

// (lemma, japanese reading, korean reading, korean meaning)
const WORDS: [(&str, &str, &str, &str); 16] = [
    ("猫", "ねこ", "네코", "고양이"),
    ("犬", "いぬ", "이누", "개"),
    ("鳥", "とり", "토리", "새"),
    ("魚", "さかな", "사카나", "물고기"),
    ("山", "やま", "야마", "산"),
    ("川", "かわ", "카와", "강"),
    ("空", "そら", "소라", "하늘"),
    ("海", "うみ", "우미", "바다"),
    ("花", "はな", "하나", "꽃"),
    ("木", "き", "키", "나무"),
    ("本", "ほん", "혼", "책"),
    ("水", "みず", "미즈", "물"),
    ("食べる", "たべる", "타베루", "먹다"),
    ("飲む", "のむ", "노무", "마시다"),
    ("行く", "いく", "이쿠", "가다"),
    ("見る", "みる", "미루", "보다"),
];

const LEVELS: [&str; 5] = ["N5", "N4", "N3", "N2", "N1"];

const SENTENCES: [(&str, &str); 6] = [
    ("猫が好きです。", "고양이를 좋아합니다."),
    ("海へ行きます。", "바다에 갑니다."),
    ("水を飲みます。", "물을 마십니다."),
    ("本を読みます。", "책을 읽습니다."),
    ("山が見えます。", "산이 보입니다."),
    ("花が咲きました。", "꽃이 피었습니다."),
];

const TAGS: [&str; 4] = ["daily", "travel", "food", "nature"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of word and example rows shaped like the API's.
#[derive(Debug, Clone)]
pub struct VocabFaker {
    rng: DeterministicRng,
}

impl VocabFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn word(&mut self, id: i64) -> Row {
        let (lemma, jp_pron, kr_pron, kr_mean) = WORDS[self.rng.int_n(WORDS.len())];
        Row::new()
            .with("id", id)
            .with("lemma_id", id)
            .with("lemma", lemma)
            .with("jp_pron", jp_pron)
            .with("kr_pron", kr_pron)
            .with("kr_mean", kr_mean)
            .with("level", self.pick(&LEVELS))
            .with("num_examples", self.rng.int_n(12) as i64)
            .with("has_embedding", self.rng.bool())
    }

    pub fn example(&mut self, id: i64) -> Row {
        let (jp_text, kr_mean) = SENTENCES[self.rng.int_n(SENTENCES.len())];
        Row::new()
            .with("id", id)
            .with("tags", self.pick(&TAGS))
            .with("jp_text", jp_text)
            .with("kr_mean", kr_mean)
            .with("en_prompt", "")
            .with("num_words", (self.rng.int_n(6) + 1) as i64)
            .with("has_audio", self.rng.bool())
            .with("has_image", self.rng.bool())
            .with("has_embedding", self.rng.bool())
    }

    /// Words with ids `1..=count`.
    pub fn words(&mut self, count: usize) -> Vec<Row> {
        (1..=count as i64).map(|id| self.word(id)).collect()
    }

    pub fn examples(&mut self, count: usize) -> Vec<Row> {
        (1..=count as i64).map(|id| self.example(id)).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn word_columns() -> Vec<Column> {
    Resource::Words.columns()
}

pub fn example_columns() -> Vec<Column> {
    Resource::Examples.columns()
}

/// A small fixed word list whose ids, lemmas and levels sort differently.
pub fn sample_words() -> Vec<Row> {
    vec![
        Row::new()
            .with("id", 3)
            .with("lemma", "犬")
            .with("kr_mean", "개")
            .with("level", "N5")
            .with("num_examples", 10),
        Row::new()
            .with("id", 1)
            .with("lemma", "猫")
            .with("kr_mean", "고양이")
            .with("level", "N4")
            .with("num_examples", 2),
        Row::new()
            .with("id", 2)
            .with("lemma", "木")
            .with("kr_mean", "나무")
            .with("level", "N3"),
    ]
}

/// In-memory clipboard; can be told to refuse access.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    content: String,
    denied: bool,
    writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            content: text.to_owned(),
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        if self.denied {
            return Err(ClipboardError::Denied);
        }
        Ok(self.content.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.denied {
            return Err(ClipboardError::Denied);
        }
        self.content = text.to_owned();
        self.writes.push(text.to_owned());
        Ok(())
    }
}

pub fn temp_tsv_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("rows.tsv");
    Ok((dir, path))
}
