//! Header-aware, length-bounded markdown chunker.
//!
//! Splits a document into retrieval-sized chunks in three passes:
//!
//! 1. Split at heading lines. Sections shorter than
//!    `min_section_chars` are not emitted standalone; the accumulator keeps
//!    growing across the boundary so near-empty fragments collapse into
//!    their neighbors.
//! 2. Sections over `max_section_chars` are re-split at the next deeper
//!    heading level.
//! 3. Still-oversized sections are split at full-width period (`。`)
//!    boundaries and packed into buckets of at most `max_bucket_chars`.
//!    A single sentence longer than the bucket limit is emitted intact.
//!
//! Output order matches document order; a chunk's ordinal index is its
//! 0-based position in the output sequence. All limits are byte lengths.

use crate::config::ChunkingConfig;

/// Split document content into ordered chunk texts.
pub fn split_document(content: &str, cfg: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();

    for section in split_by_headings(content, cfg.min_section_chars) {
        if section.len() <= cfg.max_section_chars {
            push_trimmed(&mut chunks, &section);
            continue;
        }

        for sub in split_by_subheadings(&section, cfg.min_section_chars) {
            if sub.len() <= cfg.max_section_chars {
                push_trimmed(&mut chunks, &sub);
            } else {
                chunks.extend(split_by_length(&sub, cfg.max_bucket_chars));
            }
        }
    }

    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, section: &str) {
    let trimmed = section.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split at heading lines, collapsing sections below `min_len` into the
/// running accumulator instead of emitting them standalone.
fn split_by_headings(content: &str, min_len: usize) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.trim().starts_with('#') && current.len() >= min_len {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }

    flush_remainder(&mut sections, current, min_len);
    sections
}

/// Re-split an oversized section at headings deeper than its own level.
/// Returns the section unchanged when no subheadings exist.
fn split_by_subheadings(section: &str, min_len: usize) -> Vec<String> {
    let base_level = section
        .lines()
        .next()
        .map(|l| heading_level(l.trim()))
        .unwrap_or(0);

    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in section.lines() {
        let trimmed = line.trim();
        if base_level > 0
            && trimmed.starts_with('#')
            && heading_level(trimmed) > base_level
            && current.len() >= min_len
        {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }

    flush_remainder(&mut sections, current, min_len);

    if sections.is_empty() {
        sections.push(section.to_string());
    }

    sections
}

/// Emit the trailing accumulator; a short remainder merges into the last
/// emitted section rather than standing alone.
fn flush_remainder(sections: &mut Vec<String>, remainder: String, min_len: usize) {
    if remainder.trim().is_empty() {
        return;
    }
    if remainder.len() >= min_len || sections.is_empty() {
        sections.push(remainder);
    } else if let Some(last) = sections.last_mut() {
        last.push_str(&remainder);
    }
}

fn heading_level(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b'#').count()
}

/// Pack sentences (split at `。`) into buckets of at most `max_len` bytes.
/// A sentence that alone exceeds the limit becomes its own bucket; it is
/// never split mid-sentence.
fn split_by_length(text: &str, max_len: usize) -> Vec<String> {
    let mut buckets = Vec::new();
    let mut current = String::new();

    for sentence in text.split('。') {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + sentence.len() > max_len {
            buckets.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push('。');
        }
        current.push_str(sentence);
    }

    if !current.is_empty() {
        buckets.push(current);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChunkingConfig {
        ChunkingConfig::default()
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunks = split_document("# 标题\n\n一段简短的内容，足够超过五十个字节的最小长度限制。\n", &cfg());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("# 标题"));
    }

    #[test]
    fn test_empty_document() {
        assert!(split_document("", &cfg()).is_empty());
        assert!(split_document("\n\n\n", &cfg()).is_empty());
    }

    #[test]
    fn test_splits_at_headings() {
        let section_a = format!("# A\n\n{}\n", "关于MAD剪辑的介绍。".repeat(5));
        let section_b = format!("# B\n\n{}\n", "关于MMD模型的介绍。".repeat(5));
        let content = format!("{}{}", section_a, section_b);
        let chunks = split_document(&content, &cfg());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("MAD"));
        assert!(chunks[1].contains("MMD"));
    }

    #[test]
    fn test_short_section_collapses_into_accumulator() {
        // "# tiny\nx" is well under 50 bytes, so the next heading must not
        // flush it as a standalone fragment.
        let content = format!("# tiny\nx\n# 正文\n\n{}\n", "这里是足够长的正文内容。".repeat(6));
        let chunks = split_document(&content, &cfg());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("# tiny"));
        assert!(chunks[0].contains("# 正文"));
    }

    #[test]
    fn test_trailing_short_remainder_merges_into_last_chunk() {
        let body = "正文内容需要超过最小长度才能单独成段。".repeat(4);
        let content = format!("# A\n\n{}\n# 尾\n短\n", body);
        let chunks = split_document(&content, &cfg());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("# 尾"));
    }

    #[test]
    fn test_oversized_section_resplit_at_subheadings() {
        let sub_a = format!("## 子节一\n\n{}\n", "MAD素材的选择要点。".repeat(30));
        let sub_b = format!("## 子节二\n\n{}\n", "MAD节奏的处理方法。".repeat(30));
        let content = format!("# 教程\n\n{}{}", sub_a, sub_b);
        assert!(content.len() > 1500);
        let chunks = split_document(&content, &cfg());
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 1500, "chunk too large: {} bytes", chunk.len());
        }
    }

    #[test]
    fn test_sentence_packing_respects_bucket_bound() {
        // No subheadings, so the oversized section falls through to
        // sentence packing at 1200 bytes.
        let content = "这是一个关于视频制作的句子。".repeat(60);
        assert!(content.len() > 1500);
        let chunks = split_document(&content, &cfg());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 1200, "bucket too large: {} bytes", chunk.len());
        }
    }

    #[test]
    fn test_single_oversized_sentence_kept_intact() {
        // One sentence with no 。 boundary inside, longer than every limit.
        let sentence = "很长的内容没有句号分隔".repeat(200);
        let chunks = split_document(&sentence, &cfg());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], sentence);
    }

    #[test]
    fn test_output_order_matches_document_order() {
        let content = format!(
            "# 一\n\n{}\n# 二\n\n{}\n# 三\n\n{}\n",
            "第一段足够长的内容填充在这里。".repeat(4),
            "第二段足够长的内容填充在这里。".repeat(4),
            "第三段足够长的内容填充在这里。".repeat(4),
        );
        let chunks = split_document(&content, &cfg());
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("第一段"));
        assert!(chunks[1].contains("第二段"));
        assert!(chunks[2].contains("第三段"));
    }

    #[test]
    fn test_deterministic() {
        let content = format!("# A\n\n{}\n## B\n\n{}\n", "内容甲。".repeat(100), "内容乙。".repeat(300));
        let a = split_document(&content, &cfg());
        let b = split_document(&content, &cfg());
        assert_eq!(a, b);
    }
}
