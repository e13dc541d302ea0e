//! Answer composition and best-effort text compression.
//!
//! [`enhance_query`] merges ranked chunks and the user question into the
//! structured prompt handed to the downstream answering workflow — plain
//! text by design, since the consumer is prompt-driven. The compression
//! helpers are pure, total string functions: lossy size reducers, not
//! summarizers, and they never error.

use crate::faq::Faq;
use crate::models::ChunkHit;

/// Keywords whose sentences survive chunk compression, by importance.
const CHUNK_KEYWORDS: [&str; 32] = [
    "mad", "mmd", "视频", "剪辑", "制作", "教程", "软件", "特效", "模型", "动画", "音乐", "素材",
    "创作", "学习", "技术", "工具", "社团", "成员", "活动", "比赛", "项目", "培训", "问题", "解决",
    "方法", "步骤", "指南", "推荐", "建议", "必要", "重要", "关键",
];

/// Keywords whose lines survive output compression.
const OUTPUT_KEYWORDS: [&str; 16] = [
    "步骤", "建议", "推荐", "要点", "注意", "重要", "必须", "关键", "解决", "方法", "解答", "答案",
    "结论", "总结", "【", "---",
];

/// JSON fields probed by [`compress_output`] before falling back to
/// line-level compression.
const OUTPUT_JSON_FIELDS: [&str; 6] = ["response", "message", "result", "answer", "content", "text"];

/// Build the enhanced query from ranked chunks. With no chunks the original
/// query is returned unchanged.
pub fn enhance_query(query: &str, hits: &[ChunkHit]) -> String {
    if hits.is_empty() {
        return query.to_string();
    }

    let mut out = String::from("根据以下相关知识回答问题：\n\n");

    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("【相关资料{} - {}】\n", i + 1, hit.title));
        out.push_str(&hit.content);
        out.push_str("\n\n");
    }

    out.push_str(&format!("用户问题：{}\n\n", query));
    out.push_str("请基于上述相关资料，以视频组AI小助理的身份回答用户问题。回答要：\n");
    out.push_str("1. 专业且温暖，使用简体中文\n");
    out.push_str("2. 结合相关资料给出具体建议\n");
    out.push_str("3. 如果是MAD或MMD相关问题，要明确区分并使用对应模块信息\n");
    out.push_str("4. 提供实用的步骤或建议\n");
    out.push_str("5. 鼓励用户继续学习和创作\n\n");

    out.push_str("【输出优化要求 - 语义压缩】\n");
    out.push_str("请在回答时进行适度的语义压缩以优化输出长度：\n");
    out.push_str("- 移除冗余和重复表述，但保留所有关键信息\n");
    out.push_str("- 合并相似的步骤或建议，使用更简洁的表达\n");
    out.push_str("- 使用列表、序号、代码块等格式提高可读性\n");
    out.push_str("- 必须保留所有重要警告、版权提醒和注意事项\n");
    out.push_str("- 目标：将内容压缩到原文本的 70-85% 长度\n");

    out
}

/// The answer block used when an exact FAQ match bypasses retrieval.
pub fn faq_answer(faq: &Faq) -> String {
    format!(
        "【FAQ精确匹配】\n问题：{}\n答案：{}\n\n这是来自知识库的标准答案，希望对你有帮助！如果还有其他问题，随时可以继续提问喵～",
        faq.question, faq.answer
    )
}

/// Compress chunk text to at most `max_len` bytes: keep sentences carrying
/// domain keywords, fall back to the first sentence, then hard-truncate.
pub fn compress_chunk(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }

    let important: Vec<&str> = text
        .split('。')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let lower = s.to_lowercase();
            CHUNK_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect();

    let compressed = if !important.is_empty() {
        important.join("。")
    } else {
        text.split('。').next().unwrap_or_default().trim().to_string()
    };

    if compressed.len() > max_len {
        format!("{}...", truncate_at_boundary(&compressed, max_len))
    } else {
        compressed
    }
}

/// Compress downstream output to at most `max_len` bytes. JSON payloads
/// short-circuit to their first known answer field; plain text keeps
/// heading and keyword lines, falling back to the leading lines, and
/// finally truncates — preferring a sentence boundary past the midpoint.
pub fn compress_output(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text) {
        for field in OUTPUT_JSON_FIELDS {
            if let Some(serde_json::Value::String(value)) = map.get(field) {
                return value.clone();
            }
        }
    }

    let mut important: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            if l.starts_with('#') {
                return true;
            }
            let lower = l.to_lowercase();
            OUTPUT_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect();

    if important.is_empty() {
        important = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(5)
            .collect();
    }

    let compressed = important.join("\n");
    if compressed.len() <= max_len {
        return compressed;
    }

    let truncated = truncate_at_boundary(&compressed, max_len);
    match truncated.rfind('。') {
        Some(pos) if pos > max_len / 2 => format!("{}。", &truncated[..pos]),
        _ => format!("{}...", truncated),
    }
}

/// Truncate to at most `max` bytes, snapping back to a UTF-8 boundary.
fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut i = max;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    &s[..i]
}
