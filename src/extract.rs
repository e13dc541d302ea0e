//! Markdown metadata extraction: front matter, title, category, fingerprint.
//!
//! Knowledge files optionally begin with a front-matter block delimited by
//! lines containing only `---`, holding `key: value` pairs. Title and
//! category prefer front matter and fall back to content heuristics.

use sha2::{Digest, Sha256};

/// Content fingerprint: SHA-256 hex of the raw file content.
///
/// Used purely for change detection during ingestion, not for security.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Look up a `key:` value in the leading front-matter block, if present.
fn front_matter_value(content: &str, key: &str) -> Option<String> {
    let mut lines = content.lines();
    if lines.next().map(str::trim) != Some("---") {
        return None;
    }

    let prefix = format!("{}:", key);
    for line in lines {
        let line = line.trim();
        if line == "---" {
            break;
        }
        if let Some(value) = line.strip_prefix(&prefix) {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            return Some(value.to_string());
        }
    }

    None
}

/// Extract a document title: front-matter `title:` first, then the first
/// level-1 heading. Returns `None` when neither exists; the caller falls
/// back to the file name.
pub fn extract_title(content: &str) -> Option<String> {
    if let Some(title) = front_matter_value(content, "title") {
        if !title.is_empty() {
            return Some(title);
        }
    }

    for line in content.lines() {
        let line = line.trim();
        if let Some(heading) = line.strip_prefix("# ") {
            return Some(heading.trim().to_string());
        }
    }

    None
}

pub const CATEGORY_COMBINED: &str = "视频组知识库";
pub const CATEGORY_MAD: &str = "MAD创作";
pub const CATEGORY_MMD: &str = "MMD创作";
pub const CATEGORY_GENERAL: &str = "通用";

/// Extract a document category: front-matter `club:` first, then a keyword
/// scan over the lowercased content. Best-effort; mixed-topic documents may
/// land in the combined category.
pub fn extract_category(content: &str) -> String {
    if let Some(category) = front_matter_value(content, "club") {
        if !category.is_empty() {
            return category;
        }
    }

    let lower = content.to_lowercase();
    let has_mad = lower.contains("mad");
    let has_mmd = lower.contains("mmd");

    match (has_mad, has_mmd) {
        (true, true) => CATEGORY_COMBINED.to_string(),
        (true, false) => CATEGORY_MAD.to_string(),
        (false, true) => CATEGORY_MMD.to_string(),
        (false, false) => CATEGORY_GENERAL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("# Hello\n\nworld");
        let b = fingerprint("# Hello\n\nworld");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }

    #[test]
    fn test_title_from_front_matter() {
        let content = "---\ntitle: \"MAD入门指南\"\nclub: 柒世纪视频组\n---\n\n# 其他标题\n";
        assert_eq!(extract_title(content).as_deref(), Some("MAD入门指南"));
    }

    #[test]
    fn test_title_from_first_heading() {
        let content = "intro line\n\n# 剪辑技巧\n\n## 小节\n";
        assert_eq!(extract_title(content).as_deref(), Some("剪辑技巧"));
    }

    #[test]
    fn test_title_missing() {
        assert_eq!(extract_title("plain text, no headings"), None);
    }

    #[test]
    fn test_front_matter_requires_leading_delimiter() {
        let content = "# Heading\n---\ntitle: hidden\n---\n";
        assert_eq!(extract_title(content).as_deref(), Some("Heading"));
    }

    #[test]
    fn test_category_from_front_matter() {
        let content = "---\nclub: 柒世纪视频组\n---\n\nmad mmd everywhere\n";
        assert_eq!(extract_category(content), "柒世纪视频组");
    }

    #[test]
    fn test_category_keyword_scan() {
        assert_eq!(extract_category("学习MAD剪辑"), CATEGORY_MAD);
        assert_eq!(extract_category("MMD模型导入"), CATEGORY_MMD);
        assert_eq!(extract_category("MAD与MMD对比"), CATEGORY_COMBINED);
        assert_eq!(extract_category("社团活动安排"), CATEGORY_GENERAL);
    }

    #[test]
    fn test_category_case_insensitive() {
        assert_eq!(extract_category("关于mAd的教程"), CATEGORY_MAD);
    }
}
