//! Member roster rendering.
//!
//! The roster arrives over the sync endpoint and is materialized as a
//! markdown document inside the knowledge source tree, so it flows through
//! the ordinary ingestion pipeline and becomes retrievable like any other
//! knowledge file.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// File name of the roster document inside the source root.
pub const MEMBERS_FILE: &str = "社团成员信息.md";

/// One roster entry as posted to the sync endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    pub name: String,
    pub sex: String,
    pub year: String,
    pub direction: String,
    pub position: String,
    pub status: String,
    #[serde(default)]
    pub remark: String,
}

/// Render the roster as a front-mattered markdown document.
pub fn render_members_markdown(members: &[MemberRecord], now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str("title: 柒世纪视频组成员信息\n");
    out.push_str("role: 社团成员信息库\n");
    out.push_str("club: 柒世纪视频组\n");
    out.push_str("language: zh-CN\n");
    out.push_str(&format!("last_updated: {}\n", stamp));
    out.push_str("---\n\n");

    out.push_str("# 柒世纪视频组成员信息库\n\n");
    out.push_str("本文档记录了柒世纪视频组所有活跃成员的基本信息，用于AI助手快速了解成员背景。\n\n");

    out.push_str("## 成员总数\n\n");
    out.push_str(&format!("- 总计: {} 名成员\n", members.len()));
    out.push_str(&format!("- 更新时间: {}\n\n", stamp));

    out.push_str("## 成员详细信息\n\n");

    for (i, member) in members.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, member.name));
        out.push_str(&format!("**性别**: {}\n\n", member.sex));
        out.push_str(&format!("**年级**: {}\n\n", member.year));
        out.push_str(&format!("**方向**: {}\n\n", member.direction));
        out.push_str(&format!("**职位**: {}\n\n", member.position));
        out.push_str(&format!("**状态**: {}\n\n", member.status));
        if !member.remark.is_empty() {
            out.push_str(&format!("**备注**: {}\n\n", member.remark));
        }
        out.push_str("---\n\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, remark: &str) -> MemberRecord {
        MemberRecord {
            name: name.to_string(),
            sex: "女".to_string(),
            year: "2023".to_string(),
            direction: "MAD".to_string(),
            position: "组员".to_string(),
            status: "在役".to_string(),
            remark: remark.to_string(),
        }
    }

    #[test]
    fn test_render_front_matter_and_counts() {
        let now = DateTime::from_timestamp(1700000000, 0).unwrap();
        let md = render_members_markdown(&[member("小明", ""), member("小红", "擅长运镜")], now);
        assert!(md.starts_with("---\ntitle: 柒世纪视频组成员信息\n"));
        assert!(md.contains("- 总计: 2 名成员"));
        assert!(md.contains("### 1. 小明"));
        assert!(md.contains("### 2. 小红"));
    }

    #[test]
    fn test_empty_remark_omitted() {
        let now = Utc::now();
        let md = render_members_markdown(&[member("小明", "")], now);
        assert!(!md.contains("**备注**"));

        let md = render_members_markdown(&[member("小红", "擅长运镜")], now);
        assert!(md.contains("**备注**: 擅长运镜"));
    }

    #[test]
    fn test_empty_roster_still_renders_document() {
        let md = render_members_markdown(&[], Utc::now());
        assert!(md.contains("- 总计: 0 名成员"));
        assert!(md.contains("## 成员详细信息"));
    }
}
