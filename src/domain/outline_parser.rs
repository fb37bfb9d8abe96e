//! Outline Parser - 大纲解析
//!
//! 把生成的大纲文本解析为有序章节列表。只在大纲首次通过评审时执行一次。

use std::sync::OnceLock;

use regex::Regex;

/// 章节标题模式，按优先级尝试，第一个有匹配的模式生效
const CHAPTER_PATTERNS: [&str; 4] = [
    // ## Chapter 1: Title
    r"(?im)##[ \t]*Chapter[ \t]*(\d+)[:\t -]*(.+)$",
    // ### Chapter 1 - Title
    r"(?im)###[ \t]*Chapter[ \t]*(\d+)[:\t -]*(.+)$",
    // ## 1. Title
    r"(?im)##[ \t]*(\d+)\.[ \t]*(.+)$",
    // **Chapter 1: Title**
    r"(?i)\*\*Chapter[ \t]*(\d+)[:\t -]*(.+?)\*\*",
];

/// 兜底：任意二/三级标题
const HEADING_PATTERN: &str = r"(?m)^[ \t]*#{2,3}[ \t]*(.+)$";

/// 兜底最多取的标题数
const MAX_FALLBACK_CHAPTERS: usize = 10;

/// 解析出的章节条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// 从 1 开始连续编号
    pub sequence: u32,
    pub title: String,
    /// 大纲中该章节的原文（标题行及其后到下一个章节之前的内容）
    pub entry: String,
}

fn compiled_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CHAPTER_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

fn heading_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(HEADING_PATTERN).ok()).as_ref()
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// 解析大纲
///
/// 编号重复的标题只保留第一次出现；按原编号排序后重新从 1 连续编号。
/// 没有任何章节标题时退回到前若干个长度大于 3 的标题。
pub fn parse_outline(outline: &str) -> Vec<OutlineEntry> {
    for pattern in compiled_patterns() {
        // (原编号, 标题, 匹配起点)
        let mut found: Vec<(u32, String, usize)> = Vec::new();
        for caps in pattern.captures_iter(outline) {
            let (Some(whole), Some(num), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Ok(number) = num.as_str().parse::<u32>() else {
                continue;
            };
            if found.iter().any(|(n, _, _)| *n == number) {
                continue;
            }
            let title = clean_title(title.as_str());
            if title.is_empty() {
                continue;
            }
            found.push((number, title, whole.start()));
        }

        if !found.is_empty() {
            let entries = slice_entries(outline, &found);
            let mut numbered: Vec<(u32, String, String)> = found
                .into_iter()
                .zip(entries)
                .map(|((number, title, _), entry)| (number, title, entry))
                .collect();
            numbered.sort_by_key(|(number, _, _)| *number);
            return renumber(numbered.into_iter().map(|(_, t, e)| (t, e)));
        }
    }

    let Some(heading) = heading_pattern() else {
        return Vec::new();
    };
    let headings: Vec<(String, usize)> = heading
        .captures_iter(outline)
        .take(MAX_FALLBACK_CHAPTERS)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let title = clean_title(caps.get(1)?.as_str());
            (title.chars().count() > 3).then_some((title, start))
        })
        .collect();

    let with_numbers: Vec<(u32, String, usize)> = headings
        .into_iter()
        .map(|(title, start)| (0, title, start))
        .collect();
    let entries = slice_entries(outline, &with_numbers);
    renumber(
        with_numbers
            .into_iter()
            .zip(entries)
            .map(|((_, title, _), entry)| (title, entry)),
    )
}

/// 每个匹配到下一个匹配（按文本位置）之间的原文
fn slice_entries(outline: &str, found: &[(u32, String, usize)]) -> Vec<String> {
    let mut starts: Vec<usize> = found.iter().map(|(_, _, s)| *s).collect();
    starts.sort_unstable();

    found
        .iter()
        .map(|(_, _, start)| {
            let end = starts
                .iter()
                .find(|s| **s > *start)
                .copied()
                .unwrap_or(outline.len());
            outline[*start..end].trim().to_string()
        })
        .collect()
}

fn renumber(items: impl Iterator<Item = (String, String)>) -> Vec<OutlineEntry> {
    items
        .enumerate()
        .map(|(i, (title, entry))| OutlineEntry {
            sequence: i as u32 + 1,
            title,
            entry,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chapter_headings() {
        let outline = "# The Book\n\n## Chapter 1: The Departure\nHero leaves.\n\n## Chapter 2 - The Storm\nShip wrecks.\n\n## Chapter 3: Landfall\n";
        let chapters = parse_outline(outline);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "The Departure");
        assert_eq!(chapters[1].title, "The Storm");
        assert_eq!(chapters[2].sequence, 3);
        assert!(chapters[0].entry.contains("Hero leaves."));
        assert!(!chapters[0].entry.contains("Ship wrecks."));
    }

    #[test]
    fn test_parse_numbered_and_bold_headings() {
        let numbered = parse_outline("## 1. Dawn\n## 2. Dusk\n");
        assert_eq!(
            numbered.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
            vec!["Dawn", "Dusk"]
        );

        let bold = parse_outline("**Chapter 1: Seeds**\ntext\n**Chapter 2: Roots**\n");
        assert_eq!(bold.len(), 2);
        assert_eq!(bold[1].title, "Roots");
    }

    #[test]
    fn test_duplicates_dropped_and_renumbered() {
        let outline = "## Chapter 5: Late\n## Chapter 2: Early\n## Chapter 2: Again\n## Chapter 9: Last\n";
        let chapters = parse_outline(outline);
        let seq: Vec<(u32, &str)> = chapters
            .iter()
            .map(|c| (c.sequence, c.title.as_str()))
            .collect();
        assert_eq!(seq, vec![(1, "Early"), (2, "Late"), (3, "Last")]);
    }

    #[test]
    fn test_fallback_headings() {
        let outline = "## Prologue: Ashes\n## Act\n### The Long Winter\n";
        let chapters = parse_outline(outline);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Prologue: Ashes");
        assert_eq!(chapters[1].title, "The Long Winter");
        assert_eq!(chapters[1].sequence, 2);
    }

    #[test]
    fn test_no_headings() {
        assert!(parse_outline("just some prose without structure").is_empty());
    }
}
