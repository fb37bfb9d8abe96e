//! Manuscript Compiler - 把已批准的章节写成 Markdown / 纯文本书稿
//!
//! 实现 CompilerPort

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;

use crate::application::ports::{CompilationError, CompilerPort};
use crate::domain::book::{ArtifactLocation, Book, Chapter};

/// 纯文本行宽
const TEXT_WIDTH: usize = 72;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManuscriptFormat {
    Markdown,
    PlainText,
}

impl ManuscriptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManuscriptFormat::Markdown => "md",
            ManuscriptFormat::PlainText => "txt",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" => Some(ManuscriptFormat::Markdown),
            "txt" | "text" => Some(ManuscriptFormat::PlainText),
            _ => None,
        }
    }
}

/// 编译器配置
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub output_dir: PathBuf,
    pub formats: Vec<ManuscriptFormat>,
}

impl CompilerConfig {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            formats: vec![ManuscriptFormat::Markdown, ManuscriptFormat::PlainText],
        }
    }

    /// 按名称设置输出格式
    pub fn with_formats<S: AsRef<str>>(mut self, formats: &[S]) -> Result<Self, CompilationError> {
        self.formats = formats
            .iter()
            .map(|f| {
                ManuscriptFormat::from_str(f.as_ref())
                    .ok_or_else(|| CompilationError::UnsupportedFormat(f.as_ref().to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

/// 书稿编译器
pub struct ManuscriptCompiler {
    config: CompilerConfig,
}

impl ManuscriptCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// 文件名只保留字母数字、空格、`-`、`_`
    fn file_stem(book: &Book) -> String {
        let safe: String = book
            .title
            .as_str()
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let safe = safe.trim();
        if safe.is_empty() {
            book.id.to_string()
        } else {
            safe.to_string()
        }
    }
}

#[async_trait]
impl CompilerPort for ManuscriptCompiler {
    async fn compile(
        &self,
        book: &Book,
        chapters: &[Chapter],
    ) -> Result<Vec<ArtifactLocation>, CompilationError> {
        if self.config.formats.is_empty() {
            return Err(CompilationError::UnsupportedFormat(
                "no output format configured".to_string(),
            ));
        }

        fs::create_dir_all(&self.config.output_dir).await?;
        let stem = Self::file_stem(book);

        let mut artifacts = Vec::with_capacity(self.config.formats.len());
        for format in &self.config.formats {
            let rendered = match format {
                ManuscriptFormat::Markdown => render_markdown(book, chapters),
                ManuscriptFormat::PlainText => render_text(book, chapters),
            };
            let path = self
                .config
                .output_dir
                .join(format!("{}.{}", stem, format.as_str()));
            fs::write(&path, rendered).await?;

            tracing::info!(
                book_id = %book.id,
                format = format.as_str(),
                path = %path.display(),
                "Manuscript written"
            );
            artifacts.push(ArtifactLocation::new(format.as_str(), path));
        }

        Ok(artifacts)
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn chapter_body(chapter: &Chapter) -> &str {
    chapter.content.as_deref().unwrap_or("").trim()
}

fn render_markdown(book: &Book, chapters: &[Chapter]) -> String {
    let mut out = format!("# {}\n\n## Contents\n\n", book.title);
    for chapter in chapters {
        out.push_str(&format!("{}. {}\n", chapter.sequence, chapter.title));
    }

    for chapter in chapters {
        out.push_str(&format!(
            "\n---\n\n## Chapter {}: {}\n\n{}\n",
            chapter.sequence,
            chapter.title,
            chapter_body(chapter)
        ));
    }
    out
}

fn render_text(book: &Book, chapters: &[Chapter]) -> String {
    let rule = "=".repeat(TEXT_WIDTH);
    let thin = "-".repeat(TEXT_WIDTH);
    let mut lines: Vec<String> = vec![
        rule.clone(),
        center(book.title.as_str()),
        rule.clone(),
        center(&format!("Generated on {}", Utc::now().format("%B %d, %Y"))),
        String::new(),
        thin.clone(),
        center("TABLE OF CONTENTS"),
        thin,
        String::new(),
    ];

    for chapter in chapters {
        lines.push(format!("    Chapter {}: {}", chapter.sequence, chapter.title));
    }
    lines.push(String::new());

    for chapter in chapters {
        lines.push(rule.clone());
        lines.push(format!("CHAPTER {}", chapter.sequence));
        lines.push(chapter.title.to_uppercase());
        lines.push(rule.clone());
        lines.push(String::new());

        for block in chapter_body(chapter).split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            if let Some(heading) = block.strip_prefix('#') {
                let heading = clean_markdown(heading.trim_start_matches('#').trim());
                lines.push(heading.to_uppercase());
                lines.push("-".repeat(heading.chars().count()));
            } else if block.starts_with("- ") || block.starts_with("* ") {
                for item in block.lines() {
                    let item = item.trim_start_matches(&['-', '*', ' '][..]);
                    lines.push(format!("    * {}", clean_markdown(item)));
                }
            } else {
                for line in word_wrap(&clean_markdown(block), TEXT_WIDTH - 4) {
                    lines.push(format!("    {}", line));
                }
            }
            lines.push(String::new());
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    if len >= TEXT_WIDTH {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((TEXT_WIDTH - len) / 2), text)
}

fn markdown_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"\*\*([^*]+)\*\*", "$1"),
            (r"\*([^*]+)\*", "$1"),
            (r"__([^_]+)__", "$1"),
            (r"`([^`]+)`", "$1"),
            (r"\[([^\]]+)\]\([^)]+\)", "$1"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// 去掉行内 Markdown 标记
fn clean_markdown(text: &str) -> String {
    markdown_patterns()
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
