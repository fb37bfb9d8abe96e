//! Prompt 构造

use crate::application::ports::{ChapterRequest, OutlineRequest};

/// 摘要请求中正文的最大字符数
const SUMMARY_SOURCE_CHARS: usize = 8000;

pub fn outline_prompt(request: &OutlineRequest) -> String {
    let notes = request.notes.as_deref().unwrap_or("(none)");

    match (&request.previous_outline, &request.revision_notes) {
        (Some(previous), Some(feedback)) => format!(
            "You are an expert book author and editor. Revise the book outline below \
             to address the editor's feedback. Keep the same general format.\n\n\
             BOOK TITLE: {}\n\n\
             EDITOR'S ORIGINAL NOTES:\n{}\n\n\
             ORIGINAL OUTLINE:\n{}\n\n\
             EDITOR'S FEEDBACK FOR IMPROVEMENT:\n{}\n\n\
             Generate the improved outline now:",
            request.title, notes, previous, feedback
        ),
        _ => format!(
            "You are an expert book author and editor. Create a detailed book outline.\n\n\
             BOOK TITLE: {}\n\n\
             EDITOR'S NOTES & REQUIREMENTS:\n{}\n\n\
             Use markdown. Give each chapter its own heading in the form \
             \"## Chapter N: Title\", followed by a 2-3 sentence description and \
             bullet points of key topics.\n\n\
             Generate the outline now:",
            request.title, notes
        ),
    }
}

pub fn chapter_prompt(request: &ChapterRequest) -> String {
    if let (Some(previous), Some(feedback)) = (&request.previous_content, &request.chapter_notes) {
        return revision_prompt(request, previous, feedback);
    }

    let mut prompt = format!(
        "You are an expert book author writing a chapter for a book.\n\n\
         BOOK TITLE: {}\n\n\
         BOOK OUTLINE:\n{}\n\n",
        request.book_title, request.outline
    );

    if !request.context.is_empty() {
        prompt.push_str("SUMMARY OF PREVIOUS CHAPTERS:\n");
        prompt.push_str(&request.context.render());
        prompt.push_str("\n\n");
    }

    let notes = [
        ("EDITOR'S NOTES FOR THE BOOK", &request.book_notes),
        ("EDITOR'S NOTES ON THE PREVIOUS CHAPTER", &request.previous_chapter_notes),
        ("EDITOR'S NOTES FOR THIS CHAPTER", &request.chapter_notes),
    ];
    for (heading, text) in notes {
        if let Some(text) = text {
            prompt.push_str(&format!("{}:\n{}\n\n", heading, text));
        }
    }

    prompt.push_str(&format!(
        "CHAPTER TO WRITE: Chapter {}: {}\n{}\n\n\
         Write this chapter in a professional, engaging style that flows from the \
         previous chapters and covers the topics listed in the outline. \
         Aim for 2000-3000 words.\n\n\
         Write the complete chapter now:",
        request.sequence, request.chapter_title, request.outline_entry
    ));
    prompt
}

/// 按编辑意见修订被拒绝的章节
fn revision_prompt(request: &ChapterRequest, previous: &str, feedback: &str) -> String {
    let mut prompt = format!(
        "You are revising a chapter based on editor feedback.\n\n\
         BOOK: {}\n\
         CHAPTER {}: {}\n\n",
        request.book_title, request.sequence, request.chapter_title
    );

    if !request.context.is_empty() {
        prompt.push_str("SUMMARY OF PREVIOUS CHAPTERS:\n");
        prompt.push_str(&request.context.render());
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "ORIGINAL CHAPTER:\n{}\n\n\
         EDITOR'S FEEDBACK:\n{}\n\n\
         Revise the chapter to address all feedback while maintaining the overall \
         flow and style.\n\n\
         Generate the revised chapter:",
        previous, feedback
    ));
    prompt
}

pub fn summary_prompt(request: &ChapterRequest, content: &str) -> String {
    let excerpt: String = content.chars().take(SUMMARY_SOURCE_CHARS).collect();
    format!(
        "Summarize the following chapter in 3-5 sentences. Focus on the main points \
         and any important conclusions.\n\n\
         BOOK: {}\n\
         CHAPTER {}: {}\n\n\
         CHAPTER CONTENT:\n{}\n\n\
         Provide a concise summary:",
        request.book_title, request.sequence, request.chapter_title, excerpt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContextPayload;

    fn chapter_request() -> ChapterRequest {
        ChapterRequest {
            book_title: "Iron Gardens".into(),
            outline: "## Chapter 1: Rust".into(),
            sequence: 2,
            chapter_title: "Bloom".into(),
            outline_entry: "The garden flowers.".into(),
            context: ContextPayload::default(),
            book_notes: None,
            previous_chapter_notes: Some("slow the pacing".into()),
            chapter_notes: None,
            previous_content: None,
        }
    }

    #[test]
    fn test_revision_prompt_includes_previous_outline() {
        let request = OutlineRequest {
            title: "Iron Gardens".into(),
            notes: None,
            previous_outline: Some("OLD OUTLINE".into()),
            revision_notes: Some("more chapters".into()),
        };
        let prompt = outline_prompt(&request);
        assert!(prompt.contains("OLD OUTLINE"));
        assert!(prompt.contains("more chapters"));
    }

    #[test]
    fn test_chapter_prompt_only_includes_present_notes() {
        let prompt = chapter_prompt(&chapter_request());
        assert!(prompt.contains("slow the pacing"));
        assert!(!prompt.contains("NOTES FOR THIS CHAPTER"));
        assert!(!prompt.contains("SUMMARY OF PREVIOUS CHAPTERS"));
        assert!(prompt.contains("Chapter 2: Bloom"));
    }

    #[test]
    fn test_rejected_chapter_is_revised_from_previous_draft() {
        let mut request = chapter_request();
        request.previous_content = Some("THE OLD DRAFT".into());
        request.chapter_notes = Some("cut the prologue".into());

        let prompt = chapter_prompt(&request);
        assert!(prompt.contains("ORIGINAL CHAPTER:\nTHE OLD DRAFT"));
        assert!(prompt.contains("EDITOR'S FEEDBACK:\ncut the prologue"));
        assert!(!prompt.contains("CHAPTER TO WRITE"));

        // 没有备注时照常从头写
        request.chapter_notes = None;
        assert!(chapter_prompt(&request).contains("CHAPTER TO WRITE"));
    }

    #[test]
    fn test_summary_prompt_truncates_content() {
        let content = "x".repeat(SUMMARY_SOURCE_CHARS + 100);
        let prompt = summary_prompt(&chapter_request(), &content);
        assert!(prompt.len() < content.len() + 400);
        assert!(!prompt.contains(&content));
    }
}
