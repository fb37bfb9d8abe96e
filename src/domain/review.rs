//! Review Gate - 评审闸门
//!
//! 把评审状态映射为控制决定。大纲评审、章节评审、终审共用。

use serde::{Deserialize, Serialize};

use super::book::{BookError, ReviewStatus};

/// 闸门决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// 继续，已有备注作为下一次生成的权威输入
    Proceed,
    /// 停住，等待外部给出明确决定
    Hold,
    /// 继续，但不使用备注（单独记录，用于审计和通知措辞）
    AdvanceWithoutNotes,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Proceed => "proceed",
            Decision::Hold => "hold",
            Decision::AdvanceWithoutNotes => "advance_without_notes",
        }
    }

    pub fn advances(&self) -> bool {
        !matches!(self, Decision::Hold)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 评审状态 -> 闸门决定
///
/// 全函数、确定性、无副作用。缺失值与 pending 等价。
/// 显式的 no 同样停住：没有自动补救。
pub fn evaluate(status: Option<ReviewStatus>) -> Decision {
    match status {
        Some(ReviewStatus::Yes) => Decision::Proceed,
        Some(ReviewStatus::NoNotesNeeded) => Decision::AdvanceWithoutNotes,
        Some(ReviewStatus::Pending) | Some(ReviewStatus::No) | None => Decision::Hold,
    }
}

/// 从外部原始取值求决定
///
/// 空字符串视为缺失；封闭取值域之外的值返回 `InvalidStatus`。
pub fn evaluate_raw(raw: &str) -> Result<Decision, BookError> {
    if raw.trim().is_empty() {
        return Ok(evaluate(None));
    }
    ReviewStatus::parse(raw).map(|s| evaluate(Some(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ReviewStatus; 4] = [
        ReviewStatus::Pending,
        ReviewStatus::Yes,
        ReviewStatus::No,
        ReviewStatus::NoNotesNeeded,
    ];

    #[test]
    fn test_evaluate_mapping() {
        assert_eq!(evaluate(Some(ReviewStatus::Pending)), Decision::Hold);
        assert_eq!(evaluate(Some(ReviewStatus::Yes)), Decision::Proceed);
        assert_eq!(evaluate(Some(ReviewStatus::No)), Decision::Hold);
        assert_eq!(
            evaluate(Some(ReviewStatus::NoNotesNeeded)),
            Decision::AdvanceWithoutNotes
        );
        assert_eq!(evaluate(None), Decision::Hold);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        for status in ALL {
            assert_eq!(evaluate(Some(status)), evaluate(Some(status)));
            assert_eq!(
                evaluate_raw(status.as_str()).unwrap(),
                evaluate(Some(status))
            );
        }
    }

    #[test]
    fn test_evaluate_raw_rejects_unknown_values() {
        for raw in ["approved", "YES", "rejected", "maybe"] {
            assert!(matches!(evaluate_raw(raw), Err(BookError::InvalidStatus(_))));
        }
        assert_eq!(evaluate_raw("").unwrap(), Decision::Hold);
        assert_eq!(evaluate_raw(" no_notes_needed ").unwrap(), Decision::AdvanceWithoutNotes);
    }
}
