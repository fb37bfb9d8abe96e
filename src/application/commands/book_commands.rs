//! Book Commands

use crate::domain::book::BookId;

/// 创建书籍命令
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    /// 大纲生成前的备注
    pub notes: Option<String>,
}

/// 批量导入中的一行
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub title: String,
    pub notes: Option<String>,
}

/// 批量导入命令（已存在的标题被跳过）
#[derive(Debug, Clone)]
pub struct ImportBooks {
    pub rows: Vec<ImportRow>,
}

/// 删除书籍命令
#[derive(Debug, Clone)]
pub struct DeleteBook {
    pub book_id: BookId,
}

/// 提交流水线运行命令
#[derive(Debug, Clone)]
pub struct RunBook {
    pub book_id: BookId,
    /// 未指定时使用配置中的默认值
    pub auto_approve: Option<bool>,
}

/// 清除 paused / error 并重新排队
#[derive(Debug, Clone)]
pub struct ResumeBook {
    pub book_id: BookId,
    pub auto_approve: Option<bool>,
}

/// 编译命令
#[derive(Debug, Clone)]
pub struct CompileBook {
    pub book_id: BookId,
}
