use crate::error::{AppError, AppResult, BusinessError, FileError};
use crate::models::paper::{Paper, PaperMeta};
use std::path::Path;
use tokio::fs;

/// 从分配表 CSV 文本中筛选出分配给 `user` 的论文
///
/// 分隔符为 `;`。分配列的表头形如 `assignee,,,`，按包含 "assignee" 查找；
/// 值末尾的逗号会被去掉
pub fn parse_assignments(content: &str, user: &str) -> Result<Vec<Paper>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let assignee_col = headers
        .iter()
        .position(|h| h.to_lowercase().contains("assignee"));
    let itemkey_col = column("itemkey");
    let title_col = column("title");
    let author_col = column("author");
    let year_col = column("year");

    let (Some(assignee_col), Some(itemkey_col)) = (assignee_col, itemkey_col) else {
        tracing::warn!("分配表缺少 assignee 或 itemkey 列");
        return Ok(Vec::new());
    };

    let mut papers = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim);

        let assignee = field(Some(assignee_col))
            .unwrap_or_default()
            .trim_end_matches(',')
            .trim();
        if assignee.is_empty() || assignee != user {
            continue;
        }

        let itemkey = field(Some(itemkey_col)).unwrap_or_default();
        if itemkey.is_empty() {
            continue;
        }

        let meta = PaperMeta {
            title: field(title_col).unwrap_or("Unknown Title").to_string(),
            authors: field(author_col).unwrap_or("Unknown Authors").to_string(),
            year: field(year_col).unwrap_or("Unknown Year").to_string(),
        };
        papers.push(Paper::new(itemkey, meta));
    }

    Ok(papers)
}

/// 加载分配给当前标注者的论文列表（保持 CSV 中的顺序）
pub async fn load_assigned_papers(path: &Path, user: &str) -> AppResult<Vec<Paper>> {
    let path_str = path.display().to_string();

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FileError::NotFound { path: path_str }.into());
        }
        Err(e) => return Err(AppError::file_read_failed(&path_str, e)),
    };

    let papers = parse_assignments(&content, user).map_err(|e| FileError::CsvParseFailed {
        path: path_str.clone(),
        source: Box::new(e),
    })?;

    if papers.is_empty() {
        return Err(BusinessError::NoPapersAssigned {
            user: user.to_string(),
            path: path_str,
        }
        .into());
    }

    tracing::info!("✓ 找到 {} 篇分配给 {} 的论文", papers.len(), user);
    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "itemkey;title;author;year;assignee,,,\n\
                       P1;First;Doe;2020;Moritz,,,\n\
                       P2;Second;Roe;2021;Andreas\n\
                       ;Missing key;Nobody;2022;Moritz\n\
                       P3;Third;Poe;2023; Moritz ,\n";

    #[test]
    fn test_filters_by_assignee_and_keeps_order() {
        let papers = parse_assignments(CSV, "Moritz").unwrap();
        let keys: Vec<_> = papers.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["P1", "P3"]);
        assert_eq!(papers[0].meta.title, "First");
        assert_eq!(papers[1].meta.authors, "Poe");
    }

    #[test]
    fn test_missing_columns_default_to_unknown() {
        let papers = parse_assignments("itemkey;Assignee\nK1;Shu\n", "Shu").unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].meta.title, "Unknown Title");
        assert_eq!(papers[0].meta.year, "Unknown Year");
    }

    #[tokio::test]
    async fn test_no_assigned_papers_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        tokio::fs::write(&path, CSV).await.unwrap();

        let err = load_assigned_papers(&path, "Tobias").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Business(BusinessError::NoPapersAssigned { .. })
        ));

        let papers = load_assigned_papers(&path, "Andreas").await.unwrap();
        assert_eq!(papers.len(), 1);
    }
}
