//! # ページネーション付きレスポンス
//!
//! ページ番号ベースのページネーションに対応した API レスポンス型。

use serde::{Deserialize, Serialize};

/// ページネーションメタ情報
///
/// `total` は全件数、`pages` は `total` と `limit` から導出される総ページ数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub total: i64,
    pub page:  u32,
    pub pages: u32,
    pub limit: u32,
}

/// ページネーション付きレスポンス
///
/// `ApiResponse<T>` が単一データ用であるのに対し、
/// `PagedResponse<T>` はリスト + ページメタ情報の形式。
///
/// ## JSON 形式
///
/// ```json
/// {
///   "data": [...],
///   "pagination": { "total": 42, "page": 1, "pages": 5, "limit": 10 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub data:       Vec<T>,
    pub pagination: PageInfo,
}

impl<T> PagedResponse<T> {
    /// 新しい `PagedResponse` を作成する
    ///
    /// `pages` は `ceil(total / limit)` で計算する。`limit` が 0 の場合は
    /// 0 ページとして扱う（ゼロ除算の防止）。
    pub fn new(data: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            (total.max(0) as u64).div_ceil(u64::from(limit)) as u32
        };
        Self {
            data,
            pagination: PageInfo {
                total,
                page,
                pages,
                limit,
            },
        }
    }
}
