use std::{io, path::Path};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::QueryResp;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// 将完整结果集写入 CSV 文件，覆盖已有文件
///
/// 首行为列名，其余每行一条记录，行尾 `\r\n`。目录必须已存在。
/// 返回写入的数据行数（不含表头）。
pub fn write_csv(
    path: &Path,
    resp: &QueryResp,
) -> Result<u64, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_path(path)?;

    writer.write_record(&resp.cols)?;
    for row in &resp.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(resp.rows.len() as u64)
}
