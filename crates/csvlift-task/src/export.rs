use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use csvlift_core::{
    DatabaseDriver, DriverError, OracleOptions, QueryResp, S3Options, StorageDriver, TaskConfig, UploadError,
    upload::upload_file, write_csv,
};

use crate::{TaskError, print_status};

/// 导出结果
#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub exported_rows: u64,
    pub uploaded_bytes: u64,
    pub output_file: PathBuf,
    pub object: String,
    pub elapsed_seconds: String,
}

/// 单表导出任务：初始化客户端 -> 查询 -> 写 CSV -> 上传
///
/// 每一步只执行一次，任一步失败即终止，后续步骤不再执行。
pub fn run<D, S>(
    db: &D,
    storage: &S,
    config: &TaskConfig,
) -> Result<ExportSummary, TaskError>
where
    D: DatabaseDriver<Config = OracleOptions>,
    S: StorageDriver<Config = S3Options>,
{
    let start_time = Instant::now();
    let sql = config.target.query_sql().map_err(TaskError::Database)?;

    // 1. 加载本地客户端库，失败时不尝试连接
    tracing::info!("初始化 Oracle 客户端");
    db.init_client(&config.source).map_err(TaskError::ClientInit)?;

    // 2. 查询全部数据
    print_status("extract", &format!("查询 {}", config.target.qualified_name()));
    let resp = extract(db, &config.source, &sql).map_err(TaskError::Database)?;
    tracing::info!("查询完成，共 {} 列 {} 行", resp.cols.len(), resp.rows.len());

    // 3. 写入本地 CSV
    let output_file = config.output_file();
    print_status("write", &format!("写入 {}", output_file.display()));
    let exported_rows = write_csv(&output_file, &resp).map_err(TaskError::Write)?;
    tracing::info!(
        "'{}' 已保存到本地: {}",
        config.target.qualified_name(),
        output_file.display()
    );

    // 4. 上传，客户端创建失败则直接终止
    let key = config.object_key();
    print_status("upload", &format!("上传 {}", config.storage.endpoint(&key)));
    let store = storage.create_client(&config.storage).map_err(|err| {
        tracing::error!("无法连接 S3: {}", err);
        TaskError::Upload(err)
    })?;
    let bucket = match config.storage.bucket.as_deref() {
        Some(bucket) if !bucket.trim().is_empty() => bucket,
        _ => return Err(TaskError::Upload(UploadError::MissingField("bucket".into()))),
    };
    let uploaded_bytes = upload_file(store.as_ref(), bucket, &key, &output_file).map_err(TaskError::Upload)?;
    tracing::info!(
        "'{}' 已上传: {}（{} 字节）",
        config.target.qualified_name(),
        config.storage.endpoint(&key),
        uploaded_bytes
    );

    Ok(ExportSummary {
        exported_rows,
        uploaded_bytes,
        output_file,
        object: config.storage.endpoint(&key),
        elapsed_seconds: format!("{:.1}", start_time.elapsed().as_secs_f64()),
    })
}

/// 打开连接执行一次查询，无论成败都关闭连接
fn extract<D>(
    db: &D,
    source: &OracleOptions,
    sql: &str,
) -> Result<QueryResp, DriverError>
where
    D: DatabaseDriver<Config = OracleOptions>,
{
    tracing::info!("正在连接数据库: {}", source.endpoint());
    let mut session = db.create_connection(source)?;
    tracing::info!("数据库连接成功");

    let result = session.query(sql);
    if let Err(err) = &result {
        tracing::error!("查询失败: {}", err);
    }

    match session.close() {
        Ok(()) => tracing::info!("数据库连接已关闭"),
        Err(err) => tracing::warn!("{}", err),
    }

    result
}
