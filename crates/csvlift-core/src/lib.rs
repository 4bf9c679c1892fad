use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use serde::{Deserialize, Serialize};

// 核心模块导出
pub mod driver;
pub mod export;
pub mod paths;
pub mod upload;

pub use driver::{DatabaseDriver, DatabaseSession, DriverError, OracleDriver, QueryResp, validate_ident};
pub use export::{ExportError, write_csv};
pub use paths::{logs_dir, root_dir};
pub use upload::{ObjectStore, S3Driver, StorageDriver, UploadError};

// ============================================================================
// Model Types
// ============================================================================

#[derive(Clone, Default)]
pub struct OracleOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub dsn: Option<String>,
    /// Instant Client 所在目录（thick 模式）
    pub client_lib_dir: Option<String>,
}

impl OracleOptions {
    pub fn endpoint(&self) -> String {
        match self.dsn.as_deref().map(str::trim) {
            Some(dsn) if !dsn.is_empty() => format!("oracle://{}", dsn),
            _ => "oracle://<未配置 DSN>".into(),
        }
    }
}

#[derive(Clone, Default)]
pub struct S3Options {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
}

impl S3Options {
    pub fn endpoint(
        &self,
        key: &str,
    ) -> String {
        let bucket = self.bucket.as_deref().unwrap_or("<未配置 bucket>");
        format!("s3://{}/{}", bucket, key)
    }
}

/// 导出目标表
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTarget {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl Default for TableTarget {
    fn default() -> Self {
        Self {
            schema: "classicmodels".into(),
            table: "productlines".into(),
            columns: vec!["productLine".into(), "textDescription".into()],
        }
    }
}

impl TableTarget {
    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.qualified_name())
    }

    /// 校验所有标识符，随后拼接查询语句
    pub fn query_sql(&self) -> Result<String, DriverError> {
        if self.columns.is_empty() {
            return Err(DriverError::MissingField("columns".into()));
        }
        validate_ident(&self.schema)?;
        validate_ident(&self.table)?;
        for column in &self.columns {
            validate_ident(column)?;
        }

        Ok(format!(
            "SELECT {} FROM {}",
            self.columns.join(", "),
            self.qualified_name()
        ))
    }
}

/// 一次导出任务的完整配置，启动时构造一次
#[derive(Clone)]
pub struct TaskConfig {
    pub source: OracleOptions,
    pub target: TableTarget,
    pub output_dir: PathBuf,
    pub storage: S3Options,
}

impl TaskConfig {
    /// 本地文件路径 `<output_dir>/<schema>.<table>.csv`
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(self.target.file_name())
    }

    /// 对象 key 与本地路径一致，统一使用 `/` 分隔
    pub fn object_key(&self) -> String {
        object_key(&self.output_file())
    }
}

pub fn object_key(path: &Path) -> String {
    path.to_string_lossy().replace(MAIN_SEPARATOR, "/")
}
