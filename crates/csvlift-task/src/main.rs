use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;
use serde::Serialize;
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use csvlift_core::{
    DriverError, ExportError, OracleDriver, OracleOptions, S3Driver, S3Options, TableTarget, TaskConfig, UploadError,
    logs_dir,
};

mod export;

/// 单表导出：Oracle -> CSV -> S3
///
/// 连接与凭据从环境变量读取（启动时先加载当前目录下的 `.env`），
/// 也可以通过同名参数覆盖。
#[derive(Debug, Parser)]
#[command(name = "csvlift", version)]
pub struct Args {
    #[arg(long, env = "ORACLE_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "ORACLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "ORACLE_DSN")]
    pub dsn: Option<String>,

    /// Instant Client 目录
    #[arg(long, env = "ORACLE_CLIENT_PATH")]
    pub client_path: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "S3_BUCKET_NAME")]
    pub bucket: Option<String>,

    #[arg(long, default_value = "classicmodels")]
    pub schema: String,

    #[arg(long, default_value = "productlines")]
    pub table: String,

    /// 逗号分隔的列名
    #[arg(long, value_delimiter = ',', default_value = "productLine,textDescription")]
    pub columns: Vec<String>,

    /// CSV 输出目录，必须已存在
    #[arg(long, default_value = "task_1-2")]
    pub output_dir: PathBuf,

    /// 日志目录，默认 ~/.csvlift/logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> TaskConfig {
        TaskConfig {
            source: OracleOptions {
                username: self.username,
                password: self.password,
                dsn: self.dsn,
                client_lib_dir: self.client_path,
            },
            target: TableTarget {
                schema: self.schema,
                table: self.table,
                columns: self.columns.into_iter().map(|c| c.trim().to_string()).collect(),
            },
            output_dir: self.output_dir,
            storage: S3Options {
                access_key_id: self.access_key_id,
                secret_access_key: self.secret_access_key,
                region: self.region,
                bucket: self.bucket,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    ClientInit(DriverError),
    #[error("数据库错误: {0}")]
    Database(DriverError),
    #[error("写入 CSV 失败: {0}")]
    Write(ExportError),
    #[error("上传失败: {0}")]
    Upload(UploadError),
}

impl TaskError {
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskError::ClientInit(_) => 1,
            TaskError::Database(_) => 2,
            TaskError::Write(_) => 3,
            TaskError::Upload(_) => 4,
        }
    }
}

/// 任务输出消息（写入 stdout 的 JSON Lines）
#[derive(Debug, Serialize)]
pub struct ProgressMessage {
    kind: MessageKind,
    data: serde_json::Value,
}

/// 消息类型
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Status,
    Error,
    Completed,
}

/// 初始化任务日志系统
fn init_task_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(layer().with_writer(stdout));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("csvlift")
        .filename_suffix("log")
        .build(log_dir);

    match appender {
        Ok(appender) => {
            let (non_blocking, guard) = non_blocking(appender);
            registry.with(layer().with_writer(non_blocking).with_ansi(false)).init();
            Some(guard)
        }
        Err(err) => {
            registry.init();
            tracing::warn!("无法创建日志文件，仅输出到控制台: {}", err);
            None
        }
    }
}

fn main() {
    // 1. 加载 .env，已存在的环境变量优先
    let _ = dotenvy::dotenv();

    // 2. 解析参数与环境变量
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    // 3. 初始化日志系统
    let log_dir = args.log_dir.clone().unwrap_or_else(logs_dir);
    let log_guard = init_task_logging(&log_dir);

    let run_id = Uuid::new_v4().to_string();
    tracing::info!("任务进程启动，run_id: {}", run_id);

    let config = args.into_config();
    tracing::info!(
        "导出目标: {} -> {}",
        config.target.qualified_name(),
        config.output_file().display()
    );

    // 4. 执行导出
    let code = match export::run(&OracleDriver, &S3Driver, &config) {
        Ok(summary) => {
            print_completed(serde_json::json!({
                "status": "success",
                "run_id": run_id,
                "target": config.target,
                "summary": summary,
                "finished_at": chrono::Utc::now().to_rfc3339(),
            }));
            0
        }
        Err(err) => {
            tracing::error!("任务失败: {}", err);
            print_error("fatal", &err.to_string());
            err.exit_code()
        }
    };

    drop(log_guard);
    exit(code);
}

pub fn print_status(
    step: &str,
    message: &str,
) {
    print_progress(ProgressMessage {
        kind: MessageKind::Status,
        data: serde_json::json!({
            "step": step,
            "message": message,
        }),
    });
}

pub fn print_error(
    severity: &str,
    message: &str,
) {
    print_progress(ProgressMessage {
        kind: MessageKind::Error,
        data: serde_json::json!({
            "severity": severity,
            "message": message,
        }),
    });
}

pub fn print_completed(data: serde_json::Value) {
    print_progress(ProgressMessage {
        kind: MessageKind::Completed,
        data,
    });
}

pub fn print_progress(msg: ProgressMessage) {
    if let Ok(json) = serde_json::to_string(&msg) {
        println!("{}", json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_fixed_target() {
        let config = Args::try_parse_from(["csvlift"]).unwrap().into_config();

        assert_eq!(config.target, TableTarget::default());
        assert_eq!(config.output_dir, PathBuf::from("task_1-2"));
    }

    #[test]
    fn flags_fill_config() {
        let args = Args::try_parse_from([
            "csvlift",
            "--username",
            "scott",
            "--dsn",
            "db.example.com:1521/ORCLPDB1",
            "--bucket",
            "exports",
            "--schema",
            "hr",
            "--table",
            "employees",
            "--columns",
            "employee_id, last_name",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let config = args.into_config();

        assert_eq!(config.source.username.as_deref(), Some("scott"));
        assert_eq!(config.source.dsn.as_deref(), Some("db.example.com:1521/ORCLPDB1"));
        assert_eq!(config.storage.bucket.as_deref(), Some("exports"));
        assert_eq!(config.target.columns, vec!["employee_id", "last_name"]);
        assert_eq!(config.object_key(), "out/hr.employees.csv");
    }

    #[test]
    fn exit_codes() {
        let init = TaskError::ClientInit(DriverError::Init("DPI-1047".into()));
        assert_eq!(init.exit_code(), 1);
        assert_eq!(init.to_string(), "客户端初始化失败: DPI-1047");
        assert_eq!(TaskError::Database(DriverError::Other("ORA-00942".into())).exit_code(), 2);
        assert_eq!(
            TaskError::Upload(UploadError::MissingField("region".into())).exit_code(),
            4
        );
    }

    #[test]
    fn messages_are_tagged_snake_case() {
        let msg = ProgressMessage {
            kind: MessageKind::Completed,
            data: serde_json::json!({ "rows": 1 }),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"kind":"completed","data":{"rows":1}}"#
        );
    }
}
