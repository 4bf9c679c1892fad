use oracle::{Connection, InitParams};

use crate::OracleOptions;

use super::{DatabaseDriver, DatabaseSession, DriverError, QueryResp, require};

/// Oracle 驱动（thick 模式，依赖 Instant Client）
#[derive(Debug, Clone, Copy)]
pub struct OracleDriver;

impl DatabaseDriver for OracleDriver {
    type Config = OracleOptions;

    fn init_client(
        &self,
        config: &Self::Config,
    ) -> Result<(), DriverError> {
        let mut params = InitParams::new();
        if let Some(dir) = config.client_lib_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            tracing::debug!(lib_dir = %dir, "指定 Instant Client 目录");
            params
                .oracle_client_lib_dir(dir)
                .map_err(|err| DriverError::Init(err.to_string()))?;
        }

        let fresh = params.init().map_err(|err| DriverError::Init(err.to_string()))?;
        if !fresh {
            tracing::debug!("Oracle 客户端已初始化，忽略重复调用");
        }
        Ok(())
    }

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let conn = open_conn(config)?;
        Ok(Box::new(OracleSession::new(conn)))
    }
}

struct OracleSession {
    conn: Connection,
}

impl OracleSession {
    fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl DatabaseSession for OracleSession {
    fn query(
        &mut self,
        sql: &str,
    ) -> Result<QueryResp, DriverError> {
        tracing::debug!(sql = %sql);

        let result = self
            .conn
            .query(sql, &[])
            .map_err(|err| DriverError::Other(format!("执行查询失败: {}", err)))?;

        let cols: Vec<String> = result
            .column_info()
            .iter()
            .map(|info| info.name().to_string())
            .collect();

        let mut rows = vec![];
        for row in result {
            let row = row.map_err(|err| DriverError::Other(format!("读取结果失败: {}", err)))?;
            let mut values = Vec::with_capacity(cols.len());
            for idx in 0..cols.len() {
                let value: Option<String> = row
                    .get(idx)
                    .map_err(|err| DriverError::Other(format!("读取第 {} 列失败: {}", idx + 1, err)))?;
                values.push(value.unwrap_or_default());
            }
            rows.push(values);
        }

        Ok(QueryResp { cols, rows })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn
            .close()
            .map_err(|err| DriverError::Other(format!("关闭连接失败: {}", err)))
    }
}

fn open_conn(config: &OracleOptions) -> Result<Connection, DriverError> {
    let username = require(&config.username, "username")?;
    let password = require(&config.password, "password")?;
    let dsn = require(&config.dsn, "dsn")?;

    Connection::connect(username, password, dsn).map_err(|err| DriverError::Other(format!("连接失败: {}", err)))
}
