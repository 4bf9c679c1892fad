pub use self::oracle::OracleDriver;

mod oracle;

/// 查询结果，行与列一一对应，NULL 统一为空串
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResp {
    pub cols: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("客户端初始化失败: {0}")]
    Init(String),
    #[error("{0}")]
    Other(String),
    #[error("配置字段缺失: {0}")]
    MissingField(String),
    #[error("配置字段非法: {0}")]
    InvalidField(String),
}

pub trait DatabaseDriver {
    type Config;

    /// 加载本地客户端库，必须在建立连接之前调用
    fn init_client(
        &self,
        config: &Self::Config,
    ) -> Result<(), DriverError>;

    fn create_connection(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn DatabaseSession>, DriverError>;
}

pub trait DatabaseSession: Send {
    /// 执行查询并一次性取回全部结果
    fn query(
        &mut self,
        sql: &str,
    ) -> Result<QueryResp, DriverError>;

    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// 校验 Oracle 非引用标识符：字母开头，仅含字母、数字、`_`、`$`、`#`
pub fn validate_ident(ident: &str) -> Result<(), DriverError> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
        }
        None => false,
    };

    if !valid {
        return Err(DriverError::InvalidField(format!("非法标识符: {:?}", ident)));
    }
    Ok(())
}

pub(crate) fn require<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, DriverError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DriverError::MissingField(field.into())),
    }
}
