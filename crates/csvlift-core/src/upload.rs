use std::{fs, io, path::Path};

use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::S3Options;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("配置字段缺失: {0}")]
    MissingField(String),

    #[error("无法创建存储客户端: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("上传失败: {0}")]
    Request(String),
}

pub trait StorageDriver {
    type Config;

    fn create_client(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn ObjectStore>, UploadError>;
}

pub trait ObjectStore {
    /// 单次 PUT，覆盖同名对象
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), UploadError>;
}

/// 读取本地文件的全部字节并上传，返回上传字节数
pub fn upload_file(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    path: &Path,
) -> Result<u64, UploadError> {
    let body = fs::read(path)?;
    let size = body.len() as u64;
    store.put_object(bucket, key, body)?;
    Ok(size)
}

#[derive(Debug, Clone, Copy)]
pub struct S3Driver;

impl StorageDriver for S3Driver {
    type Config = S3Options;

    fn create_client(
        &self,
        config: &Self::Config,
    ) -> Result<Box<dyn ObjectStore>, UploadError> {
        let access_key_id = require(&config.access_key_id, "access_key_id")?;
        let secret_access_key = require(&config.secret_access_key, "secret_access_key")?;
        let region = require(&config.region, "region")?;

        // SDK 只提供异步接口，单线程运行时足够完成一次 PUT
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| UploadError::Client(format!("创建运行时失败: {}", err)))?;

        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "csvlift");
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();

        tracing::debug!(region = %region, "S3 客户端已创建");
        Ok(Box::new(S3Store {
            client: Client::from_conf(conf),
            runtime,
        }))
    }
}

struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl ObjectStore for S3Store {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), UploadError> {
        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send();

        self.runtime
            .block_on(request)
            .map_err(|err| UploadError::Request(format!("s3://{}/{}: {}", bucket, key, DisplayErrorContext(&err))))?;
        Ok(())
    }
}

fn require<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, UploadError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(UploadError::MissingField(field.into())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl ObjectStore for RecordingStore {
        fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Vec<u8>,
        ) -> Result<(), UploadError> {
            self.puts.lock().unwrap().push((bucket.into(), key.into(), body));
            Ok(())
        }
    }

    fn options() -> S3Options {
        S3Options {
            access_key_id: Some("AKIDEXAMPLE".into()),
            secret_access_key: Some("secret".into()),
            region: Some("ap-southeast-1".into()),
            bucket: Some("exports".into()),
        }
    }

    #[test]
    fn client_requires_credentials_and_region() {
        for (field, config) in [
            ("access_key_id", S3Options { access_key_id: None, ..options() }),
            ("secret_access_key", S3Options { secret_access_key: Some(" ".into()), ..options() }),
            ("region", S3Options { region: None, ..options() }),
        ] {
            match S3Driver.create_client(&config) {
                Err(UploadError::MissingField(name)) => assert_eq!(name, field),
                Err(other) => panic!("unexpected error for {field}: {other}"),
                Ok(_) => panic!("client created without {field}"),
            }
        }
    }

    #[test]
    fn client_builds_without_network() {
        assert!(S3Driver.create_client(&options()).is_ok());
    }

    #[test]
    fn upload_file_sends_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, b"A,B\n1,2\n").unwrap();

        let store = RecordingStore::default();
        let size = upload_file(&store, "exports", "task_1-2/a.csv", &path).unwrap();

        assert_eq!(size, 8);
        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "exports");
        assert_eq!(puts[0].1, "task_1-2/a.csv");
        assert_eq!(puts[0].2, b"A,B\n1,2\n");
    }

    #[test]
    fn upload_file_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();

        let err = upload_file(&store, "exports", "k", &dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
        assert!(store.puts.lock().unwrap().is_empty());
    }
}
