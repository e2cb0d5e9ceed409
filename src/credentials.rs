//! 只读用户凭据存储：启动时从 JSON 文件加载一次。

use serde::Deserialize;
use std::path::Path;
use tokio::sync::RwLock;

use crate::config::{ConfigError, read_file};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialRecord {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
struct CredentialFile {
    users: Vec<CredentialRecord>,
}

/// Ordered credential records guarded by a read-write lock.
#[derive(Debug)]
pub struct CredentialStore {
    records: RwLock<Vec<CredentialRecord>>,
}

impl CredentialStore {
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// 读取并解析凭据文件。
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = read_file(path)?;
        Self::from_slice(&bytes)
    }

    /// 解析 `{"users": [{"username": .., "password": ..}]}` 格式的内容。
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let file: CredentialFile =
            serde_json::from_slice(bytes).map_err(ConfigError::Credentials)?;
        Ok(Self::new(file.users))
    }

    /// 校验用户名与密码是否与某条记录完全一致。
    pub async fn validate(&self, username: &str, password: &str) -> bool {
        let records = self.records.read().await;
        records
            .iter()
            .any(|record| record.username == username && record.password == password)
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
