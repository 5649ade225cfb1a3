//! 签发器配置
//!
//! Issuer-wide defaults shared by every issuance.

use std::path::Path;

use certwright_pki::{KeyUsage, DEFAULT_KEY_USAGES};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    api::{IssuerConfig, IssuerScope, PRIVATE_KEY_ANNOTATION},
    error::{IssuerError, Result},
};

/// 签发器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerOptions {
    /// Namespace holding resources of cluster scoped issuers
    pub cluster_resource_namespace: String,
    /// 默认证书有效期（小时）
    pub default_duration_hours: u32,
    /// 最短证书有效期（小时）
    pub minimum_duration_hours: u32,
    /// Usages applied when a request names none
    pub default_usages: Vec<KeyUsage>,
    /// Annotation naming the private key secret
    pub private_key_annotation: String,
}

impl Default for IssuerOptions {
    fn default() -> Self {
        Self {
            cluster_resource_namespace: "kube-system".to_string(),
            default_duration_hours: 2160, // 90天
            minimum_duration_hours: 1,
            default_usages: DEFAULT_KEY_USAGES.to_vec(),
            private_key_annotation: PRIVATE_KEY_ANNOTATION.to_string(),
        }
    }
}

impl IssuerOptions {
    /// 从JSON字符串加载配置
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_cluster_resource_namespace(mut self, namespace: &str) -> Self {
        self.cluster_resource_namespace = namespace.to_string();
        self
    }

    /// 设置有效期
    pub fn with_durations(mut self, default_hours: u32, minimum_hours: u32) -> Self {
        self.default_duration_hours = default_hours;
        self.minimum_duration_hours = minimum_hours;
        self
    }

    pub fn with_default_usages(mut self, usages: &[KeyUsage]) -> Self {
        self.default_usages = usages.to_vec();
        self
    }

    pub fn with_private_key_annotation(mut self, annotation: &str) -> Self {
        self.private_key_annotation = annotation.to_string();
        self
    }

    pub fn default_duration(&self) -> Duration {
        Duration::hours(i64::from(self.default_duration_hours))
    }

    pub fn minimum_duration(&self) -> Duration {
        Duration::hours(i64::from(self.minimum_duration_hours))
    }

    /// Namespace that holds the issuer's own resources
    pub fn resource_namespace(&self, issuer: &IssuerConfig) -> String {
        match &issuer.scope {
            IssuerScope::Namespaced(namespace) => namespace.clone(),
            IssuerScope::Cluster => self.cluster_resource_namespace.clone(),
        }
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.cluster_resource_namespace.is_empty() {
            return Err(IssuerError::Config(
                "cluster_resource_namespace must not be empty".to_string(),
            ));
        }
        if self.private_key_annotation.is_empty() {
            return Err(IssuerError::Config(
                "private_key_annotation must not be empty".to_string(),
            ));
        }
        if self.minimum_duration_hours == 0 {
            return Err(IssuerError::Config(
                "minimum_duration_hours must be positive".to_string(),
            ));
        }
        if self.default_duration_hours < self.minimum_duration_hours {
            return Err(IssuerError::Config(format!(
                "default_duration_hours ({}) is below minimum_duration_hours ({})",
                self.default_duration_hours, self.minimum_duration_hours
            )));
        }
        Ok(())
    }
}
