//! 系统设置与数据备份

pub mod backups;
pub mod settings;
pub mod settings_cache;

pub use settings_cache::DynamicConfig;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::system::requests::{SettingAuditQuery, UpdateSettingRequest};
use crate::storage::Storage;

pub struct SystemService {
    storage: Option<Arc<dyn Storage>>,
}

impl SystemService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => crate::services::storage_from_request(request),
        }
    }

    pub(crate) fn get_config(&self) -> &AppConfig {
        AppConfig::get()
    }

    // 公开设置
    pub async fn get_settings(&self) -> ActixResult<HttpResponse> {
        settings::get_settings(self).await
    }

    pub async fn get_admin_settings(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        settings::get_admin_settings(self, request).await
    }

    pub async fn get_setting(
        &self,
        key: String,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        settings::get_setting(self, key, request).await
    }

    pub async fn update_setting(
        &self,
        key: String,
        body: UpdateSettingRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        settings::update_setting(self, key, body, request).await
    }

    pub async fn get_setting_audits(
        &self,
        query: SettingAuditQuery,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        settings::get_setting_audits(self, query, request).await
    }

    // 备份
    pub async fn create_backup(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        backups::create_backup(self, request).await
    }

    pub async fn list_backups(&self) -> ActixResult<HttpResponse> {
        backups::list_backups(self).await
    }

    pub async fn download_backup(&self, name: String) -> ActixResult<HttpResponse> {
        backups::download_backup(self, name).await
    }

    pub async fn delete_backup(&self, name: String) -> ActixResult<HttpResponse> {
        backups::delete_backup(self, name).await
    }
}
