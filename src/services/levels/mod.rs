//! 年级管理
//!
//! 年级数量很少，列表不分页，按 rank 排序返回。

pub mod manage;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::levels::requests::{CreateLevelRequest, UpdateLevelRequest};
use crate::storage::Storage;

pub struct LevelService {
    storage: Option<Arc<dyn Storage>>,
}

impl LevelService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => crate::services::storage_from_request(request),
        }
    }

    pub async fn create_level(
        &self,
        req: CreateLevelRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::create_level(self, req, request).await
    }

    pub async fn list_levels(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        manage::list_levels(self, request).await
    }

    pub async fn get_level(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        manage::get_level(self, id, request).await
    }

    pub async fn update_level(
        &self,
        id: i64,
        req: UpdateLevelRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::update_level(self, id, req, request).await
    }

    pub async fn delete_level(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        manage::delete_level(self, id, request).await
    }
}
