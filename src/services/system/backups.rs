//! 数据备份：每次备份生成一个 zip，内含 manifest.json 与每张表一个 JSON 文档
//!
//! 备份文件名固定为 `backup-YYYYMMDD-HHMMSS-xxxxxxxx.zip`，
//! 下载与删除前都会按同一规则校验，路径不会跳出备份目录。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Value, json};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use super::SystemService;
use crate::errors::{Result, RollcallError};
use crate::models::system::responses::{BackupInfo, BackupListResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::utils::validate::validate_backup_name;

const MANIFEST_NAME: &str = "manifest.json";

pub(crate) fn backup_name(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("backup-{}-{}.zip", now.format("%Y%m%d-%H%M%S"), &suffix[..8])
}

fn created_at_of(name: &str, path: &Path) -> DateTime<Utc> {
    name.get(7..22)
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, "%Y%m%d-%H%M%S").ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            fs::metadata(path)
                .and_then(|meta| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from)
        })
        .unwrap_or_else(Utc::now)
}

/// 写出备份文件，先写临时文件再改名
pub(crate) fn write_archive(
    dir: &Path,
    name: &str,
    tables: &[(String, Value)],
    created_at: DateTime<Utc>,
) -> Result<u64> {
    fs::create_dir_all(dir)?;

    let manifest = json!({
        "app": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "created_at": created_at.to_rfc3339(),
        "tables": tables
            .iter()
            .map(|(table, rows)| json!({
                "name": table,
                "rows": rows.as_array().map_or(0, Vec::len),
            }))
            .collect::<Vec<_>>(),
    });

    let partial = dir.join(format!("{name}.part"));
    let file = File::create(&partial)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    for (table, rows) in tables {
        zip.start_file(format!("{table}.json"), options)?;
        zip.write_all(&serde_json::to_vec(rows)?)?;
    }

    let file = zip.finish()?;
    let size = file.metadata()?.len();
    drop(file);

    let target = dir.join(name);
    fs::rename(&partial, &target)?;
    Ok(size)
}

/// 列出目录中的备份，最新的在前；目录不存在时为空
pub(crate) fn scan_backups(dir: &Path) -> Result<Vec<BackupInfo>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if validate_backup_name(&name).is_err() {
            continue;
        }
        let path = entry.path();
        items.push(BackupInfo {
            size: entry.metadata()?.len(),
            created_at: created_at_of(&name, &path),
            name,
        });
    }

    // 文件名以时间戳开头，字典序即时间序
    items.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(items)
}

/// 只保留最新的 `keep` 个备份，返回被删除的文件名；keep 为 0 时不清理
pub(crate) fn prune_backups(dir: &Path, keep: usize) -> Result<Vec<String>> {
    if keep == 0 {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for stale in scan_backups(dir)?.into_iter().skip(keep) {
        fs::remove_file(dir.join(&stale.name))?;
        removed.push(stale.name);
    }
    Ok(removed)
}

fn backup_dir(service: &SystemService) -> PathBuf {
    PathBuf::from(&service.get_config().backup.dir)
}

/// 在阻塞线程上执行文件操作
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RollcallError::file_operation(format!("备份任务执行失败: {e}")))?
}

fn backup_failed(e: &RollcallError) -> HttpResponse {
    error!("Backup operation failed: {}", e);
    HttpResponse::InternalServerError().json(ApiResponse::error_empty(
        ErrorCode::BackupFailed,
        e.message(),
    ))
}

fn backup_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::BackupNotFound,
        "Backup not found",
    ))
}

pub async fn create_backup(
    service: &SystemService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let tables = match storage.dump_tables().await {
        Ok(tables) => tables,
        Err(e) => return Ok(error_response(&e, "导出数据失败")),
    };

    let dir = backup_dir(service);
    let keep = service.get_config().backup.keep;
    let now = Utc::now();
    let name = backup_name(now);

    let result = {
        let name = name.clone();
        blocking(move || {
            let size = write_archive(&dir, &name, &tables, now)?;
            let removed = prune_backups(&dir, keep)?;
            Ok((size, removed))
        })
        .await
    };

    match result {
        Ok((size, removed)) => {
            info!("Backup {} created ({} bytes)", name, size);
            if !removed.is_empty() {
                info!("Pruned old backups: {}", removed.join(", "));
            }
            Ok(HttpResponse::Created().json(ApiResponse::success(
                BackupInfo {
                    name,
                    size,
                    created_at: now,
                },
                "备份创建成功",
            )))
        }
        Err(e) => Ok(backup_failed(&e)),
    }
}

pub async fn list_backups(service: &SystemService) -> ActixResult<HttpResponse> {
    let dir = backup_dir(service);

    match blocking(move || scan_backups(&dir)).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            BackupListResponse { items },
            "Backups retrieved successfully",
        ))),
        Err(e) => Ok(backup_failed(&e)),
    }
}

pub async fn download_backup(service: &SystemService, name: String) -> ActixResult<HttpResponse> {
    let path = backup_dir(service).join(&name);

    let bytes = blocking(move || match fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    })
    .await;

    match bytes {
        Ok(Some(bytes)) => Ok(HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{name}\""),
            ))
            .body(bytes)),
        Ok(None) => Ok(backup_not_found()),
        Err(e) => Ok(backup_failed(&e)),
    }
}

pub async fn delete_backup(service: &SystemService, name: String) -> ActixResult<HttpResponse> {
    let path = backup_dir(service).join(&name);

    let removed = blocking(move || match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    })
    .await;

    match removed {
        Ok(true) => {
            info!("Backup {} deleted", name);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("备份已删除")))
        }
        Ok(false) => {
            warn!("Backup {} not found for deletion", name);
            Ok(backup_not_found())
        }
        Err(e) => Ok(backup_failed(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rollcall-backup-{}", uuid::Uuid::new_v4().simple()))
    }

    fn sample_tables() -> Vec<(String, Value)> {
        vec![
            ("departments".to_string(), json!([{"id": 1, "name": "理学院"}])),
            ("users".to_string(), json!([])),
        ]
    }

    #[test]
    fn test_backup_name_matches_pattern() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 7, 5, 9).unwrap();
        let name = backup_name(at);
        assert!(name.starts_with("backup-20261019-070509-"));
        assert!(validate_backup_name(&name).is_ok());
        assert_eq!(created_at_of(&name, Path::new("/nonexistent")), at);
    }

    #[test]
    fn test_archive_contains_manifest_and_tables() {
        let dir = scratch_dir();
        let name = backup_name(Utc::now());
        let size = write_archive(&dir, &name, &sample_tables(), Utc::now()).unwrap();
        assert!(size > 0);
        assert!(!dir.join(format!("{name}.part")).exists());

        let file = File::open(dir.join(&name)).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 3);

        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest["tables"][0]["name"], "departments");
        assert_eq!(manifest["tables"][0]["rows"], 1);
        assert!(archive.by_name("users.json").is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_ignores_foreign_files_and_prunes_oldest() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();
        let names = [
            "backup-20261001-080000-0000000a.zip",
            "backup-20261002-080000-0000000b.zip",
            "backup-20261003-080000-0000000c.zip",
        ];
        for name in names {
            fs::write(dir.join(name), b"zip").unwrap();
        }
        fs::write(dir.join("notes.txt"), b"keep me").unwrap();

        let listed = scan_backups(&dir).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name, names[2]);

        let removed = prune_backups(&dir, 2).unwrap();
        assert_eq!(removed, vec![names[0].to_string()]);
        assert!(dir.join("notes.txt").exists());
        assert_eq!(prune_backups(&dir, 0).unwrap(), Vec::<String>::new());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        assert!(scan_backups(&scratch_dir()).unwrap().is_empty());
    }
}
