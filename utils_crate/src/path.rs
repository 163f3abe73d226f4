#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![deny(unsafe_code, unused_mut, unused_imports, unused_attributes)]

use std::fs;
use std::path::Path;

use tracing::{debug, error, info};

use crate::error::UtilsError;

/// Гарантирует, что директория существует, создавая ее при необходимости.
///
/// # Arguments
/// * `dir_path` - Путь к директории, существование которой нужно обеспечить.
///
/// # Errors
/// Возвращает `UtilsError::Io`, если директория не может быть создана.
/// Возвращает `UtilsError::InvalidParameter`, если по указанному пути существует файл.
pub fn ensure_dir_exists(dir_path: &Path) -> Result<(), UtilsError> {
    if !dir_path.exists() {
        info!("Creating directory: {}", dir_path.display());
        fs::create_dir_all(dir_path)
            .map_err(|e| UtilsError::io_with_path(e, dir_path.to_string_lossy().into_owned()))?;
        debug!("Directory created: {}", dir_path.display());
    } else if !dir_path.is_dir() {
        let err_msg = format!("Path {} exists but is not a directory.", dir_path.display());
        error!("{}", err_msg);
        return Err(UtilsError::InvalidParameter(err_msg));
    } else {
        debug!("Directory already exists: {}", dir_path.display());
    }
    Ok(())
}

/// Очищает строку, чтобы ее можно было безопасно использовать как компонент пути
/// (например, имя эксперимента как имя поддиректории).
/// Заменяет потенциально проблемные символы на подчеркивания (`_`).
pub fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '.' | '_' => c,
            _ => '_',
        })
        .collect()
}
