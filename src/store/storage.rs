//! 偏好持久化存储
//!
//! 将用户的语言选择以纯文本形式保存在数据目录下的单个键文件中，
//! 进程重启后依然有效。写入走临时文件加改名，单键更新是原子的。

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::store::config::constants::STORAGE_KEY;
use crate::store::error::StoreResult;
use crate::store::language::Language;

/// 按键文件存取语言偏好
#[derive(Debug, Clone)]
pub struct PreferenceStorage {
    dir: PathBuf,
}

impl PreferenceStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 键文件完整路径
    pub fn key_path(&self) -> PathBuf {
        self.dir.join(STORAGE_KEY)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 读取持久化的语言代码
    ///
    /// 文件缺失、不可读或内容无法识别都返回 `None`，
    /// 调用方随后回退到自动检测。
    pub fn load(&self) -> Option<Language> {
        let raw = std::fs::read_to_string(self.key_path()).ok()?;
        let code = raw.trim();
        match Language::from_code(code) {
            Some(lang) => Some(lang),
            None => {
                warn!("持久化语言代码无法识别，忽略: {:?}", code);
                None
            }
        }
    }

    /// 持久化语言代码
    pub fn save(&self, lang: Language) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", STORAGE_KEY));
        std::fs::write(&tmp, lang.code())?;
        std::fs::rename(&tmp, self.key_path())?;
        Ok(())
    }

    /// 删除持久化偏好
    pub fn clear(&self) -> StoreResult<()> {
        match std::fs::remove_file(self.key_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self) -> bool {
        self.key_path().exists()
    }
}
