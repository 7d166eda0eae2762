//! 룰 카탈로그 로더 -- YAML 룰 파일을 디스크에서 로드합니다.
//!
//! 경로가 파일이면 그 파일 하나를, 디렉토리이면 그 안의 `.yml`/`.yaml`
//! 파일을 이름순으로 읽습니다. 각 파일은 룰 목록(YAML 시퀀스)입니다.
//! 디렉토리 모드에서 개별 파일 로딩 실패는 경고 로그를 남기고 건너뜁니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::LogPipelineError;

use super::catalog::RuleCatalog;
use super::types::Rule;

/// 룰 파일 최대 크기
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
/// 카탈로그 최대 룰 수
const MAX_RULES_COUNT: usize = 10_000;

/// 룰 카탈로그 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 경로(파일 또는 디렉토리)에서 카탈로그를 로드합니다.
    ///
    /// 결과 카탈로그에는 시스템 룰이 포함됩니다.
    pub async fn load_catalog(path: impl AsRef<Path>) -> Result<RuleCatalog, LogPipelineError> {
        let rules = Self::load_path(path).await?;
        Ok(RuleCatalog::with_system_rules(rules))
    }

    /// 경로(파일 또는 디렉토리)에서 룰을 로드합니다.
    pub async fn load_path(path: impl AsRef<Path>) -> Result<Vec<Rule>, LogPipelineError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read metadata: {e}"),
            })?;

        if metadata.is_dir() {
            Self::load_directory(path).await
        } else {
            let rules = Self::load_file(path).await?;
            check_count(path, rules.len())?;
            tracing::info!(path = %path.display(), count = rules.len(), "loaded rule catalog");
            Ok(rules)
        }
    }

    /// 디렉토리에서 모든 YAML 룰 파일을 로드합니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 룰 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<Rule>, LogPipelineError> {
        let dir = dir.as_ref();

        let mut entries =
            tokio::fs::read_dir(dir)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory: {e}"),
                })?;

        let mut files: Vec<PathBuf> = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if is_yaml {
                files.push(path);
            }
        }
        files.sort();

        let mut rules = Vec::new();
        let mut seen_names = HashSet::new();

        for path in files {
            match Self::load_file(&path).await {
                Ok(file_rules) => {
                    for rule in file_rules {
                        if !seen_names.insert(rule.event_name.clone()) {
                            tracing::warn!(
                                event_name = %rule.event_name,
                                path = %path.display(),
                                "duplicate eventName, skipping"
                            );
                            continue;
                        }
                        rules.push(rule);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load rule file, skipping"
                    );
                }
            }

            check_count(dir, rules.len())?;
        }

        tracing::info!(
            dir = %dir.display(),
            count = rules.len(),
            "loaded rule catalog"
        );

        Ok(rules)
    }

    /// 단일 YAML 파일에서 룰 목록을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<Rule>, LogPipelineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 룰 목록으로 파싱하고 검증합니다.
    ///
    /// 같은 파일 안의 중복 이름은 경고 후 뒤쪽을 무시합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<Rule>, LogPipelineError> {
        let parsed: Vec<Rule> =
            serde_yaml::from_str(yaml_str).map_err(|e| LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(parsed.len());
        for rule in parsed {
            rule.validate()?;
            if !seen.insert(rule.event_name.clone()) {
                tracing::warn!(
                    event_name = %rule.event_name,
                    source,
                    "duplicate eventName in file, skipping"
                );
                continue;
            }
            rules.push(rule);
        }
        Ok(rules)
    }
}

fn check_count(path: &Path, count: usize) -> Result<(), LogPipelineError> {
    if count > MAX_RULES_COUNT {
        return Err(LogPipelineError::RuleLoad {
            path: path.display().to_string(),
            reason: format!("too many rules: max {MAX_RULES_COUNT}"),
        });
    }
    Ok(())
}
