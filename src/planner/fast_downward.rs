//! Fast Downward 外部进程规划器
//!
//! `fast-downward.py <domain> <problem> --search "astar(lmcut())"`；计划写在工作目录的 `sas_plan`。
//! 退出码 10/11/12 表示已证明无解或搜索未找到解。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::planner::{Plan, PlannerError, SymbolicPlanner};

const UNSOLVABLE_EXIT_CODES: [i32; 3] = [10, 11, 12];
/// stderr 预览最大字符数
const STDERR_PREVIEW_CHARS: usize = 400;

/// 外部 Fast Downward 规划器
#[derive(Debug, Clone)]
pub struct FastDownwardPlanner {
    command: String,
    search: String,
    timeout: Duration,
    work_dir: PathBuf,
    plan_file: String,
}

impl FastDownwardPlanner {
    pub fn new(command: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            search: "astar(lmcut())".to_string(),
            timeout: Duration::from_secs(30),
            work_dir: work_dir.into(),
            plan_file: "sas_plan".to_string(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_plan_file(mut self, plan_file: impl Into<String>) -> Self {
        self.plan_file = plan_file.into();
        self
    }

    fn plan_path(&self) -> PathBuf {
        self.work_dir.join(&self.plan_file)
    }
}

#[async_trait]
impl SymbolicPlanner for FastDownwardPlanner {
    fn name(&self) -> &str {
        "fast-downward"
    }

    async fn plan(&self, domain: &Path, problem: &Path) -> Result<Plan, PlannerError> {
        let plan_path = self.plan_path();
        // 旧计划文件残留会被误读
        if tokio::fs::try_exists(&plan_path).await.unwrap_or(false) {
            tokio::fs::remove_file(&plan_path)
                .await
                .map_err(|e| PlannerError::Io(e.to_string()))?;
        }

        let mut cmd = Command::new(&self.command);
        cmd.arg(domain)
            .arg(problem)
            .arg("--search")
            .arg(&self.search)
            .current_dir(&self.work_dir)
            .kill_on_drop(true);

        tracing::info!(
            command = %self.command,
            search = %self.search,
            problem = %problem.display(),
            "planner invoke"
        );
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| PlannerError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| PlannerError::Io(format!("{}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(STDERR_PREVIEW_CHARS)
                .collect();
            return match output.status.code() {
                Some(code) if UNSOLVABLE_EXIT_CODES.contains(&code) => {
                    Err(PlannerError::Unsolvable(format!("exit code {code}")))
                }
                code => Err(PlannerError::Failed { code, stderr }),
            };
        }

        let text = tokio::fs::read_to_string(&plan_path)
            .await
            .map_err(|_| PlannerError::NoPlanFile(plan_path.display().to_string()))?;
        let plan = Plan::parse(&text).map_err(|e| PlannerError::Parse(e.to_string()))?;
        tracing::info!(steps = plan.len(), "planner returned plan");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let dir = TempDir::new().unwrap();
        let planner = FastDownwardPlanner::new("/nonexistent/fast-downward.py", dir.path());
        let err = planner
            .plan(&dir.path().join("domain.pddl"), &dir.path().join("problem.pddl"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::Io(_)));
    }

    /// 用 `sh` 充当规划器命令：第一个参数（领域文件位置）就是要执行的脚本
    #[cfg(unix)]
    async fn fake_planner(dir: &TempDir, script: &str) -> (FastDownwardPlanner, std::path::PathBuf) {
        let path = dir.path().join("fake-fd.sh");
        tokio::fs::write(&path, script).await.unwrap();
        (FastDownwardPlanner::new("sh", dir.path()), path)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_plan_file_written_by_process() {
        let dir = TempDir::new().unwrap();
        let (planner, script) = fake_planner(
            &dir,
            "printf '(drive loc_1_1 loc_2_1)\\n(buy milk victory loc_2_1)\\n; cost = 2 (unit cost)\\n' > sas_plan\n",
        )
        .await;
        let plan = planner.plan(&script, Path::new("problem.pddl")).await.unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unsolvable_exit_code() {
        let dir = TempDir::new().unwrap();
        let (planner, script) = fake_planner(&dir, "exit 12\n").await;
        let err = planner.plan(&script, Path::new("problem.pddl")).await.unwrap_err();
        assert!(matches!(err, PlannerError::Unsolvable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_without_plan_file() {
        let dir = TempDir::new().unwrap();
        let (planner, script) = fake_planner(&dir, "exit 0\n").await;
        let err = planner.plan(&script, Path::new("problem.pddl")).await.unwrap_err();
        assert!(matches!(err, PlannerError::NoPlanFile(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let (planner, script) = fake_planner(&dir, "sleep 5\n").await;
        let planner = planner.with_timeout(Duration::from_millis(100));
        let err = planner.plan(&script, Path::new("problem.pddl")).await.unwrap_err();
        assert!(matches!(err, PlannerError::Timeout(_)));
    }
}
