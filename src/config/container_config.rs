//! # Container Configuration Module
//!
//! 서비스 컨테이너의 동작 방식과 호스트 로깅 설정을 환경 변수 기반으로 관리합니다.
//!
//! ## 환경 변수
//!
//! ```bash
//! # 실행 환경 (development, test, staging, production)
//! export ENVIRONMENT="development"
//!
//! # 루트 컨테이너 이름 (로그 및 진단 출력용)
//! export SERVICE_CONTAINER_NAME="root"
//!
//! # 종료 시 해제 실패 처리 정책 (fail_fast, best_effort)
//! export SERVICE_CONTAINER_SHUTDOWN_POLICY="fail_fast"
//! ```
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use service_container::config::{ContainerConfig, ShutdownPolicy};
//!
//! let config = ContainerConfig::from_env();
//! let container = ServiceContainer::with_config(config);
//!
//! // 테스트에서는 직접 구성
//! let config = ContainerConfig::named("test").shutdown_policy(ShutdownPolicy::BestEffort);
//! ```

use std::env;

/// 애플리케이션 실행 환경
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// 개발 환경 - 서비스 시작/종료 debug 로그 출력
    Development,
    /// 테스트 환경
    Test,
    /// 스테이징 환경
    Staging,
    /// 프로덕션 환경
    Production,
}

impl Environment {
    /// 현재 실행 환경을 감지합니다.
    ///
    /// `ENVIRONMENT` 환경 변수를 확인하며, 설정되지 않은 경우 `Production`을 기본값으로 사용합니다.
    pub fn current() -> Self {
        env::var("ENVIRONMENT")
            .map(|value| Self::from_str(&value))
            .unwrap_or(Environment::Production)
    }

    /// 문자열에서 Environment를 생성합니다.
    ///
    /// 알 수 없는 값인 경우 `Production`을 반환합니다.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" | "testing" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Production,
        }
    }
}

/// 종료 시 서비스 해제가 실패했을 때의 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// 첫 해제 실패에서 즉시 중단하고 에러를 반환합니다.
    /// 역순 순회에서 아직 남은 서비스는 해제되지 않습니다.
    #[default]
    FailFast,
    /// 모든 서비스를 해제한 뒤 수집된 실패를 `ShutdownFailures`로 보고합니다.
    BestEffort,
}

impl ShutdownPolicy {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" | "failfast" => Ok(ShutdownPolicy::FailFast),
            "best_effort" | "besteffort" => Ok(ShutdownPolicy::BestEffort),
            other => Err(format!("Unsupported shutdown policy: {}", other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownPolicy::FailFast => "fail_fast",
            ShutdownPolicy::BestEffort => "best_effort",
        }
    }
}

/// 컨테이너 인스턴스별 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// 로그와 진단 출력에 쓰이는 컨테이너 이름
    pub name: String,
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::named("root")
    }
}

impl ContainerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }

    pub fn shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// 환경 변수에서 설정을 읽어옵니다.
    ///
    /// 잘못된 정책 값은 경고를 남기고 기본값(`FailFast`)으로 대체합니다.
    pub fn from_env() -> Self {
        let name = env::var("SERVICE_CONTAINER_NAME").unwrap_or_else(|_| "root".to_string());

        let shutdown_policy = match env::var("SERVICE_CONTAINER_SHUTDOWN_POLICY") {
            Ok(value) => ShutdownPolicy::from_str(&value).unwrap_or_else(|e| {
                log::warn!("{}, falling back to {}", e, ShutdownPolicy::default().as_str());
                ShutdownPolicy::default()
            }),
            Err(_) => ShutdownPolicy::default(),
        };

        Self { name, shutdown_policy }
    }
}

/// 호스트 로깅 설정
pub struct LoggingConfig;

impl LoggingConfig {
    /// `RUST_LOG`이 없을 때 사용할 기본 필터
    pub fn default_filter() -> &'static str {
        Self::default_filter_for_env(Environment::current())
    }

    pub fn default_filter_for_env(env: Environment) -> &'static str {
        match env {
            Environment::Development => "debug",
            Environment::Test => "warn",
            Environment::Staging | Environment::Production => "info,service_container::core=debug",
        }
    }
}
