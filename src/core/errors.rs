//! # Service Container Error Handling
//!
//! 서비스 컨테이너의 통합 에러 타입입니다.
//! 구조적 에러(중복 키, 조회 실패)는 호출자가 복구할 수 있는 지역 에러이고,
//! 활성화/해제 실패는 공유 서비스를 잃어버리는 시스템 에러이므로 삼키지 않고 전파합니다.
//!
//! ## 에러 분류
//!
//! | ContainerError | 발생 위치 | 성격 |
//! |----------------|-----------|------|
//! | `DuplicateKey` | `register*` | 지역, 복구 가능 |
//! | `NotFound` | `require` | 지역, 복구 가능 (`get`은 `None` 반환) |
//! | `ActivationFailure` | `get` (팩토리 실행) | 시스템, 대기 중이던 모든 호출자에게 전파 |
//! | `DisposalFailure` | `shutdown` | 시스템 |
//! | `ShutdownFailures` | `shutdown` (best-effort 정책) | 시스템, 수집된 해제 실패 목록 |
//! | `Cancelled` / `Timeout` | `ServiceFuture` | 대기 측 지역 에러 |
//! | `TypeMismatch` | 외부 `ServiceProvider`가 잘못된 인스턴스를 돌려준 경우 | 지역 |
//!
//! ## 사용 패턴
//!
//! ```rust,ignore
//! use service_container::core::errors::ContainerError;
//!
//! match container.register(Arc::new(Logger::new())) {
//!     Ok(()) => {}
//!     Err(ContainerError::DuplicateKey(key)) => log::debug!("{} already provided", key),
//!     Err(e) => return Err(e),
//! }
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::core::key::ServiceKey;

/// 팩토리와 해제 콜백이 반환하는 에러 타입
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// 여러 호출자에게 복제되어 전달되는 원인 에러
pub type SharedError = Arc<dyn StdError + Send + Sync>;

#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    #[error("Duplicate service key: {0}")]
    DuplicateKey(&'static str),

    #[error("Service not found: {0}")]
    NotFound(&'static str),

    #[error("Activation failed for {key}: {source}")]
    ActivationFailure {
        key: &'static str,
        #[source]
        source: SharedError,
    },

    #[error("Disposal failed for {key}: {source}")]
    DisposalFailure {
        key: &'static str,
        #[source]
        source: SharedError,
    },

    #[error("{} service(s) failed to dispose during shutdown", .0.len())]
    ShutdownFailures(Vec<ContainerError>),

    #[error("Wait cancelled for service: {0}")]
    Cancelled(&'static str),

    #[error("Timed out waiting for service: {0}")]
    Timeout(&'static str),

    #[error("Type mismatch for service: {0}")]
    TypeMismatch(&'static str),
}

impl ContainerError {
    pub(crate) fn activation(key: ServiceKey, source: BoxError) -> Self {
        ContainerError::ActivationFailure {
            key: key.name(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn disposal(key: ServiceKey, source: BoxError) -> Self {
        ContainerError::DisposalFailure {
            key: key.name(),
            source: Arc::from(source),
        }
    }

    /// 팩토리 패닉을 활성화 실패로 변환합니다.
    pub(crate) fn activation_panic(key: ServiceKey, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::activation(key, format!("factory panicked: {}", message).into())
    }
}

pub type ContainerResult<T> = Result<T, ContainerError>;
